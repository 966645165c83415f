//! In-memory image of the store, rebuilt from the journal on open.

use crate::frame::Frame;
use crate::op::{Snapshot, StoreOp};
use famfin_protocol::{is_provisional, EntityKind, QueueEntry, Record};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Rows of one entity kind, indexed by id and by family.
#[derive(Debug, Default, Clone)]
pub struct Table {
    rows: BTreeMap<String, Record>,
    by_family: HashMap<String, BTreeSet<String>>,
}

impl Table {
    /// Returns a row by id.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.rows.get(id)
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns all rows of a family, ordered by id.
    pub fn family(&self, family_id: &str) -> Vec<Record> {
        self.by_family
            .get(family_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.rows.get(id).cloned())
            .collect()
    }

    /// Returns the families that have rows in this table.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.by_family.keys().map(String::as_str)
    }

    /// Inserts or replaces a row.
    pub fn upsert(&mut self, record: Record) {
        let id = record.id().to_string();
        let family = record.family_id().to_string();
        if let Some(old) = self.rows.get(&id) {
            if old.family_id() != family {
                let old_family = old.family_id().to_string();
                self.unindex(&old_family, &id);
            }
        }
        self.by_family
            .entry(family)
            .or_default()
            .insert(id.clone());
        self.rows.insert(id, record);
    }

    /// Removes a row.
    pub fn remove(&mut self, id: &str) -> Option<Record> {
        let record = self.rows.remove(id)?;
        self.unindex(record.family_id(), id);
        Some(record)
    }

    /// Removes all rows of a family for which `drop` holds.
    pub fn remove_family_where(&mut self, family_id: &str, drop: impl Fn(&str) -> bool) {
        let ids: Vec<String> = self
            .by_family
            .get(family_id)
            .into_iter()
            .flatten()
            .filter(|id| drop(id))
            .cloned()
            .collect();
        for id in ids {
            self.remove(&id);
        }
    }

    fn unindex(&mut self, family_id: &str, id: &str) {
        if let Some(ids) = self.by_family.get_mut(family_id) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_family.remove(family_id);
            }
        }
    }

    fn rows_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.rows.values_mut()
    }

    fn records(&self) -> impl Iterator<Item = &Record> {
        self.rows.values()
    }
}

/// Tables plus queue.
#[derive(Debug, Clone)]
pub struct StoreState {
    tables: BTreeMap<EntityKind, Table>,
    queue: BTreeMap<u64, QueueEntry>,
    next_seq: u64,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            tables: EntityKind::ALL
                .into_iter()
                .map(|kind| (kind, Table::default()))
                .collect(),
            queue: BTreeMap::new(),
            next_seq: 1,
        }
    }
}

impl StoreState {
    /// Rebuilds state from a compaction snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut state = Self::default();
        for record in &snapshot.records {
            state.table_mut(record.kind()).upsert(record.clone());
        }
        for entry in &snapshot.queue {
            state.queue.insert(entry.seq, entry.clone());
        }
        state.next_seq = snapshot
            .next_seq
            .max(state.queue.keys().next_back().map_or(1, |seq| seq + 1));
        state
    }

    /// Captures the full state for compaction.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            records: self.tables.values().flat_map(Table::records).cloned().collect(),
            queue: self.queue.values().cloned().collect(),
            next_seq: self.next_seq,
        }
    }

    /// Returns a table.
    pub fn table(&self, kind: EntityKind) -> &Table {
        // Every kind is inserted by `default`.
        &self.tables[&kind]
    }

    fn table_mut(&mut self, kind: EntityKind) -> &mut Table {
        self.tables.entry(kind).or_default()
    }

    /// Returns true if any table holds `id`.
    pub fn contains_id(&self, id: &str) -> bool {
        self.tables.values().any(|t| t.get(id).is_some())
    }

    /// Returns the seq the next enqueue receives.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Returns a queue entry.
    pub fn entry(&self, seq: u64) -> Option<&QueueEntry> {
        self.queue.get(&seq)
    }

    /// Returns the queue in ascending seq order.
    pub fn queue(&self) -> impl Iterator<Item = &QueueEntry> {
        self.queue.values()
    }

    /// Returns every family with cached rows.
    pub fn families(&self) -> BTreeSet<String> {
        self.tables
            .values()
            .flat_map(|t| t.families().map(str::to_string))
            .collect()
    }

    /// Applies a replayed or freshly written frame.
    pub fn apply_frame(&mut self, frame: &Frame) {
        match frame {
            Frame::Ops(ops) => {
                for op in ops {
                    self.apply(op);
                }
            }
            Frame::Snapshot(snapshot) => *self = Self::from_snapshot(snapshot),
        }
    }

    /// Applies one op. Ops are validated before they are journaled, so
    /// applying never fails; ops naming missing rows or entries are no-ops.
    pub fn apply(&mut self, op: &StoreOp) {
        match op {
            StoreOp::Put { records } => {
                for record in records {
                    self.table_mut(record.kind()).upsert(record.clone());
                }
            }
            StoreOp::Delete { kind, id } => {
                self.table_mut(*kind).remove(id);
            }
            StoreOp::DeleteFamily { kind, family_id } => {
                self.table_mut(*kind).remove_family_where(family_id, |_| true);
            }
            StoreOp::ReplacePartition {
                kind,
                family_id,
                records,
            } => {
                let table = self.table_mut(*kind);
                table.remove_family_where(family_id, |id| !is_provisional(id));
                for record in records {
                    table.upsert(record.clone());
                }
            }
            StoreOp::ClearAll => {
                for table in self.tables.values_mut() {
                    *table = Table::default();
                }
                self.queue.clear();
            }
            StoreOp::Enqueue { entry } => {
                self.next_seq = self.next_seq.max(entry.seq + 1);
                self.queue.insert(entry.seq, entry.clone());
            }
            StoreOp::MarkSynced { seq, server_record } => {
                if let Some(entry) = self.queue.get_mut(seq) {
                    entry.synced = true;
                    entry.server_record = server_record.clone();
                    entry.last_error = None;
                }
            }
            StoreOp::RecordFailure { seq, error, park } => {
                if let Some(entry) = self.queue.get_mut(seq) {
                    entry.attempts += 1;
                    entry.last_error = Some(error.clone());
                    entry.parked = *park;
                }
            }
            StoreOp::RequeueParked => {
                for entry in self.queue.values_mut().filter(|e| e.parked) {
                    entry.parked = false;
                    entry.attempts = 0;
                }
            }
            StoreOp::PurgeSynced => {
                self.queue.retain(|_, entry| !entry.synced);
            }
            StoreOp::Remap { kind, from, to } => self.remap(*kind, from, to),
        }
    }

    fn remap(&mut self, kind: EntityKind, from: &str, to: &str) {
        let table = self.table_mut(kind);
        if let Some(record) = table.remove(from) {
            table.upsert(record.with_id(to));
        }

        for table in self.tables.values_mut() {
            for row in table.rows_mut() {
                row.rewrite_reference(from, to);
            }
        }

        for entry in self.queue.values_mut().filter(|e| !e.synced) {
            entry.mutation.rewrite_reference(from, to);
        }
    }
}
