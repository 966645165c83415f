//! Storage fault injection.
//!
//! [`FaultyBackend`] wraps an [`InMemoryBackend`] and fails writes on
//! request. It simulates a disk that fills up in the middle of a journal
//! append, so tests can check that nothing acknowledged is lost and that
//! no half-written frame is left in front of later ones.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use famfin_testkit::faults::{AppendFault, FaultyBackend};
//!
//! let backend = FaultyBackend::new();
//! let plan = backend.plan();
//! let store = LocalStore::open(Box::new(backend.clone()), StoreConfig::default())?;
//! plan.fail_appends(1, AppendFault::ShortWrite);
//! ```

use famfin_storage::{InMemoryBackend, StorageBackend, StorageError, StorageResult};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shape of an injected append failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendFault {
    /// Nothing is written.
    Rejected,
    /// Half of the data reaches the backend before the error.
    ShortWrite,
}

/// Controls the faults of a [`FaultyBackend`].
///
/// Clones share state, so a plan can be armed from another thread or from
/// inside a remote stub while the store owns the backend.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    appends: Arc<AtomicUsize>,
    short_write: Arc<AtomicBool>,
    truncates: Arc<AtomicUsize>,
}

impl FaultPlan {
    /// Makes the next `count` appends fail.
    pub fn fail_appends(&self, count: usize, fault: AppendFault) {
        self.short_write
            .store(fault == AppendFault::ShortWrite, Ordering::SeqCst);
        self.appends.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` truncates fail.
    pub fn fail_truncates(&self, count: usize) {
        self.truncates.store(count, Ordering::SeqCst);
    }

    /// Returns true while append failures are still pending.
    pub fn is_armed(&self) -> bool {
        self.appends.load(Ordering::SeqCst) > 0
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// An in-memory backend with injectable write failures.
///
/// Clones share bytes and plan, like [`InMemoryBackend`].
#[derive(Debug, Clone, Default)]
pub struct FaultyBackend {
    inner: InMemoryBackend,
    plan: FaultPlan,
}

impl FaultyBackend {
    /// Creates an empty backend with no faults armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the fault plan.
    pub fn plan(&self) -> FaultPlan {
        self.plan.clone()
    }

    /// Returns a copy of all stored bytes.
    pub fn data(&self) -> Vec<u8> {
        self.inner.data()
    }
}

fn disk_full() -> StorageError {
    StorageError::Io(io::Error::other("injected fault: no space left on device"))
}

impl StorageBackend for FaultyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        if FaultPlan::take(&self.plan.appends) {
            if self.plan.short_write.load(Ordering::SeqCst) {
                self.inner.append(&data[..data.len() / 2])?;
            }
            return Err(disk_full());
        }
        self.inner.append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.inner.sync()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        if FaultPlan::take(&self.plan.truncates) {
            return Err(disk_full());
        }
        self.inner.truncate(new_size)
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        self.inner.replace(data)
    }
}
