//! Append-only journal over a storage backend.

use crate::error::{StoreError, StoreResult};
use crate::frame::{compute_crc32, Frame, FrameHeader, CRC_SIZE, HEADER_SIZE};
use famfin_storage::StorageBackend;
use tracing::{debug, warn};

/// Result of scanning a journal from the start.
#[derive(Debug)]
pub struct Replay {
    /// Frames that passed validation, in write order.
    pub frames: Vec<Frame>,
    /// Length of the valid prefix.
    pub valid_len: u64,
    /// Backend size at scan time.
    pub total_len: u64,
    /// Why the scan stopped early, if it did.
    pub tail_error: Option<StoreError>,
}

impl Replay {
    /// Returns true if bytes past the last valid frame must be dropped.
    #[must_use]
    pub fn has_torn_tail(&self) -> bool {
        self.valid_len < self.total_len
    }
}

/// Writes and scans journal frames.
pub struct Journal {
    backend: Box<dyn StorageBackend>,
    sync_on_write: bool,
    /// Length to cut back to before the next append, set when a failed
    /// append could not be rolled back.
    dirty_tail: Option<u64>,
}

impl Journal {
    /// Creates a journal over `backend`.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_write: bool) -> Self {
        Self {
            backend,
            sync_on_write,
            dirty_tail: None,
        }
    }

    /// Appends an encoded frame, returning its offset.
    ///
    /// A failed append leaves no bytes behind: the journal is cut back to
    /// its previous length, so later frames never follow a torn one.
    pub fn append(&mut self, frame: &[u8]) -> StoreResult<u64> {
        if let Some(len) = self.dirty_tail {
            self.backend.truncate(len)?;
            self.dirty_tail = None;
            debug!(len, "dropped partial frame before append");
        }

        let start = self.backend.size()?;
        match self.write_frame(frame) {
            Ok(offset) => Ok(offset),
            Err(e) => {
                if let Err(rollback) = self.backend.truncate(start) {
                    warn!(len = start, error = %rollback, "journal rollback failed");
                    self.dirty_tail = Some(start);
                }
                Err(e)
            }
        }
    }

    fn write_frame(&mut self, frame: &[u8]) -> StoreResult<u64> {
        let offset = self.backend.append(frame)?;
        if self.sync_on_write {
            self.backend.flush()?;
        }
        Ok(offset)
    }

    /// Returns the journal size in bytes.
    ///
    /// Bytes of a failed append that are still waiting to be dropped do not
    /// count.
    pub fn size(&self) -> StoreResult<u64> {
        match self.dirty_tail {
            Some(len) => Ok(len),
            None => Ok(self.backend.size()?),
        }
    }

    /// Drops everything after `len`.
    pub fn truncate(&mut self, len: u64) -> StoreResult<()> {
        self.backend.truncate(len)?;
        self.backend.sync()?;
        self.dirty_tail = None;
        Ok(())
    }

    /// Atomically replaces the journal with a single encoded frame.
    pub fn replace(&mut self, frame: &[u8]) -> StoreResult<()> {
        self.backend.replace(frame)?;
        self.dirty_tail = None;
        Ok(())
    }

    /// Scans all frames from offset zero.
    ///
    /// Scanning stops at the first incomplete, mis-tagged, checksum-failing
    /// or undecodable frame; everything before it is returned. Only backend
    /// I/O failures are errors.
    pub fn replay(&self) -> StoreResult<Replay> {
        let total_len = self.backend.size()?;
        let mut frames = Vec::new();
        let mut offset = 0u64;
        let mut tail_error = None;

        while offset < total_len {
            let remaining = total_len - offset;
            if remaining < (HEADER_SIZE + CRC_SIZE) as u64 {
                tail_error = Some(StoreError::corruption(offset, "incomplete frame header"));
                break;
            }

            let header_bytes = self.backend.read_at(offset, HEADER_SIZE)?;
            let header = match FrameHeader::parse(&header_bytes, offset) {
                Ok(header) => header,
                Err(e) => {
                    tail_error = Some(e);
                    break;
                }
            };

            let frame_len = header.frame_len() as u64;
            if frame_len > remaining {
                tail_error = Some(StoreError::corruption(offset, "incomplete frame payload"));
                break;
            }

            let bytes = self.backend.read_at(offset, header.frame_len())?;
            let body_end = bytes.len() - CRC_SIZE;
            let mut stored = [0u8; CRC_SIZE];
            stored.copy_from_slice(&bytes[body_end..]);
            let expected = u32::from_le_bytes(stored);
            let actual = compute_crc32(&bytes[..body_end]);
            if expected != actual {
                tail_error = Some(StoreError::ChecksumMismatch {
                    offset,
                    expected,
                    actual,
                });
                break;
            }

            match Frame::decode_payload(header.kind, &bytes[HEADER_SIZE..body_end], offset) {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    tail_error = Some(e);
                    break;
                }
            }
            offset += frame_len;
        }

        Ok(Replay {
            frames,
            valid_len: offset,
            total_len,
            tail_error,
        })
    }
}
