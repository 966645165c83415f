//! # famfin storage
//!
//! Byte-store backends underneath the famfin local durable store.
//!
//! Backends are **opaque**: they append, read and atomically replace bytes.
//! The journal format (frames, CRCs, CBOR payloads) belongs to
//! `famfin_store`; nothing here interprets the data.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For tests and ephemeral sessions
//! - [`FileBackend`] - Persistent, single-process file with an advisory lock
//!
//! ## Example
//!
//! ```rust
//! use famfin_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"frame").unwrap();
//! assert_eq!(backend.read_at(offset, 5).unwrap(), b"frame");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
