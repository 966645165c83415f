//! # famfin store
//!
//! Local durable store for the offline sync core.
//!
//! This crate provides:
//! - Cache tables of domain records, partitioned by family
//! - The durable mutation queue, ordered by a monotonic seq
//! - Provisional-id remapping across tables and queued payloads
//! - An append-only, CRC-checked CBOR journal with compaction and quota
//!
//! ## Example
//!
//! ```rust
//! use famfin_protocol::{EntityKind, Mutation};
//! use famfin_store::LocalStore;
//!
//! let store = LocalStore::open_in_memory().unwrap();
//! let seq = store
//!     .enqueue(Mutation::Delete { kind: EntityKind::Account, id: "A1".into() }, None)
//!     .unwrap();
//! assert_eq!(store.list_unsynced()[0].seq, seq);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod frame;
mod journal;
mod op;
mod state;
mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use frame::{compute_crc32, FRAME_MAGIC, FRAME_VERSION};
pub use store::{LocalChange, LocalStore, StorageEstimate, StoreStats};
