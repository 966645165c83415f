//! # famfin sync engine
//!
//! Offline-first synchronization for the famfin finance client.
//!
//! This crate provides:
//! - The [`RemoteApi`] contract and an in-process [`InMemoryRemote`]
//! - [`OfflineRecorder`]: provisional records plus queue entries
//! - [`Connectivity`] and [`NetworkMonitor`]: when to run passes
//! - [`SyncEngine`]: queue replay, id remapping, failure accounting
//! - [`CacheRefresher`]: authoritative download into cache partitions
//! - [`FinanceClient`]: online/offline routing for the UI layer
//!
//! ## Architecture
//!
//! Offline intents are written to the local store together with a queue
//! entry. When connectivity returns, the monitor triggers a pass; the
//! engine replays entries in seq order and, for creates, replaces the
//! provisional id with the server's everywhere it is referenced.
//!
//! ## Key Invariants
//!
//! - At most one pass at a time
//! - Entries are replayed in ascending seq, one at a time
//! - A failed entry stays queued and does not block later entries
//! - No entry referencing an unresolved provisional id reaches the remote

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod connectivity;
mod engine;
mod error;
mod monitor;
mod recorder;
mod refresh;
mod remote;

pub use client::{FinanceClient, Loaded, SyncReport};
pub use config::{RetryPolicy, SyncConfig};
pub use connectivity::Connectivity;
pub use engine::{SyncEngine, SyncOutcome, SyncState, SyncStats, SyncStatus};
pub use error::{SyncError, SyncResult};
pub use monitor::{EngineTrigger, NetworkMonitor, PassTrigger};
pub use recorder::OfflineRecorder;
pub use refresh::{CacheRefresher, RefreshReport};
pub use remote::{InMemoryRemote, RemoteApi, RemoteCall};
