//! # famfin protocol
//!
//! Plain data shared by every layer of the offline sync core.
//!
//! This crate provides:
//! - Domain records ([`Transaction`], [`Account`], [`Category`]) behind the
//!   [`Record`] union
//! - Drafts and typed patches for create / update intents
//! - [`Mutation`] and [`QueueEntry`], the payloads of the durable queue
//! - Provisional identifiers for records created while offline
//! - [`ListFilter`], [`ApiResponse`] and [`DashboardStats`]
//!
//! Everything here is serde data with no I/O, so it can be written to the
//! local journal as-is.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod error;
mod filter;
mod mutation;
mod patch;
mod provisional;
mod record;
mod stats;

pub use api::ApiResponse;
pub use error::{ProtocolError, ProtocolResult};
pub use filter::ListFilter;
pub use mutation::{Mutation, MutationAction, QueueEntry};
pub use patch::{AccountPatch, CategoryPatch, RecordPatch, TransactionPatch};
pub use provisional::{is_provisional, ProvisionalIdGenerator, PROVISIONAL_PREFIX};
pub use record::{
    Account, AccountType, Category, EntityKind, NewAccount, NewCategory, NewTransaction, Record,
    RecordDraft, Transaction, TransactionType,
};
pub use stats::DashboardStats;
