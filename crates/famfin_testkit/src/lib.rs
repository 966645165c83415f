//! # famfin testkit
//!
//! Test utilities for famfin.
//!
//! This crate provides:
//! - Record and draft fixtures with fixed timestamps
//! - Scratch stores (in-memory or file-backed in a temp directory)
//! - A storage backend with injectable write faults
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use famfin_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     let store = TestStore::memory();
//!     store.put(&account("A1", "F1"));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
