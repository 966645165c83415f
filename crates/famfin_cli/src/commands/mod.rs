//! CLI command implementations.

pub mod cache;
pub mod maintenance;
pub mod queue;
pub mod replay;
pub mod status;

use famfin_store::{LocalStore, StoreConfig};
use std::path::Path;

/// Opens an existing journal.
pub(crate) fn open_store(path: &Path) -> Result<LocalStore, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No journal found at {:?}", path).into());
    }
    Ok(LocalStore::open_file(path, StoreConfig::default())?)
}
