//! Command implementations.

pub mod init;
pub mod schema;
pub mod snapshot;
pub mod status;

use std::path::PathBuf;

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::storage::Storage;

/// Resolve configuration and require the database file to exist.
pub(crate) fn existing_config(db_path: Option<&PathBuf>) -> Result<StorageConfig> {
    let config = StorageConfig::resolve(db_path.map(PathBuf::as_path))?;
    if !config.db_path.exists() {
        return Err(Error::NotInitialized {
            path: config.db_path,
        });
    }
    Ok(config)
}

/// Open an existing database.
pub(crate) fn open_existing(db_path: Option<&PathBuf>) -> Result<Storage> {
    Storage::open_with_config(&existing_config(db_path)?)
}

/// Print a serializable payload as one JSON line.
pub(crate) fn print_json<T: serde::Serialize>(payload: &T) -> Result<()> {
    println!("{}", serde_json::to_string(payload)?);
    Ok(())
}
