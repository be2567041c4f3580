//! Initialize the scheduler database.
//!
//! Creates the database file and its parent directory if needed, applies the
//! schema and upgrades any legacy layout. Running it against an existing
//! database is safe and leaves the stored data untouched.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::StorageConfig;
use crate::error::Result;
use crate::storage::Storage;

use super::print_json;

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    created: bool,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if the directory or database cannot be created.
pub fn execute(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let config = StorageConfig::resolve(db_path.map(PathBuf::as_path))?;
    let created = !config.db_path.exists();

    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    Storage::open_with_config(&config)?;

    if json {
        print_json(&InitOutput {
            database: config.db_path,
            created,
        })?;
    } else if created {
        println!("Initialized scheduler database");
        println!("  Database: {}", config.db_path.display());
    } else {
        println!("Database already initialized; schema is up to date");
        println!("  Database: {}", config.db_path.display());
    }

    Ok(())
}
