//! Schema check and upgrade commands.
//!
//! Both work on a raw connection so that `check` can report a legacy layout
//! before anything upgrades it.

use std::path::PathBuf;

use rusqlite::{Connection, OpenFlags};
use serde::Serialize;

use crate::cli::SchemaCommands;
use crate::error::Result;
use crate::storage::{ensure_schema, is_legacy_update_schema, upgrade_update_schema_if_needed};

use super::{existing_config, print_json};

#[derive(Serialize)]
struct CheckOutput {
    database: PathBuf,
    legacy: bool,
}

#[derive(Serialize)]
struct UpgradeOutput {
    database: PathBuf,
    upgraded: bool,
}

/// Execute a schema subcommand.
///
/// # Errors
///
/// Returns `Error::NotInitialized` if the database does not exist,
/// `Error::SchemaUpgrade` if the upgrade fails, or a database error.
pub fn execute(command: &SchemaCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        SchemaCommands::Check => check(db_path, json),
        SchemaCommands::Upgrade => upgrade(db_path, json),
    }
}

fn check(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let config = existing_config(db_path)?;
    let conn = Connection::open_with_flags(&config.db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    conn.busy_timeout(config.busy_timeout)?;
    let legacy = is_legacy_update_schema(&conn)?;

    if json {
        print_json(&CheckOutput {
            database: config.db_path,
            legacy,
        })
    } else {
        if legacy {
            println!("Legacy update table layout; run `schedstore schema upgrade`");
        } else {
            println!("Schema is current");
        }
        Ok(())
    }
}

fn upgrade(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let config = existing_config(db_path)?;
    let conn = Connection::open(&config.db_path)?;
    conn.busy_timeout(config.busy_timeout)?;

    let upgraded = upgrade_update_schema_if_needed(&conn)?;
    ensure_schema(&conn)?;

    if json {
        print_json(&UpgradeOutput {
            database: config.db_path,
            upgraded,
        })
    } else {
        if upgraded {
            println!("Upgraded update table layout");
        } else {
            println!("Schema already current; nothing to do");
        }
        Ok(())
    }
}
