//! Framework-identity store.
//!
//! Holds the id the scheduler registered with the cluster as a single row
//! in `scheduler_state`.

use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

use super::keyed::{KeyedTable, TableSpec};

const SCHEDULER_STATE: TableSpec = TableSpec {
    table: "scheduler_state",
    key_column: "key",
    value_column: "value",
};

const FRAMEWORK_ID_KEY: &str = "framework_id";

/// Store for the framework id singleton.
pub struct FrameworkStore<'a> {
    table: KeyedTable<'a, String>,
}

impl<'a> FrameworkStore<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self {
            table: KeyedTable::new(conn, SCHEDULER_STATE),
        }
    }

    /// Save the framework id, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save(&self, framework_id: &str) -> Result<()> {
        debug!(framework_id, "Saving framework id");
        self.table.upsert(FRAMEWORK_ID_KEY, &framework_id.to_string())
    }

    /// The most recently saved framework id, or `None` if never saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn fetch(&self) -> Result<Option<String>> {
        self.table.fetch(FRAMEWORK_ID_KEY)
    }

    /// Forget the framework id.
    pub(crate) fn clear(&self) -> Result<()> {
        self.table.remove(FRAMEWORK_ID_KEY)?;
        Ok(())
    }
}
