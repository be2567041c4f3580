//! Quota store: at most one quota per role.

use std::collections::BTreeSet;

use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;
use crate::model::Quota;

use super::keyed::{KeyedTable, TableSpec};

const QUOTAS: TableSpec = TableSpec {
    table: "quotas",
    key_column: "role",
    value_column: "quota",
};

/// Store for per-role quotas.
pub struct QuotaStore<'a> {
    table: KeyedTable<'a, Quota>,
}

impl<'a> QuotaStore<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self {
            table: KeyedTable::new(conn, QUOTAS),
        }
    }

    /// Save the quota for `role`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if `num_cpus` is not finite, or an
    /// error if the write fails.
    pub fn save(&self, role: &str, quota: &Quota) -> Result<()> {
        quota.validate()?;
        debug!(role, ?quota, "Saving quota");
        self.table.upsert(role, quota)
    }

    /// Quota for `role`, or `None` if the role has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn fetch(&self, role: &str) -> Result<Option<Quota>> {
        self.table.fetch(role)
    }

    /// Remove the quota for `role`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove(&self, role: &str) -> Result<bool> {
        self.table.remove(role)
    }

    /// Roles that currently have a quota.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn fetch_all_roles(&self) -> Result<BTreeSet<String>> {
        self.table.keys()
    }

    /// All (role, quota) pairs ordered by role.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn fetch_all(&self) -> Result<Vec<(String, Quota)>> {
        self.table.entries()
    }

    /// Remove every quota.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_all(&self) -> Result<()> {
        let removed = self.table.clear()?;
        debug!(removed, "Deleted all quotas");
        Ok(())
    }
}
