//! Generic upsert-by-key table over a single blob column.
//!
//! Payloads are stored as serialized JSON. Stores whose rows need extra
//! index columns (jobs, tasks, updates) reuse [`encode`]/[`decode`] directly.

use std::collections::BTreeSet;
use std::marker::PhantomData;

use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Serialize a payload for a blob column.
pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserialize a payload read from a blob column.
pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Table layout: one text key column, one blob value column.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TableSpec {
    pub table: &'static str,
    pub key_column: &'static str,
    pub value_column: &'static str,
}

/// Typed view over a [`TableSpec`] table.
pub(crate) struct KeyedTable<'a, V> {
    conn: &'a Connection,
    spec: TableSpec,
    _value: PhantomData<fn() -> V>,
}

impl<'a, V: Serialize + DeserializeOwned> KeyedTable<'a, V> {
    pub(crate) fn new(conn: &'a Connection, spec: TableSpec) -> Self {
        Self {
            conn,
            spec,
            _value: PhantomData,
        }
    }

    /// Insert or replace the value stored under `key`.
    pub(crate) fn upsert(&self, key: &str, value: &V) -> Result<()> {
        let TableSpec {
            table,
            key_column,
            value_column,
        } = self.spec;
        let sql = format!(
            "INSERT INTO {table} ({key_column}, {value_column}) VALUES (?1, ?2)
             ON CONFLICT({key_column}) DO UPDATE SET {value_column} = excluded.{value_column}"
        );
        self.conn
            .prepare_cached(&sql)?
            .execute(rusqlite::params![key, encode(value)?])?;
        Ok(())
    }

    pub(crate) fn fetch(&self, key: &str) -> Result<Option<V>> {
        let TableSpec {
            table,
            key_column,
            value_column,
        } = self.spec;
        let sql = format!("SELECT {value_column} FROM {table} WHERE {key_column} = ?1");
        let bytes: Option<Vec<u8>> = self
            .conn
            .prepare_cached(&sql)?
            .query_row([key], |row| row.get(0))
            .optional()?;
        bytes.as_deref().map(decode::<V>).transpose()
    }

    /// Remove the row under `key`, returning whether one existed.
    pub(crate) fn remove(&self, key: &str) -> Result<bool> {
        let TableSpec {
            table, key_column, ..
        } = self.spec;
        let sql = format!("DELETE FROM {table} WHERE {key_column} = ?1");
        let removed = self.conn.prepare_cached(&sql)?.execute([key])?;
        Ok(removed > 0)
    }

    pub(crate) fn keys(&self) -> Result<BTreeSet<String>> {
        let TableSpec {
            table, key_column, ..
        } = self.spec;
        let sql = format!("SELECT {key_column} FROM {table}");
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<BTreeSet<String>, _>>()?;
        Ok(keys)
    }

    /// All rows ordered by key.
    pub(crate) fn entries(&self) -> Result<Vec<(String, V)>> {
        let TableSpec {
            table,
            key_column,
            value_column,
        } = self.spec;
        let sql = format!("SELECT {key_column}, {value_column} FROM {table} ORDER BY {key_column}");
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(key, bytes)| Ok((key, decode(&bytes)?)))
            .collect()
    }

    /// Delete every row, returning how many were removed.
    pub(crate) fn clear(&self) -> Result<usize> {
        let sql = format!("DELETE FROM {}", self.spec.table);
        Ok(self.conn.execute(&sql, [])?)
    }
}
