//! Snapshot document types.
//!
//! A snapshot blob is a self-describing JSON document:
//! `{"version":1,"created_at":"<RFC 3339>","checksum":"<sha256>","state":{...}}`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{JobConfiguration, JobUpdateConfiguration, Quota, ScheduledTask};

use super::hash::content_hash;

/// Newest snapshot format this build can read and the one it writes.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A job together with the manager that accepted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredJob {
    pub manager_id: String,
    pub config: JobConfiguration,
}

/// A role's quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredQuota {
    pub role: String,
    pub quota: Quota,
}

/// Contents of every store at one instant.
///
/// Absent sections read as empty, so a document written before a section
/// existed still decodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework_id: Option<String>,

    #[serde(default)]
    pub jobs: Vec<StoredJob>,

    #[serde(default)]
    pub quotas: Vec<StoredQuota>,

    #[serde(default)]
    pub tasks: Vec<ScheduledTask>,

    #[serde(default)]
    pub update_configs: Vec<JobUpdateConfiguration>,
}

/// A versioned, checksummed snapshot document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    /// SHA256 of `state`.
    pub checksum: String,
    #[serde(default)]
    pub state: StoreState,
}

impl Snapshot {
    /// Wrap `state` in a current-version document stamped now.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be hashed.
    pub fn new(state: StoreState) -> Result<Self> {
        Ok(Self {
            version: SNAPSHOT_VERSION,
            created_at: Utc::now(),
            checksum: content_hash(&state)?,
            state,
        })
    }

    /// Serialize to blob bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse and validate blob bytes.
    ///
    /// The version is checked before anything else is decoded, so a
    /// document from a newer build is reported as such even if its state
    /// section no longer parses.
    ///
    /// # Errors
    ///
    /// Returns `Error::SnapshotVersion` for an unsupported version and
    /// `Error::SnapshotCorrupt` for anything malformed or a checksum mismatch.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let document: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::SnapshotCorrupt(format!("not a JSON document: {e}")))?;

        let found = document
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| Error::SnapshotCorrupt("missing version".to_string()))?;
        let found = u32::try_from(found).unwrap_or(u32::MAX);
        if found == 0 || found > SNAPSHOT_VERSION {
            return Err(Error::SnapshotVersion {
                found,
                supported: SNAPSHOT_VERSION,
            });
        }

        // Hash the state as written, before defaults are filled in, so a
        // blob from a build with fewer fields still verifies.
        let expected = document
            .get("checksum")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| Error::SnapshotCorrupt("missing checksum".to_string()))?;
        let actual = match document.get("state") {
            Some(state) => content_hash(state)?,
            None => content_hash(&serde_json::json!({}))?,
        };
        if actual != expected {
            return Err(Error::SnapshotCorrupt(format!(
                "checksum mismatch: expected {expected}, computed {actual}"
            )));
        }

        let snapshot: Self = serde_json::from_value(document)
            .map_err(|e| Error::SnapshotCorrupt(format!("malformed snapshot: {e}")))?;

        Ok(snapshot)
    }
}

/// Per-store counts of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub framework_id: Option<String>,
    pub jobs: usize,
    pub quotas: usize,
    pub tasks: usize,
    pub updates: usize,
}

impl From<&Snapshot> for SnapshotSummary {
    fn from(snapshot: &Snapshot) -> Self {
        let state = &snapshot.state;
        Self {
            version: snapshot.version,
            created_at: snapshot.created_at,
            framework_id: state.framework_id.clone(),
            jobs: state.jobs.len(),
            quotas: state.quotas.len(),
            tasks: state.tasks.len(),
            updates: state.update_configs.len(),
        }
    }
}

impl fmt::Display for SnapshotSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "framework_id={} jobs={} quotas={} tasks={} updates={}",
            self.framework_id.as_deref().unwrap_or("-"),
            self.jobs,
            self.quotas,
            self.tasks,
            self.updates
        )
    }
}
