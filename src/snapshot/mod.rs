//! Whole-store snapshots.
//!
//! A snapshot captures every store at one instant as a versioned,
//! checksummed JSON blob. Restoring one replaces every store's contents.
//!
//! # Submodules
//!
//! - [`types`] - Snapshot document and state types
//! - [`hash`] - SHA256 content hashing
//! - [`file`] - Atomic snapshot file I/O

pub mod file;
pub mod hash;
pub mod types;

pub use file::{read_snapshot_file, write_snapshot_file};
pub use hash::content_hash;
pub use types::{Snapshot, SnapshotSummary, StoreState, StoredJob, StoredQuota, SNAPSHOT_VERSION};

use tracing::debug;

use crate::error::Result;
use crate::query::Query;
use crate::storage::StoreProvider;

/// Read the contents of every store.
///
/// Run inside one transaction for a consistent view.
///
/// # Errors
///
/// Returns an error if any store cannot be read.
pub fn capture(stores: &StoreProvider<'_>) -> Result<StoreState> {
    let jobs = stores
        .jobs()
        .fetch_all_entries()?
        .into_iter()
        .map(|(manager_id, config)| StoredJob { manager_id, config })
        .collect();
    let quotas = stores
        .quotas()
        .fetch_all()?
        .into_iter()
        .map(|(role, quota)| StoredQuota { role, quota })
        .collect();

    Ok(StoreState {
        framework_id: stores.framework().fetch()?,
        jobs,
        quotas,
        tasks: stores.tasks().fetch(&Query::GET_ALL)?,
        update_configs: stores.updates().fetch_all()?,
    })
}

/// Clear every store, then repopulate from `state`.
///
/// # Errors
///
/// Returns an error if any write fails; run inside one transaction so a
/// failure leaves the previous contents.
pub fn restore(stores: &StoreProvider<'_>, state: &StoreState) -> Result<()> {
    stores.framework().clear()?;
    stores.jobs().clear()?;
    stores.quotas().delete_all()?;
    let removed = stores.tasks().remove(&Query::GET_ALL)?;
    stores.updates().clear()?;
    debug!(removed_tasks = removed, "Cleared stores for restore");

    if let Some(framework_id) = &state.framework_id {
        stores.framework().save(framework_id)?;
    }
    for job in &state.jobs {
        stores.jobs().save(&job.manager_id, &job.config)?;
    }
    for quota in &state.quotas {
        stores.quotas().save(&quota.role, &quota.quota)?;
    }
    stores.tasks().save(&state.tasks)?;
    for update in &state.update_configs {
        stores.updates().save(update)?;
    }

    Ok(())
}

/// Decode a blob and count what it holds.
///
/// # Errors
///
/// Returns the same errors as [`Snapshot::decode`].
pub fn summarize(bytes: &[u8]) -> Result<SnapshotSummary> {
    Snapshot::decode(bytes).map(|snapshot| SnapshotSummary::from(&snapshot))
}
