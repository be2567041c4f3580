//! Accessors for individual shards of a job update.
//!
//! Consumed by the update orchestration logic when diffing shard configs.

use crate::model::{TaskInfo, TaskUpdateConfiguration};

/// Original task configuration for a shard update.
///
/// `None` when the update adds the shard.
#[must_use]
pub fn original_config(update: &TaskUpdateConfiguration) -> Option<&TaskInfo> {
    update.old_config()
}

/// Updated task configuration for a shard update.
///
/// `None` when the update removes the shard.
#[must_use]
pub fn updated_config(update: &TaskUpdateConfiguration) -> Option<&TaskInfo> {
    update.new_config()
}
