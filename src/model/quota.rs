//! Per-role resource quota.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Resource ceiling for a role. Enforcement happens elsewhere; this crate
/// only persists it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    pub num_cpus: f64,
    pub ram_mb: i64,
    pub disk_mb: i64,
}

impl Quota {
    #[must_use]
    pub const fn new(num_cpus: f64, ram_mb: i64, disk_mb: i64) -> Self {
        Self {
            num_cpus,
            ram_mb,
            disk_mb,
        }
    }

    /// Check that the quota can be stored and read back.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if `num_cpus` is NaN or infinite.
    pub fn validate(&self) -> Result<()> {
        if self.num_cpus.is_finite() {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "quota num_cpus must be finite, got {}",
                self.num_cpus
            )))
        }
    }
}
