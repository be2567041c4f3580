//! Content hashing for snapshot integrity.
//!
//! The state section of a snapshot is hashed through its JSON value form,
//! whose object keys are always sorted, so the checksum does not depend on
//! field order in the blob.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Compute a SHA256 hex digest of a serializable value.
///
/// # Errors
///
/// Returns an error if the value cannot be represented as JSON.
pub fn content_hash<T: Serialize>(value: &T) -> Result<String> {
    let canonical = serde_json::to_value(value)?;
    let json = serde_json::to_string(&canonical)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
