//! Snapshot file operations.
//!
//! Snapshot files are written atomically: a temp file next to the target is
//! written and synced, then renamed over it. A crash mid-write leaves the
//! previous file intact.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// Temp file used while writing `path`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write snapshot bytes to `path` atomically.
///
/// Creates the parent directory if needed.
///
/// # Errors
///
/// Returns an error if the file cannot be written or renamed.
pub fn write_snapshot_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = temp_path(path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Wrote snapshot file");
    Ok(())
}

/// Read snapshot bytes from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_snapshot_file(path: &Path) -> Result<Vec<u8>> {
    Ok(fs::read(path)?)
}
