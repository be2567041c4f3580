//! Snapshot create, apply and inspect commands.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::SnapshotCommands;
use crate::error::Result;
use crate::snapshot::{read_snapshot_file, summarize, write_snapshot_file, SnapshotSummary};

use super::{open_existing, print_json};

#[derive(Serialize)]
struct SnapshotOutput<'a> {
    file: &'a Path,
    bytes: usize,
    #[serde(flatten)]
    summary: SnapshotSummary,
}

/// Execute a snapshot subcommand.
///
/// # Errors
///
/// Returns `Error::NotInitialized` if the database does not exist,
/// `Error::SnapshotVersion`/`Error::SnapshotCorrupt` for an unusable file,
/// or an I/O or database error.
pub fn execute(command: &SnapshotCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        SnapshotCommands::Create { output } => create(output, db_path, json),
        SnapshotCommands::Apply { file } => apply(file, db_path, json),
        SnapshotCommands::Inspect { file } => inspect(file, json),
    }
}

fn create(output: &Path, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut storage = open_existing(db_path)?;
    let bytes = storage.create_snapshot()?;
    write_snapshot_file(output, &bytes)?;
    report("Wrote snapshot", output, &bytes, json)
}

fn apply(file: &Path, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let bytes = read_snapshot_file(file)?;
    let mut storage = open_existing(db_path)?;
    storage.apply_snapshot(&bytes)?;
    report("Applied snapshot", file, &bytes, json)
}

fn inspect(file: &Path, json: bool) -> Result<()> {
    let bytes = read_snapshot_file(file)?;
    report("Snapshot", file, &bytes, json)
}

fn report(action: &str, file: &Path, bytes: &[u8], json: bool) -> Result<()> {
    let summary = summarize(bytes)?;

    if json {
        return print_json(&SnapshotOutput {
            file,
            bytes: bytes.len(),
            summary,
        });
    }

    println!("{action}: {}", file.display());
    println!("  Version:      {}", summary.version);
    println!("  Created:      {}", summary.created_at.to_rfc3339());
    println!(
        "  Framework ID: {}",
        summary.framework_id.as_deref().unwrap_or("(none)")
    );
    println!("  Jobs:         {}", summary.jobs);
    println!("  Quotas:       {}", summary.quotas);
    println!("  Tasks:        {}", summary.tasks);
    println!("  Updates:      {}", summary.updates);
    Ok(())
}
