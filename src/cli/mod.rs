//! CLI definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// schedstore - maintenance tool for scheduler storage
#[derive(Parser, Debug)]
#[command(name = "schedstore", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.schedstore/data/scheduler.db)
    #[arg(long, global = true, env = "SCHEDSTORE_DB")]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database (or bring an existing one up to date)
    Init,

    /// Show what each store holds
    Status,

    /// Inspect or upgrade the on-disk schema
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },

    /// Create, apply or inspect whole-store snapshots
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum SchemaCommands {
    /// Report whether the database still uses a legacy layout
    Check,

    /// Upgrade a legacy layout in place
    Upgrade,
}

#[derive(Subcommand, Debug)]
pub enum SnapshotCommands {
    /// Write a snapshot of every store to a file
    Create {
        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Replace every store with the contents of a snapshot file
    Apply {
        /// Snapshot file
        file: PathBuf,
    },

    /// Validate a snapshot file and print what it holds
    Inspect {
        /// Snapshot file
        file: PathBuf,
    },
}
