//! Status command implementation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::error::Result;
use crate::query::Query;
use crate::storage::Storage;

use super::{existing_config, print_json};

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    database: PathBuf,
    framework_id: Option<String>,
    jobs_by_manager: BTreeMap<String, usize>,
    quotas: usize,
    tasks: usize,
    tasks_by_status: BTreeMap<String, usize>,
    updates: usize,
}

/// Execute status command.
///
/// # Errors
///
/// Returns `Error::NotInitialized` if the database does not exist, or an
/// error if a store cannot be read.
pub fn execute(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let config = existing_config(db_path)?;
    let mut storage = Storage::open_with_config(&config)?;

    let output = storage.execute(|stores| {
        let mut jobs_by_manager = BTreeMap::new();
        for manager_id in stores.jobs().fetch_manager_ids()? {
            let count = stores.jobs().fetch_all(&manager_id)?.len();
            jobs_by_manager.insert(manager_id, count);
        }

        let tasks = stores.tasks().fetch(&Query::GET_ALL)?;
        let mut tasks_by_status: BTreeMap<String, usize> = BTreeMap::new();
        for task in &tasks {
            *tasks_by_status.entry(task.status.to_string()).or_default() += 1;
        }

        Ok(StatusOutput {
            database: config.db_path.clone(),
            framework_id: stores.framework().fetch()?,
            jobs_by_manager,
            quotas: stores.quotas().fetch_all_roles()?.len(),
            tasks: tasks.len(),
            tasks_by_status,
            updates: stores.updates().fetch_all()?.len(),
        })
    })?;

    if json {
        return print_json(&output);
    }

    println!("{}", "Scheduler Storage Status".cyan().bold());
    println!("  Database:     {}", output.database.display());
    println!(
        "  Framework ID: {}",
        output.framework_id.as_deref().unwrap_or("(not registered)")
    );
    println!();

    let job_total: usize = output.jobs_by_manager.values().sum();
    println!("{} {job_total}", "Jobs".bold());
    for (manager_id, count) in &output.jobs_by_manager {
        println!("  {manager_id}: {count}");
    }

    println!("{} {}", "Tasks".bold(), output.tasks);
    for (status, count) in &output.tasks_by_status {
        println!("  {status}: {count}");
    }

    println!("{} {}", "Quotas".bold(), output.quotas);
    println!("{} {}", "Updates".bold(), output.updates);

    Ok(())
}
