//! SQLite storage engine.
//!
//! `Storage` owns one connection and runs units of work against all five
//! stores inside a single transaction. Concurrency is left to SQLite: each
//! thread opens its own `Storage` on the same file and writers are
//! serialized by IMMEDIATE transactions plus the busy timeout.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::Result;
use crate::snapshot::{self, Snapshot, SnapshotSummary};

use super::framework::FrameworkStore;
use super::jobs::JobStore;
use super::migrations::upgrade_update_schema_if_needed;
use super::quotas::QuotaStore;
use super::schema::{ensure_schema, is_legacy_update_schema};
use super::tasks::TaskStore;
use super::updates::UpdateStore;

/// Default busy timeout when none is configured.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle exposing every store within one transaction.
///
/// Handed to units of work by [`Storage::execute`]; it cannot outlive the
/// transaction it was created for.
pub struct StoreProvider<'a> {
    conn: &'a Connection,
}

impl<'a> StoreProvider<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[must_use]
    pub fn framework(&self) -> FrameworkStore<'a> {
        FrameworkStore::new(self.conn)
    }

    #[must_use]
    pub fn jobs(&self) -> JobStore<'a> {
        JobStore::new(self.conn)
    }

    #[must_use]
    pub fn quotas(&self) -> QuotaStore<'a> {
        QuotaStore::new(self.conn)
    }

    #[must_use]
    pub fn tasks(&self) -> TaskStore<'a> {
        TaskStore::new(self.conn)
    }

    #[must_use]
    pub fn updates(&self) -> UpdateStore<'a> {
        UpdateStore::new(self.conn)
    }
}

/// Unit of work that touches nothing; runs only the startup machinery.
///
/// # Errors
///
/// Never fails.
pub fn noop(_stores: &StoreProvider<'_>) -> Result<()> {
    Ok(())
}

/// SQLite-backed scheduler storage.
#[derive(Debug)]
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open a database at the given path.
    ///
    /// Creates the database if needed, applies the schema and upgrades any
    /// legacy layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open the database described by a resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_config(config: &StorageConfig) -> Result<Self> {
        Self::open_with_timeout(&config.db_path, config.busy_timeout)
    }

    /// Open a database with an explicit busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;

        let mut storage = Self { conn };
        storage.start(noop)?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let mut storage = Self {
            conn: Connection::open_in_memory()?,
        };
        storage.start(noop)?;
        Ok(storage)
    }

    /// Get a reference to the underlying connection.
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Bring the schema up to date, then run `initialization` once.
    ///
    /// Legacy layouts are upgraded as part of applying the schema. Safe to
    /// call on every startup. A failed schema upgrade aborts before
    /// `initialization` runs.
    ///
    /// # Errors
    ///
    /// Returns `Error::SchemaUpgrade` if a legacy layout cannot be upgraded,
    /// or whatever `initialization` returns.
    pub fn start<F, R>(&mut self, initialization: F) -> Result<R>
    where
        F: FnOnce(&StoreProvider<'_>) -> Result<R>,
    {
        ensure_schema(&self.conn)?;
        self.execute(initialization)
    }

    /// Run `work` against every store inside one transaction.
    ///
    /// All mutations made by `work` commit together. If `work` returns an
    /// error, everything it wrote is rolled back and the error is returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns the error from `work`, or a database error if the
    /// transaction cannot be started or committed.
    pub fn execute<F, R>(&mut self, work: F) -> Result<R>
    where
        F: FnOnce(&StoreProvider<'_>) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Dropping `tx` on the error path rolls back.
        let result = work(&StoreProvider::new(&tx))?;

        tx.commit()?;
        Ok(result)
    }

    /// Whether the update table still has the legacy layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the table metadata cannot be read.
    pub fn is_legacy_schema(&self) -> Result<bool> {
        is_legacy_update_schema(&self.conn)
    }

    /// Upgrade the legacy update table layout if present.
    ///
    /// Returns whether an upgrade ran.
    ///
    /// # Errors
    ///
    /// Returns `Error::SchemaUpgrade` if the upgrade fails.
    pub fn upgrade_if_needed(&mut self) -> Result<bool> {
        upgrade_update_schema_if_needed(&self.conn)
    }

    /// Serialize the contents of every store into one snapshot blob.
    ///
    /// The stores are read inside a single transaction, so the snapshot
    /// reflects one consistent instant.
    ///
    /// # Errors
    ///
    /// Returns an error if a store cannot be read or the blob cannot be encoded.
    pub fn create_snapshot(&mut self) -> Result<Vec<u8>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)?;
        let state = snapshot::capture(&StoreProvider::new(&tx))?;
        tx.commit()?;

        let document = Snapshot::new(state)?;
        let bytes = document.encode()?;
        info!(
            summary = %SnapshotSummary::from(&document),
            bytes = bytes.len(),
            "Created snapshot"
        );
        Ok(bytes)
    }

    /// Replace the contents of every store with a snapshot.
    ///
    /// The blob is validated before any store is touched. Every store is
    /// cleared and repopulated inside one transaction, so a failure leaves
    /// the previous state intact.
    ///
    /// # Errors
    ///
    /// Returns `Error::SnapshotVersion` or `Error::SnapshotCorrupt` for a
    /// blob that cannot be applied, or a database error from the restore.
    pub fn apply_snapshot(&mut self, bytes: &[u8]) -> Result<()> {
        let document = Snapshot::decode(bytes)?;
        debug!(created_at = %document.created_at, "Applying snapshot");

        self.execute(|stores| snapshot::restore(stores, &document.state))?;

        info!(summary = %SnapshotSummary::from(&document), "Applied snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{
        job_key, Identity, JobConfiguration, JobUpdateConfiguration, Quota, ScheduledTask,
        TaskInfo, TaskUpdateConfiguration,
    };
    use crate::query::Query;
    use crate::shards;

    fn job(name: &str, role: &str, user: &str) -> JobConfiguration {
        JobConfiguration::new(Identity::new(role, user), name)
    }

    fn make_task(task_id: &str) -> ScheduledTask {
        let mut info = TaskInfo::new(Identity::new("jake", "jake"), "spin", 0);
        info.start_command = format!("run {task_id}");
        ScheduledTask::new(task_id, info)
    }

    #[test]
    fn test_open_memory() {
        let storage = Storage::open_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_framework_storage() {
        let mut storage = Storage::open_memory().unwrap();

        let fetch = |storage: &mut Storage| storage.execute(|s| s.framework().fetch()).unwrap();
        assert_eq!(fetch(&mut storage), None);

        storage.execute(|s| s.framework().save("jake")).unwrap();
        assert_eq!(fetch(&mut storage), Some("jake".to_string()));

        storage.execute(|s| s.framework().save("jane")).unwrap();
        assert_eq!(fetch(&mut storage), Some("jane".to_string()));

        storage
            .execute(|s| {
                for id in ["jim", "jeff", "bob"] {
                    s.framework().save(id)?;
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(fetch(&mut storage), Some("bob".to_string()));
    }

    #[test]
    fn test_framework_empty_string_is_present() {
        let mut storage = Storage::open_memory().unwrap();
        storage.execute(|s| s.framework().save("")).unwrap();
        let id = storage.execute(|s| s.framework().fetch()).unwrap();
        assert_eq!(id, Some(String::new()));
    }

    #[test]
    fn test_job_configuration_storage() {
        let mut storage = Storage::open_memory().unwrap();
        let job1 = job("fortune", "jake", "jake");
        let job2 = job("df", "jane", "jane");
        let job3 = job("uname", "fred", "fred");

        storage
            .execute(|s| {
                s.jobs().save("CRON", &job1)?;
                s.jobs().save("CRON", &job2)?;
                s.jobs().save("IMMEDIATE", &job3)
            })
            .unwrap();

        storage
            .execute(|s| {
                assert!(s.jobs().fetch_all("DNE")?.is_empty());
                assert_eq!(s.jobs().fetch_all("CRON")?, vec![job1.clone(), job2.clone()]);
                assert_eq!(s.jobs().fetch_all("IMMEDIATE")?, vec![job3.clone()]);
                Ok(())
            })
            .unwrap();

        storage
            .execute(|s| s.jobs().remove(&job1.job_key()))
            .unwrap();

        storage
            .execute(|s| {
                assert_eq!(s.jobs().fetch_all("CRON")?, vec![job2.clone()]);
                assert_eq!(s.jobs().fetch_all("IMMEDIATE")?, vec![job3.clone()]);
                assert_eq!(s.jobs().fetch("IMMEDIATE", &job2.job_key())?, None);
                assert_eq!(s.jobs().fetch("CRON", &job2.job_key())?, Some(job2.clone()));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_job_resave_keeps_order() {
        let mut storage = Storage::open_memory().unwrap();
        let first = job("a", "jake", "jake");
        let second = job("b", "jake", "jake");

        storage
            .execute(|s| {
                s.jobs().save("CRON", &first)?;
                s.jobs().save("CRON", &second)?;
                let mut updated = first.clone();
                updated.cron_schedule = Some("*/5 * * * *".to_string());
                s.jobs().save("CRON", &updated)?;

                let names: Vec<_> = s.jobs().fetch_all("CRON")?.into_iter().map(|j| j.name).collect();
                assert_eq!(names, vec!["a", "b"]);
                assert_eq!(
                    s.jobs().fetch_manager_ids()?.into_iter().collect::<Vec<_>>(),
                    vec!["CRON".to_string()]
                );
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_job_saved_under_another_manager_moves() {
        let mut storage = Storage::open_memory().unwrap();
        let fortune = job("fortune", "jake", "jake");

        storage
            .execute(|s| {
                s.jobs().save("CRON", &fortune)?;
                s.jobs().save("IMMEDIATE", &fortune)?;

                assert!(s.jobs().fetch_all("CRON")?.is_empty());
                assert_eq!(s.jobs().fetch_all("IMMEDIATE")?, vec![fortune.clone()]);
                assert_eq!(s.jobs().fetch("CRON", &fortune.job_key())?, None);
                assert_eq!(
                    s.jobs().fetch_manager_ids()?.into_iter().collect::<Vec<_>>(),
                    vec!["IMMEDIATE".to_string()]
                );
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_quota_storage() {
        let mut storage = Storage::open_memory().unwrap();
        let quota = Quota::new(5.0, 2, 10);
        let quota2 = Quota::new(1.0, 3, 5);

        storage
            .execute(|s| {
                let quotas = s.quotas();
                assert_eq!(quotas.fetch("jane")?, None);

                quotas.save("jane", &quota)?;
                assert_eq!(quotas.fetch("jane")?, Some(quota));

                quotas.save("jane", &quota2)?;
                assert_eq!(quotas.fetch("jane")?, Some(quota2));

                quotas.remove("jane")?;
                assert_eq!(quotas.fetch("jane")?, None);

                quotas.save("foo", &quota)?;
                quotas.save("bar", &quota2)?;
                assert_eq!(
                    quotas.fetch_all_roles()?,
                    ["bar", "foo"].into_iter().map(String::from).collect()
                );

                quotas.delete_all()?;
                assert!(quotas.fetch_all_roles()?.is_empty());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_task_store_size() {
        let mut storage = Storage::open_memory().unwrap();
        let size = |storage: &mut Storage| storage.execute(|s| s.tasks().size()).unwrap();

        assert_eq!(size(&mut storage), 0);

        storage.execute(|s| s.tasks().save(&[make_task("task1")])).unwrap();
        assert_eq!(size(&mut storage), 1);

        storage
            .execute(|s| s.tasks().save(&[make_task("task2"), make_task("task3")]))
            .unwrap();
        assert_eq!(size(&mut storage), 3);

        // Re-saving an existing id does not grow the store.
        storage.execute(|s| s.tasks().save(&[make_task("task2")])).unwrap();
        assert_eq!(size(&mut storage), 3);

        storage.execute(|s| s.tasks().remove(&Query::GET_ALL)).unwrap();
        assert_eq!(size(&mut storage), 0);
    }

    #[test]
    fn test_task_queries() {
        let mut storage = Storage::open_memory().unwrap();

        let mut other = make_task("other-0");
        other.assigned_task.task = TaskInfo::new(Identity::new("jane", "jane"), "df", 0);
        let mut running = make_task("spin-1");
        running.assigned_task.task.shard_id = 1;
        running.status = crate::model::ScheduleStatus::Running;
        running.assigned_task.slave_host = Some("host-a".to_string());

        storage
            .execute(|s| s.tasks().save(&[make_task("spin-0"), running.clone(), other.clone()]))
            .unwrap();

        storage
            .execute(|s| {
                let tasks = s.tasks();
                assert_eq!(tasks.fetch_ids(&Query::by_job("jake", "spin"))?.len(), 2);
                assert_eq!(tasks.fetch_ids(&Query::by_role("jane"))?.len(), 1);
                assert_eq!(
                    tasks.fetch(&Query::by_job("jake", "spin").with_shards([1]))?,
                    vec![running.clone()]
                );
                assert_eq!(
                    tasks.fetch(
                        &Query::GET_ALL.with_statuses([crate::model::ScheduleStatus::Running])
                    )?,
                    vec![running.clone()]
                );
                assert_eq!(tasks.fetch(&Query::GET_ALL.on_host("host-a"))?.len(), 1);
                assert_eq!(tasks.fetch(&Query::by_id("other-0"))?, vec![other.clone()]);
                assert!(tasks.fetch_ids(&Query::by_id("missing"))?.is_empty());

                assert_eq!(tasks.remove(&Query::by_role("jake"))?, 2);
                assert_eq!(tasks.fetch_ids(&Query::GET_ALL)?.len(), 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_job_update_round_trip() {
        let mut storage = Storage::open_memory().unwrap();
        let original = make_task("42").assigned_task.task;
        let mut updated = original.clone();
        updated.num_cpus = 42.0;

        let update = JobUpdateConfiguration::new(
            "jake",
            "spin",
            "please",
            [TaskUpdateConfiguration::modify(original.clone(), updated.clone())],
        );
        storage.execute(|s| s.updates().save(&update)).unwrap();

        let fetched = storage
            .execute(|s| s.updates().fetch("jake", "spin"))
            .unwrap()
            .unwrap();
        assert_eq!(fetched, update);
        assert_eq!(fetched.update_token, "please");
        let config = &fetched.configs()[0];
        assert_eq!(fetched.configs().len(), 1);
        assert_eq!(shards::original_config(config), Some(&original));
        assert_eq!(shards::updated_config(config), Some(&updated));
    }

    #[test]
    fn test_job_update_replaces_wholesale() {
        let mut storage = Storage::open_memory().unwrap();
        let info = |shard| TaskInfo::new(Identity::new("jake", "jake"), "spin", shard);

        let first = JobUpdateConfiguration::new(
            "jake",
            "spin",
            "one",
            [
                TaskUpdateConfiguration::add(info(0)),
                TaskUpdateConfiguration::add(info(1)),
            ],
        );
        let second = JobUpdateConfiguration::new(
            "jake",
            "spin",
            "two",
            [TaskUpdateConfiguration::remove(info(1))],
        );

        storage
            .execute(|s| {
                s.updates().save(&first)?;
                s.updates().save(&second)?;
                assert_eq!(s.updates().fetch("jake", "spin")?, Some(second.clone()));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_job_updates_for_role() {
        let mut storage = Storage::open_memory().unwrap();
        let info = |role: &str, job: &str| TaskInfo::new(Identity::new(role, role), job, 0);

        let spin = JobUpdateConfiguration::new(
            "jake",
            "spin",
            "t1",
            [TaskUpdateConfiguration::add(info("jake", "spin"))],
        );
        let empty = JobUpdateConfiguration::new("jake", "idle", "t2", []);
        let other = JobUpdateConfiguration::new(
            "jakeb",
            "spin",
            "t3",
            [TaskUpdateConfiguration::add(info("jakeb", "spin"))],
        );

        storage
            .execute(|s| {
                let updates = s.updates();
                updates.save(&spin)?;
                updates.save(&empty)?;
                updates.save(&other)?;

                assert_eq!(updates.fetch_all_for_role("jake")?, vec![empty.clone(), spin.clone()]);
                assert!(updates.fetch_all_for_role("nobody")?.is_empty());
                assert_eq!(updates.fetch_all()?.len(), 3);

                assert!(updates.remove("jake", "idle")?);
                assert_eq!(updates.fetch("jake", "idle")?, None);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_update_role_with_slash_rejected() {
        let mut storage = Storage::open_memory().unwrap();
        let update = JobUpdateConfiguration::new("a/b", "spin", "tok", []);
        let result = storage.execute(|s| s.updates().save(&update));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_non_finite_resources_rejected_on_save() {
        let mut storage = Storage::open_memory().unwrap();
        let mut bad_info = make_task("x").assigned_task.task;
        bad_info.num_cpus = f64::INFINITY;

        let result = storage.execute(|s| s.quotas().save("jake", &Quota::new(f64::INFINITY, 1, 1)));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let mut bad_job = job("spin", "jake", "jake");
        bad_job.task_configs.push(bad_info.clone());
        let result = storage.execute(|s| s.jobs().save("CRON", &bad_job));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let update = JobUpdateConfiguration::new(
            "jake",
            "spin",
            "tok",
            [TaskUpdateConfiguration::add(bad_info)],
        );
        let result = storage.execute(|s| s.updates().save(&update));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        storage
            .execute(|s| {
                assert_eq!(s.quotas().fetch("jake")?, None);
                assert!(s.jobs().fetch_all("CRON")?.is_empty());
                assert_eq!(s.updates().fetch("jake", "spin")?, None);
                Ok(())
            })
            .unwrap();
        // Nothing unreadable was written, so the store can still be captured.
        assert!(storage.create_snapshot().is_ok());
    }

    #[test]
    fn test_failed_work_rolls_back() {
        let mut storage = Storage::open_memory().unwrap();

        let result: Result<()> = storage.execute(|s| {
            s.framework().save("doomed")?;
            s.quotas().save("jake", &Quota::new(1.0, 1, 1))?;
            s.tasks().save(&[make_task("t1")])?;
            Err(Error::InvalidArgument("abort".to_string()))
        });
        assert!(matches!(result, Err(Error::InvalidArgument(msg)) if msg == "abort"));

        storage
            .execute(|s| {
                assert_eq!(s.framework().fetch()?, None);
                assert_eq!(s.quotas().fetch("jake")?, None);
                assert_eq!(s.tasks().size()?, 0);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_start_runs_initialization_once() {
        let mut storage = Storage::open_memory().unwrap();
        let id = storage
            .start(|s| {
                s.framework().save("boot")?;
                s.framework().fetch()
            })
            .unwrap();
        assert_eq!(id, Some("boot".to_string()));
    }

    #[test]
    fn test_update_schema_upgrade() {
        let mut storage = Storage::open_memory().unwrap();
        assert!(!storage.is_legacy_schema().unwrap());

        storage
            .conn()
            .execute_batch(
                "DROP TABLE IF EXISTS update_store;
                 DROP INDEX IF EXISTS update_store_job_key_shard_id_idx;
                 CREATE TABLE IF NOT EXISTS update_store (
                   job_key VARCHAR(511) NOT NULL,
                   update_token VARCHAR(36) NOT NULL,
                   shard_id INT NOT NULL,
                   config BINARY(2000000) NOT NULL);
                 CREATE INDEX IF NOT EXISTS update_store_job_key_shard_id_idx
                   ON update_store(job_key, shard_id);",
            )
            .unwrap();

        assert!(storage.is_legacy_schema().unwrap());
        assert!(storage.upgrade_if_needed().unwrap());

        storage.start(noop).unwrap();
        assert!(!storage.is_legacy_schema().unwrap());
    }

    #[test]
    fn test_update_schema_upgrade_noop() {
        let mut storage = Storage::open_memory().unwrap();
        assert!(!storage.upgrade_if_needed().unwrap());
        assert!(!storage.is_legacy_schema().unwrap());
    }

    #[test]
    fn test_upgraded_rows_remain_readable() {
        let mut storage = Storage::open_memory().unwrap();
        let update = JobUpdateConfiguration::new(
            "jake",
            "spin",
            "please",
            [TaskUpdateConfiguration::add(make_task("1").assigned_task.task)],
        );
        storage.execute(|s| s.updates().save(&update)).unwrap();

        storage
            .conn()
            .execute_batch(
                "CREATE TABLE legacy (
                   job_key VARCHAR(511) NOT NULL,
                   update_token VARCHAR(36) NOT NULL,
                   shard_id INT NOT NULL,
                   config BINARY(2000000) NOT NULL);
                 INSERT INTO legacy SELECT * FROM update_store;
                 DROP TABLE update_store;
                 ALTER TABLE legacy RENAME TO update_store;",
            )
            .unwrap();
        assert!(storage.is_legacy_schema().unwrap());

        storage.start(noop).unwrap();
        assert!(!storage.is_legacy_schema().unwrap());
        let fetched = storage.execute(|s| s.updates().fetch("jake", "spin")).unwrap();
        assert_eq!(fetched, Some(update));
    }

    #[test]
    fn test_snapshotting() {
        let mut storage = Storage::open_memory().unwrap();
        let (role, job_name, token) = ("jake", "spin", "please");

        let snapshot1 = storage.create_snapshot().unwrap();

        storage.execute(|s| s.framework().save("framework")).unwrap();
        let snapshot2 = storage.create_snapshot().unwrap();

        let fortune_cron = job(job_name, role, job_name);
        let original_task = make_task("42");
        let original_info = original_task.assigned_task.task.clone();
        let mut new_info = original_info.clone();
        new_info.num_cpus = 42.0;
        let update = JobUpdateConfiguration::new(
            role,
            job_name,
            token,
            [TaskUpdateConfiguration::modify(original_info.clone(), new_info.clone())],
        );
        storage
            .execute(|s| {
                s.jobs().save("CRON", &fortune_cron)?;
                s.tasks().save(&[original_task.clone()])?;
                s.updates().save(&update)
            })
            .unwrap();
        let snapshot3 = storage.create_snapshot().unwrap();

        storage.apply_snapshot(&snapshot1).unwrap();
        storage
            .execute(|s| {
                assert_eq!(s.framework().fetch()?, None);
                assert!(s.jobs().fetch_all("CRON")?.is_empty());
                assert!(s.tasks().fetch_ids(&Query::GET_ALL)?.is_empty());
                assert!(s.updates().fetch_all_for_role(role)?.is_empty());
                Ok(())
            })
            .unwrap();

        storage.apply_snapshot(&snapshot3).unwrap();
        storage
            .execute(|s| {
                assert_eq!(s.framework().fetch()?, Some("framework".to_string()));
                assert_eq!(s.jobs().fetch_all("CRON")?, vec![fortune_cron.clone()]);
                assert_eq!(
                    s.tasks().fetch_ids(&Query::GET_ALL)?.into_iter().collect::<Vec<_>>(),
                    vec!["42".to_string()]
                );
                let fetched = s.updates().fetch(role, job_name)?.unwrap();
                assert_eq!(fetched.update_token, token);
                assert_eq!(fetched.configs().len(), 1);
                assert_eq!(fetched.configs()[0].old_config(), Some(&original_info));
                assert_eq!(fetched.configs()[0].new_config(), Some(&new_info));
                Ok(())
            })
            .unwrap();

        storage.apply_snapshot(&snapshot2).unwrap();
        storage
            .execute(|s| {
                assert_eq!(s.framework().fetch()?, Some("framework".to_string()));
                assert!(s.jobs().fetch_all("CRON")?.is_empty());
                assert!(s.tasks().fetch_ids(&Query::GET_ALL)?.is_empty());
                assert!(s.updates().fetch_all_for_role(role)?.is_empty());
                assert_eq!(s.jobs().fetch("CRON", &job_key(role, job_name))?, None);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_snapshot_round_trip_restores_quotas() {
        let mut storage = Storage::open_memory().unwrap();
        storage
            .execute(|s| {
                s.quotas().save("jake", &Quota::new(2.5, 512, 1024))?;
                s.quotas().save("jane", &Quota::new(1.0, 128, 256))
            })
            .unwrap();
        let snapshot = storage.create_snapshot().unwrap();

        storage
            .execute(|s| {
                s.quotas().remove("jake")?;
                s.quotas().save("fred", &Quota::default())?;
                Ok(())
            })
            .unwrap();
        storage.apply_snapshot(&snapshot).unwrap();

        storage
            .execute(|s| {
                assert_eq!(
                    s.quotas().fetch_all_roles()?,
                    ["jake", "jane"].into_iter().map(String::from).collect()
                );
                assert_eq!(s.quotas().fetch("jake")?, Some(Quota::new(2.5, 512, 1024)));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_rejected_snapshot_leaves_state_untouched() {
        let mut storage = Storage::open_memory().unwrap();
        storage.execute(|s| s.framework().save("keep")).unwrap();

        let result = storage.apply_snapshot(b"{\"version\": 99, \"state\": {}}");
        assert!(matches!(result, Err(Error::SnapshotVersion { found: 99, .. })));

        let result = storage.apply_snapshot(b"not a snapshot");
        assert!(matches!(result, Err(Error::SnapshotCorrupt(_))));

        let id = storage.execute(|s| s.framework().fetch()).unwrap();
        assert_eq!(id, Some("keep".to_string()));
    }

    #[test]
    fn test_restore_failing_partway_keeps_previous_state() {
        let mut storage = Storage::open_memory().unwrap();
        let kept_job = job("fortune", "jake", "jake");
        let kept_update = JobUpdateConfiguration::new(
            "jake",
            "fortune",
            "keep",
            [TaskUpdateConfiguration::add(make_task("k").assigned_task.task)],
        );
        storage
            .execute(|s| {
                s.framework().save("before")?;
                s.jobs().save("CRON", &kept_job)?;
                s.quotas().save("jake", &Quota::new(1.0, 64, 64))?;
                s.tasks().save(&[make_task("kept")])?;
                s.updates().save(&kept_update)
            })
            .unwrap();
        let before = storage.execute(snapshot::capture).unwrap();

        // Valid in every section except the last one restored.
        let state = snapshot::StoreState {
            framework_id: Some("after".to_string()),
            jobs: vec![snapshot::StoredJob {
                manager_id: "IMMEDIATE".to_string(),
                config: job("df", "jane", "jane"),
            }],
            quotas: vec![snapshot::StoredQuota {
                role: "jane".to_string(),
                quota: Quota::new(2.0, 128, 128),
            }],
            tasks: vec![make_task("replacement")],
            update_configs: vec![JobUpdateConfiguration::new("a/b", "spin", "tok", [])],
        };
        let bytes = Snapshot::new(state).unwrap().encode().unwrap();

        let result = storage.apply_snapshot(&bytes);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let after = storage.execute(snapshot::capture).unwrap();
        assert_eq!(after, before);
        assert_eq!(after.framework_id.as_deref(), Some("before"));
        assert_eq!(after.update_configs, vec![kept_update]);
    }

    #[test]
    fn test_file_backed_connections_share_state() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("scheduler.db");

        let mut writer = Storage::open(&path).unwrap();
        let mut reader = Storage::open(&path).unwrap();

        writer.execute(|s| s.framework().save("shared")).unwrap();
        let id = reader.execute(|s| s.framework().fetch()).unwrap();
        assert_eq!(id, Some("shared".to_string()));
    }
}
