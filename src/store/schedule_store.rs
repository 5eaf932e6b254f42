//! ScheduleStore implementation with JSONL append log and SQLite index.
//!
//! - **JSONL file**: append-only log of every record version (source of truth)
//! - **SQLite database**: query index with the latest version of each record,
//!   rebuilt from the JSONL log when the two disagree
//!
//! Conditional writes run inside a SQLite transaction whose `UPDATE ... WHERE
//! status IN (...) AND revision = ?` is the compare-and-swap. The JSONL line
//! is appended just before commit and truncated away if the commit fails.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::ScheduleRepository;
use crate::domain::{NotificationRecord, ScheduleStatus, ScheduledContent};
use crate::error::{CadenceError, Result};

/// Schedule persistence with JSONL durability and SQLite queries.
pub struct ScheduleStore {
    base_dir: PathBuf,
    jsonl_path: PathBuf,
    db: Mutex<Connection>,
}

impl std::fmt::Debug for ScheduleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleStore")
            .field("base_dir", &self.base_dir)
            .finish_non_exhaustive()
    }
}

impl ScheduleStore {
    /// Open or create a store in the given directory.
    pub fn open_at(base_dir: &Path) -> Result<Self> {
        fs::create_dir_all(base_dir)?;

        let jsonl_path = base_dir.join("schedules.jsonl");
        let db_path = base_dir.join("schedules.db");

        let db = Connection::open(&db_path)?;
        Self::init_schema(&db)?;

        let store = Self {
            base_dir: base_dir.to_path_buf(),
            jsonl_path,
            db: Mutex::new(db),
        };
        store.rebuild_index_if_needed()?;
        Ok(store)
    }

    /// Get the base directory for this store.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schedules (
                id TEXT PRIMARY KEY,
                brand_id TEXT NOT NULL,
                status TEXT NOT NULL,
                priority INTEGER NOT NULL,
                scheduled_time INTEGER NOT NULL,
                reminder_at INTEGER,
                revision INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                json_data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_schedules_due ON schedules(status, scheduled_time);
            CREATE INDEX IF NOT EXISTS idx_schedules_brand ON schedules(brand_id, scheduled_time);
            CREATE INDEX IF NOT EXISTS idx_schedules_reminder ON schedules(status, reminder_at);

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            "#,
        )?;

        // Indexes created before revisions existed
        let has_revision: i64 = db.query_row(
            "SELECT COUNT(*) FROM pragma_table_info('schedules') WHERE name = 'revision'",
            [],
            |row| row.get(0),
        )?;
        if has_revision == 0 {
            db.execute("ALTER TABLE schedules ADD COLUMN revision INTEGER NOT NULL DEFAULT 0", [])?;
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|e| CadenceError::Storage(e.to_string()))
    }

    /// Rebuild the SQLite index when the log has lines the index has not seen.
    fn rebuild_index_if_needed(&self) -> Result<()> {
        if !self.jsonl_path.exists() {
            return Ok(());
        }

        let jsonl_lines = BufReader::new(File::open(&self.jsonl_path)?).lines().count() as i64;
        let mut db = self.lock()?;
        let indexed: i64 = db
            .query_row("SELECT value FROM meta WHERE key = 'indexed_lines'", [], |row| row.get(0))
            .optional()?
            .unwrap_or(0);

        if jsonl_lines != indexed {
            tracing::info!(jsonl_lines, indexed, "Rebuilding schedule index from log");
            self.rebuild_index(&mut db, jsonl_lines)?;
        }
        Ok(())
    }

    fn rebuild_index(&self, db: &mut Connection, jsonl_lines: i64) -> Result<()> {
        let file = File::open(&self.jsonl_path)?;
        let mut latest: HashMap<String, ScheduledContent> = HashMap::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ScheduledContent = serde_json::from_str(&line)?;
            latest.insert(record.id.clone(), record);
        }

        let tx = db.transaction()?;
        tx.execute("DELETE FROM schedules", [])?;
        for record in latest.values() {
            upsert_row(&tx, record)?;
        }
        set_indexed_lines(&tx, jsonl_lines)?;
        tx.commit()?;
        Ok(())
    }

    /// Append the written version to the log, then commit.
    ///
    /// The log line is truncated away again if the commit fails, so the log
    /// never holds a version the index rejected.
    fn commit_logged(&self, tx: Transaction<'_>, record: &ScheduledContent) -> Result<()> {
        let json = serde_json::to_string(record)?;
        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('indexed_lines', 1)
             ON CONFLICT(key) DO UPDATE SET value = value + 1",
            [],
        )?;

        let mut file = OpenOptions::new().create(true).append(true).open(&self.jsonl_path)?;
        let len = file.metadata()?.len();
        let written = writeln!(file, "{}", json)
            .map_err(CadenceError::from)
            .and_then(|_| tx.commit().map_err(CadenceError::from));
        if let Err(e) = written {
            file.set_len(len)?;
            return Err(e);
        }
        Ok(())
    }

    fn query(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<ScheduledContent>> {
        let db = self.lock()?;
        let mut stmt = db.prepare(sql)?;
        let rows = stmt.query_map(args, |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            let record: ScheduledContent = serde_json::from_str(&row?)?;
            records.push(record);
        }
        Ok(records)
    }

    fn load(tx: &Transaction<'_>, id: &str) -> Result<Option<ScheduledContent>> {
        let json: Option<String> = tx
            .query_row("SELECT json_data FROM schedules WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Write `record` if the stored row is still at `record.revision` and its
    /// status is one of `expected`. Returns the written version.
    fn write_if_current(
        tx: &Transaction<'_>,
        record: &ScheduledContent,
        expected: &[ScheduleStatus],
    ) -> Result<Option<ScheduledContent>> {
        let allowed = expected
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let mut next = record.clone();
        next.revision = record.revision + 1;

        let sql = format!(
            "UPDATE schedules SET brand_id = ?2, status = ?3, priority = ?4, scheduled_time = ?5,
                 reminder_at = ?6, updated_at = ?7, revision = ?8, json_data = ?9
             WHERE id = ?1 AND revision = ?10 AND status IN ({})",
            allowed
        );
        let changed = tx.execute(
            &sql,
            params![
                next.id,
                next.brand_id,
                next.status.as_str(),
                next.priority.rank(),
                next.scheduled_time.timestamp_millis(),
                next.reminder_at.map(|t| t.timestamp_millis()),
                next.updated_at.timestamp_millis(),
                next.revision as i64,
                serde_json::to_string(&next)?,
                record.revision as i64,
            ],
        )?;
        Ok((changed > 0).then_some(next))
    }
}

fn upsert_row(db: &Connection, record: &ScheduledContent) -> Result<()> {
    db.execute(
        r#"
        INSERT OR REPLACE INTO schedules
        (id, brand_id, status, priority, scheduled_time, reminder_at, created_at, updated_at, revision, json_data)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            record.id,
            record.brand_id,
            record.status.as_str(),
            record.priority.rank(),
            record.scheduled_time.timestamp_millis(),
            record.reminder_at.map(|t| t.timestamp_millis()),
            record.created_at.timestamp_millis(),
            record.updated_at.timestamp_millis(),
            record.revision as i64,
            serde_json::to_string(record)?,
        ],
    )?;
    Ok(())
}

fn set_indexed_lines(db: &Connection, lines: i64) -> Result<()> {
    db.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES ('indexed_lines', ?1)",
        [lines],
    )?;
    Ok(())
}

#[async_trait]
impl ScheduleRepository for ScheduleStore {
    async fn insert_schedule(&self, schedule: &ScheduledContent) -> Result<()> {
        let mut db = self.lock()?;
        let tx = db.transaction()?;
        if Self::load(&tx, &schedule.id)?.is_some() {
            return Err(CadenceError::Storage(format!("schedule already exists: {}", schedule.id)));
        }
        upsert_row(&tx, schedule)?;
        self.commit_logged(tx, schedule)
    }

    async fn get_schedule_by_id(&self, id: &str) -> Result<Option<ScheduledContent>> {
        Ok(self
            .query("SELECT json_data FROM schedules WHERE id = ?1", &[&id])?
            .into_iter()
            .next())
    }

    async fn update_schedule_status(&self, id: &str, status: ScheduleStatus, reason: Option<&str>) -> Result<()> {
        let mut db = self.lock()?;
        let tx = db.transaction()?;
        let mut record = Self::load(&tx, id)?.ok_or_else(|| CadenceError::NotFound(id.to_string()))?;
        let previous = record.status;

        record.transition(status)?;
        if let Some(reason) = reason {
            record.failure_reason = Some(reason.to_string());
        }
        if status == ScheduleStatus::Published && record.published_at.is_none() {
            record.published_at = Some(Utc::now());
        }

        let Some(written) = Self::write_if_current(&tx, &record, &[previous])? else {
            return Err(CadenceError::Storage(format!("concurrent update on schedule {}", id)));
        };
        self.commit_logged(tx, &written)
    }

    async fn replace_if_status(&self, schedule: &ScheduledContent, expected: &[ScheduleStatus]) -> Result<bool> {
        let mut db = self.lock()?;
        let tx = db.transaction()?;
        let Some(written) = Self::write_if_current(&tx, schedule, expected)? else {
            return Ok(false);
        };
        self.commit_logged(tx, &written)?;
        Ok(true)
    }

    async fn claim_for_publishing(&self, id: &str, now: DateTime<Utc>) -> Result<Option<ScheduledContent>> {
        let mut db = self.lock()?;
        let tx = db.transaction()?;
        let Some(mut record) = Self::load(&tx, id)? else {
            return Ok(None);
        };
        if record.status != ScheduleStatus::Scheduled || record.scheduled_time > now {
            return Ok(None);
        }

        record.status = ScheduleStatus::Publishing;
        record.touch();
        let Some(claimed) = Self::write_if_current(&tx, &record, &[ScheduleStatus::Scheduled])? else {
            return Ok(None);
        };
        self.commit_logged(tx, &claimed)?;
        Ok(Some(claimed))
    }

    async fn record_notification(&self, id: &str, entry: &NotificationRecord) -> Result<bool> {
        let mut db = self.lock()?;
        let tx = db.transaction()?;
        let mut record = Self::load(&tx, id)?.ok_or_else(|| CadenceError::NotFound(id.to_string()))?;
        if record.has_notification(entry) {
            return Ok(false);
        }
        record.notifications.push(entry.clone());
        let status = record.status;
        let Some(written) = Self::write_if_current(&tx, &record, &[status])? else {
            return Ok(false);
        };
        self.commit_logged(tx, &written)?;
        Ok(true)
    }

    async fn get_schedules_due_for_publishing(&self, before: DateTime<Utc>) -> Result<Vec<ScheduledContent>> {
        self.query(
            "SELECT json_data FROM schedules
             WHERE status = 'scheduled' AND scheduled_time <= ?1
             ORDER BY priority DESC, scheduled_time ASC",
            &[&before.timestamp_millis()],
        )
    }

    async fn get_schedules_due_for_notification(&self, before: DateTime<Utc>) -> Result<Vec<ScheduledContent>> {
        let candidates = self.query(
            "SELECT json_data FROM schedules
             WHERE status = 'scheduled' AND reminder_at IS NOT NULL AND reminder_at <= ?1
             ORDER BY reminder_at ASC",
            &[&before.timestamp_millis()],
        )?;
        Ok(candidates.into_iter().filter(|s| s.reminder_due(before)).collect())
    }

    async fn get_stale_publishing(&self, updated_before: DateTime<Utc>) -> Result<Vec<ScheduledContent>> {
        self.query(
            "SELECT json_data FROM schedules
             WHERE status = 'publishing' AND updated_at <= ?1
             ORDER BY updated_at ASC",
            &[&updated_before.timestamp_millis()],
        )
    }

    async fn list_schedules(&self, brand_id: Option<&str>) -> Result<Vec<ScheduledContent>> {
        match brand_id {
            Some(brand) => self.query(
                "SELECT json_data FROM schedules WHERE brand_id = ?1 ORDER BY scheduled_time",
                &[&brand],
            ),
            None => self.query("SELECT json_data FROM schedules ORDER BY scheduled_time", &[]),
        }
    }

    async fn list_in_window(
        &self,
        brand_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScheduledContent>> {
        self.query(
            "SELECT json_data FROM schedules
             WHERE brand_id = ?1 AND scheduled_time >= ?2 AND scheduled_time < ?3
             ORDER BY scheduled_time",
            &[&brand_id, &start.timestamp_millis(), &end.timestamp_millis()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schedule::fixtures::sample_schedule;
    use crate::domain::{NotificationKind, Priority};
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_temp_store() -> (ScheduleStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = ScheduleStore::open_at(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (store, _temp) = create_temp_store();
        let schedule = sample_schedule();

        store.insert_schedule(&schedule).await.unwrap();

        let loaded = store.get_schedule_by_id(&schedule.id).await.unwrap().unwrap();
        assert_eq!(loaded, schedule);
    }

    #[tokio::test]
    async fn test_insert_duplicate_fails() {
        let (store, _temp) = create_temp_store();
        let schedule = sample_schedule();
        store.insert_schedule(&schedule).await.unwrap();
        assert!(store.insert_schedule(&schedule).await.is_err());
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let (store, _temp) = create_temp_store();
        assert!(store.get_schedule_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_status_records_reason() {
        let (store, _temp) = create_temp_store();
        let schedule = sample_schedule();
        store.insert_schedule(&schedule).await.unwrap();

        store
            .update_schedule_status(&schedule.id, ScheduleStatus::Publishing, None)
            .await
            .unwrap();
        store
            .update_schedule_status(&schedule.id, ScheduleStatus::Failed, Some("Max retries exceeded"))
            .await
            .unwrap();

        let loaded = store.get_schedule_by_id(&schedule.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ScheduleStatus::Failed);
        assert_eq!(loaded.failure_reason.as_deref(), Some("Max retries exceeded"));
    }

    #[tokio::test]
    async fn test_update_status_rejects_illegal_transition() {
        let (store, _temp) = create_temp_store();
        let schedule = sample_schedule();
        store.insert_schedule(&schedule).await.unwrap();

        let err = store
            .update_schedule_status(&schedule.id, ScheduleStatus::Published, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CadenceError::State(_)));

        store
            .update_schedule_status(&schedule.id, ScheduleStatus::Cancelled, None)
            .await
            .unwrap();
        let err = store
            .update_schedule_status(&schedule.id, ScheduleStatus::Publishing, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CadenceError::State(_)));

        let loaded = store.get_schedule_by_id(&schedule.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ScheduleStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_stale_revision_write_is_rejected() {
        let (store, _temp) = create_temp_store();
        let schedule = sample_schedule();
        store.insert_schedule(&schedule).await.unwrap();
        let stale = store.get_schedule_by_id(&schedule.id).await.unwrap().unwrap();

        let entry = NotificationRecord {
            kind: NotificationKind::PrePublishReminder,
            platform: None,
            attempt: 1,
            due_at: schedule.reminder_at,
            sent_at: Utc::now(),
            recipients: vec![],
        };
        assert!(store.record_notification(&schedule.id, &entry).await.unwrap());

        let mut edited = stale.clone();
        edited.title = "Edited".to_string();
        let written = store
            .replace_if_status(&edited, &[ScheduleStatus::Scheduled])
            .await
            .unwrap();
        assert!(!written);

        let loaded = store.get_schedule_by_id(&schedule.id).await.unwrap().unwrap();
        assert_eq!(loaded.notifications.len(), 1);
        assert_eq!(loaded.title, schedule.title);
        assert_eq!(loaded.revision, stale.revision + 1);
    }

    #[tokio::test]
    async fn test_log_lines_match_committed_writes() {
        let (store, temp) = create_temp_store();
        let schedule = sample_schedule();
        store.insert_schedule(&schedule).await.unwrap();

        let mut stale = schedule.clone();
        stale.revision = 7;
        assert!(!store.replace_if_status(&stale, &[ScheduleStatus::Scheduled]).await.unwrap());
        assert!(store.insert_schedule(&schedule).await.is_err());

        let log = fs::read_to_string(temp.path().join("schedules.jsonl")).unwrap();
        assert_eq!(log.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_update_status_missing_is_not_found() {
        let (store, _temp) = create_temp_store();
        let err = store
            .update_schedule_status("missing", ScheduleStatus::Failed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CadenceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_claim_is_single_flight() {
        let (store, _temp) = create_temp_store();
        let mut schedule = sample_schedule();
        schedule.scheduled_time = Utc::now() - Duration::minutes(1);
        store.insert_schedule(&schedule).await.unwrap();

        let now = Utc::now();
        let first = store.claim_for_publishing(&schedule.id, now).await.unwrap();
        let second = store.claim_for_publishing(&schedule.id, now).await.unwrap();

        assert_eq!(first.unwrap().status, ScheduleStatus::Publishing);
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_claim_skips_future_schedule() {
        let (store, _temp) = create_temp_store();
        let schedule = sample_schedule();
        store.insert_schedule(&schedule).await.unwrap();
        assert!(store.claim_for_publishing(&schedule.id, Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_if_status_detects_race() {
        let (store, _temp) = create_temp_store();
        let mut schedule = sample_schedule();
        schedule.scheduled_time = Utc::now() - Duration::minutes(1);
        store.insert_schedule(&schedule).await.unwrap();
        store.claim_for_publishing(&schedule.id, Utc::now()).await.unwrap();

        let mut edited = schedule.clone();
        edited.title = "Edited".to_string();
        let written = store
            .replace_if_status(&edited, &[ScheduleStatus::Draft, ScheduleStatus::Scheduled])
            .await
            .unwrap();

        assert!(!written);
        let loaded = store.get_schedule_by_id(&schedule.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, schedule.title);
    }

    #[tokio::test]
    async fn test_record_notification_is_idempotent() {
        let (store, _temp) = create_temp_store();
        let schedule = sample_schedule();
        store.insert_schedule(&schedule).await.unwrap();
        let entry = NotificationRecord {
            kind: NotificationKind::PrePublishReminder,
            platform: None,
            attempt: 1,
            due_at: schedule.reminder_at,
            sent_at: Utc::now(),
            recipients: vec!["ops@example.com".to_string()],
        };

        assert!(store.record_notification(&schedule.id, &entry).await.unwrap());
        assert!(!store.record_notification(&schedule.id, &entry).await.unwrap());

        let loaded = store.get_schedule_by_id(&schedule.id).await.unwrap().unwrap();
        assert_eq!(loaded.notifications.len(), 1);
    }

    #[tokio::test]
    async fn test_due_for_publishing_orders_by_priority() {
        let (store, _temp) = create_temp_store();
        let now = Utc::now();

        let mut low = sample_schedule();
        low.priority = Priority::Low;
        low.scheduled_time = now - Duration::minutes(10);
        let mut urgent = sample_schedule();
        urgent.priority = Priority::Urgent;
        urgent.scheduled_time = now - Duration::minutes(1);
        let future = sample_schedule();

        for s in [&low, &urgent, &future] {
            store.insert_schedule(s).await.unwrap();
        }

        let due = store.get_schedules_due_for_publishing(now).await.unwrap();
        let ids: Vec<&str> = due.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![urgent.id.as_str(), low.id.as_str()]);
    }

    #[tokio::test]
    async fn test_due_for_notification_excludes_sent() {
        let (store, _temp) = create_temp_store();
        let now = Utc::now();
        let mut schedule = sample_schedule();
        schedule.reminder_at = Some(now - Duration::minutes(1));
        store.insert_schedule(&schedule).await.unwrap();

        assert_eq!(store.get_schedules_due_for_notification(now).await.unwrap().len(), 1);

        let entry = NotificationRecord {
            kind: NotificationKind::PrePublishReminder,
            platform: None,
            attempt: 1,
            due_at: schedule.reminder_at,
            sent_at: now,
            recipients: vec![],
        };
        store.record_notification(&schedule.id, &entry).await.unwrap();
        assert!(store.get_schedules_due_for_notification(now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_in_window_filters_brand_and_time() {
        let (store, _temp) = create_temp_store();
        let now = Utc::now();
        let mut inside = sample_schedule();
        inside.scheduled_time = now + Duration::hours(2);
        let mut outside = sample_schedule();
        outside.scheduled_time = now + Duration::days(5);
        let mut other_brand = sample_schedule();
        other_brand.brand_id = "brand-2".to_string();
        other_brand.scheduled_time = now + Duration::hours(2);
        for s in [&inside, &outside, &other_brand] {
            store.insert_schedule(s).await.unwrap();
        }

        let found = store
            .list_in_window("brand-1", now, now + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, inside.id);

        assert_eq!(store.list_schedules(Some("brand-1")).await.unwrap().len(), 2);
        assert_eq!(store.list_schedules(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_persistence_and_index_rebuild() {
        let temp_dir = TempDir::new().unwrap();
        let schedule = sample_schedule();

        {
            let store = ScheduleStore::open_at(temp_dir.path()).unwrap();
            store.insert_schedule(&schedule).await.unwrap();
            store
                .update_schedule_status(&schedule.id, ScheduleStatus::Cancelled, None)
                .await
                .unwrap();
        }

        // Drop the index; the log alone must restore the latest version
        fs::remove_file(temp_dir.path().join("schedules.db")).unwrap();

        let store = ScheduleStore::open_at(temp_dir.path()).unwrap();
        let loaded = store.get_schedule_by_id(&schedule.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ScheduleStatus::Cancelled);
    }
}
