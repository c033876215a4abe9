//! SQLite job store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{params, Row};
use tokio::sync::Mutex;
use tokio_rusqlite::Connection;
use tracing::{debug, info, warn};

use cronkeep_core::CronManager;
use cronkeep_protocols::{Job, JobConfig, JobType};

use crate::error::PersistenceError;
use crate::schema::init_schema;

/// Durable job table in a single SQLite file.
///
/// A connection is opened per operation so a file replaced by a restore is
/// always the one read next. Clones share one write lock: a save holds it
/// from snapshot to commit, so it cannot resurrect a row deleted meanwhile.
#[derive(Debug, Clone)]
pub struct SqliteJobStore {
    path: PathBuf,
    writes: Arc<Mutex<()>>,
}

/// Outcome of [`SqliteJobStore::load_all`].
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    /// One `Decode` error per skipped row, in row order.
    pub errors: Vec<PersistenceError>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turn skipped rows into a [`PersistenceError::PartialLoad`].
    pub fn into_result(self) -> Result<usize, PersistenceError> {
        match self.errors.first() {
            None => Ok(self.loaded),
            Some(first) => Err(PersistenceError::PartialLoad {
                loaded: self.loaded,
                failed: self.errors.len(),
                first: first.to_string(),
            }),
        }
    }
}

/// A `jobs` row as stored.
struct JobRow {
    id: String,
    name: String,
    job_type: String,
    schedule: String,
    schedule_desc: String,
    enabled: bool,
    config: String,
    last_run: Option<i64>,
    next_run: Option<i64>,
}

impl JobRow {
    fn from_job(job: &Job) -> Result<Self, PersistenceError> {
        let config =
            serde_json::to_string(&job.config).map_err(|e| PersistenceError::decode(&job.id, e))?;
        Ok(Self {
            id: job.id.clone(),
            name: job.name.clone(),
            job_type: job.job_type.as_str().to_string(),
            schedule: job.schedule.clone(),
            schedule_desc: job.schedule_desc.clone(),
            enabled: job.enabled,
            config,
            last_run: job.last_run.map(|t| t.timestamp()),
            next_run: job.next_run.map(|t| t.timestamp()),
        })
    }

    /// Read one row. Column types are not enforced by SQLite, so a
    /// mistyped value fails this row only.
    fn read(row: &Row<'_>) -> Result<Self, PersistenceError> {
        let id = match row.get_ref(0) {
            Ok(ValueRef::Text(text)) => String::from_utf8_lossy(text).into_owned(),
            Ok(ValueRef::Integer(i)) => i.to_string(),
            Ok(other) => return Err(PersistenceError::decode("?", format!("bad id: {:?}", other))),
            Err(e) => return Err(PersistenceError::decode("?", e)),
        };
        let column =
            |idx: usize, e: rusqlite::Error| PersistenceError::decode(&id, format!("column {}: {}", idx, e));

        Ok(Self {
            name: row.get(1).map_err(|e| column(1, e))?,
            job_type: row.get(2).map_err(|e| column(2, e))?,
            schedule: row.get(3).map_err(|e| column(3, e))?,
            schedule_desc: row
                .get::<_, Option<String>>(4)
                .map_err(|e| column(4, e))?
                .unwrap_or_default(),
            enabled: row.get(5).map_err(|e| column(5, e))?,
            config: row.get(6).map_err(|e| column(6, e))?,
            last_run: row.get(7).map_err(|e| column(7, e))?,
            next_run: row.get(8).map_err(|e| column(8, e))?,
            id,
        })
    }

    fn into_job(self) -> Result<Job, PersistenceError> {
        let job_type: JobType = self
            .job_type
            .parse()
            .map_err(|e| PersistenceError::decode(&self.id, e))?;
        let config: JobConfig =
            serde_json::from_str(&self.config).map_err(|e| PersistenceError::decode(&self.id, e))?;
        let last_run = decode_timestamp(&self.id, self.last_run)?;
        let next_run = decode_timestamp(&self.id, self.next_run)?;

        let mut job = Job::new(self.id, self.name, job_type, self.schedule);
        job.schedule_desc = self.schedule_desc;
        job.enabled = self.enabled;
        job.config = config;
        job.last_run = last_run;
        job.next_run = next_run;
        Ok(job)
    }
}

fn decode_timestamp(id: &str, secs: Option<i64>) -> Result<Option<DateTime<Utc>>, PersistenceError> {
    match secs {
        None => Ok(None),
        Some(secs) => DateTime::from_timestamp(secs, 0)
            .map(Some)
            .ok_or_else(|| PersistenceError::decode(id, format!("timestamp out of range: {}", secs))),
    }
}

impl SqliteJobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the database file is present.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    async fn open(&self) -> Result<Connection, PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let conn = Connection::open(self.path.clone()).await?;
        conn.call(|conn| Ok(init_schema(conn)?)).await?;
        Ok(conn)
    }

    /// Upsert every job in the registry in one transaction. Returns the
    /// number of rows written.
    pub async fn save_all(&self, manager: &CronManager) -> Result<usize, PersistenceError> {
        let _writes = self.writes.lock().await;
        let rows = manager
            .snapshot()
            .await
            .iter()
            .map(JobRow::from_job)
            .collect::<Result<Vec<_>, _>>()?;

        let conn = self.open().await?;
        let count = conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO jobs (id, name, type, schedule, schedule_desc, enabled, config, last_run, next_run)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                         ON CONFLICT(id) DO UPDATE SET
                             name = excluded.name,
                             type = excluded.type,
                             schedule = excluded.schedule,
                             schedule_desc = excluded.schedule_desc,
                             enabled = excluded.enabled,
                             config = excluded.config,
                             last_run = excluded.last_run,
                             next_run = excluded.next_run",
                    )?;
                    for row in &rows {
                        stmt.execute(params![
                            row.id,
                            row.name,
                            row.job_type,
                            row.schedule,
                            row.schedule_desc,
                            row.enabled,
                            row.config,
                            row.last_run,
                            row.next_run,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(rows.len())
            })
            .await?;

        debug!(path = %self.path.display(), "Saved {} jobs", count);
        Ok(count)
    }

    /// Re-admit every stored job into `manager`.
    ///
    /// Rows that fail to decode or to pass validation are logged and skipped.
    pub async fn load_all(&self, manager: &CronManager) -> Result<LoadReport, PersistenceError> {
        let conn = self.open().await?;
        let rows = conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, type, schedule, schedule_desc, enabled, config, last_run, next_run
                     FROM jobs ORDER BY id",
                )?;
                let rows = stmt
                    .query_map([], |row| Ok(JobRow::read(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        let mut report = LoadReport::default();
        for row in rows {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!("Skipping unreadable stored job: {}", e);
                    report.errors.push(e);
                    continue;
                }
            };
            let id = row.id.clone();
            let result = match row.into_job() {
                Ok(job) => manager
                    .add_job(job)
                    .await
                    .map_err(|e| PersistenceError::decode(&id, e)),
                Err(e) => Err(e),
            };
            match result {
                Ok(_) => report.loaded += 1,
                Err(e) => {
                    warn!(job = %id, "Skipping stored job: {}", e);
                    report.errors.push(e);
                }
            }
        }

        info!(
            path = %self.path.display(),
            "Loaded {} jobs ({} skipped)",
            report.loaded,
            report.errors.len()
        );
        Ok(report)
    }

    /// Delete one row. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool, PersistenceError> {
        let id = id.to_string();
        let _writes = self.writes.lock().await;
        let conn = self.open().await?;
        let deleted = conn
            .call(move |conn| Ok(conn.execute("DELETE FROM jobs WHERE id = ?1", [&id])?))
            .await?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
