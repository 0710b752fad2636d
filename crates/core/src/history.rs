//! Append-only history of analyzed captures.
//!
//! Records are handed to a [`HistoryStore`]; the bundled implementation keeps
//! them in a SQLite database in the data directory. Region and result are
//! stored as JSON strings so the table layout does not change when the result
//! schema grows.

use crate::analysis::AnalysisResult;
use crate::error::{AppError, Result};
use crate::geometry::CaptureRect;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, TransactionBehavior, params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

const CURRENT_SCHEMA_VERSION: i32 = 1;

/// How long a writer waits for another handle's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS queries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    image_path TEXT NOT NULL,
    region TEXT NOT NULL,
    result TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_queries_timestamp ON queries (timestamp);
";

/// A record as written by the orchestrator, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHistoryRecord {
    pub image_path: String,
    /// JSON-encoded [`CaptureRect`].
    pub region: String,
    /// JSON-encoded [`AnalysisResult`].
    pub result: String,
    /// ISO-8601 UTC timestamp.
    pub timestamp: String,
}

impl NewHistoryRecord {
    pub fn new(
        image_path: Option<&Path>,
        region: CaptureRect,
        result: &AnalysisResult,
        at: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            image_path: image_path
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            region: serde_json::to_string(&region)?,
            result: serde_json::to_string(result)?,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: u64,
    pub image_path: String,
    pub region: String,
    pub result: String,
    pub timestamp: String,
}

impl HistoryRecord {
    fn from_new(id: u64, record: NewHistoryRecord) -> Self {
        Self {
            id,
            image_path: record.image_path,
            region: record.region,
            result: record.result,
            timestamp: record.timestamp,
        }
    }

    pub fn region(&self) -> Result<CaptureRect> {
        Ok(serde_json::from_str(&self.region)?)
    }

    pub fn result(&self) -> Result<AnalysisResult> {
        Ok(serde_json::from_str(&self.result)?)
    }
}

pub trait HistoryStore: Send + Sync {
    /// Appends a record and returns it with its assigned id.
    fn append(&self, record: NewHistoryRecord) -> Result<HistoryRecord>;

    /// The most recent `limit` records, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>>;
}

/// SQLite-backed store. Ids come from `AUTOINCREMENT`, so any number of
/// handles and processes can append to the same file.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteHistoryStore {
    /// Opens (creating if needed) the database at `path` and brings its
    /// schema up to date.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(&path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        if let Err(e) = conn.pragma_update(None, "journal_mode", "WAL") {
            log::warn!("Failed to enable WAL mode for {}: {}", path.display(), e);
        }
        run_migrations(&mut conn)?;

        log::debug!("History database ready at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::HistoryWrite("history connection poisoned".to_string()))
    }
}

fn run_migrations(conn: &mut Connection) -> Result<()> {
    // Immediate so two handles opening a fresh file do not race on the check
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let version: i32 = tx.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > CURRENT_SCHEMA_VERSION {
        return Err(AppError::config(format!(
            "history database version ({version}) is newer than supported schema ({CURRENT_SCHEMA_VERSION})"
        )));
    }
    if version < 1 {
        tx.execute_batch(SCHEMA_V1)?;
    }

    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
    tx.commit()?;
    Ok(())
}

fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| AppError::HistoryWrite(format!("row id {value} is negative")))
}

impl HistoryStore for SqliteHistoryStore {
    fn append(&self, record: NewHistoryRecord) -> Result<HistoryRecord> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO queries (image_path, region, result, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.image_path,
                record.region,
                record.result,
                record.timestamp,
            ],
        )
        .map_err(|e| AppError::HistoryWrite(e.to_string()))?;

        let id = to_u64(conn.last_insert_rowid())?;
        log::debug!("Appended history record {} to {}", id, self.path.display());
        Ok(HistoryRecord::from_new(id, record))
    }

    fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, image_path, region, result, timestamp
             FROM queries
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1",
        )?;

        let mut rows = stmt.query(params![limit])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(HistoryRecord {
                id: to_u64(row.get::<_, i64>(0)?)?,
                image_path: row.get(1)?,
                region: row.get(2)?,
                result: row.get(3)?,
                timestamp: row.get(4)?,
            });
        }
        Ok(records)
    }
}
