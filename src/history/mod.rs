//! Append-only classification history backed by SQLite.
//!
//! Reads order by `timestamp DESC, id DESC` so pages stay deterministic when
//! several submissions share a timestamp. The fallible `try_*` methods report
//! [`StorageError`]; `query` and `count` log the error and degrade to an empty
//! page or zero, since history is auxiliary to classification.

mod pool;

use pool::HandleCache;

use std::{path::Path, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous},
};
use tracing::warn;

use crate::sentiment::{ClassificationRecord, Sentiment};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ?1 is the folded search needle, ?2 the sentiment; NULL disables either filter.
const FILTER_CLAUSE: &str = "(?1 IS NULL OR instr(search_text, ?1) > 0)
     AND (?2 IS NULL OR sentiment = ?2)";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("failed to prepare storage directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("history handle cache lock poisoned")]
    Poisoned,
    #[error("corrupt history row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
}

/// Persisted classification with its store-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub text: String,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: i64,
    text: String,
    sentiment: String,
    confidence: f64,
    timestamp: String,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = StorageError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let sentiment =
            Sentiment::parse(&row.sentiment).ok_or_else(|| StorageError::CorruptRow {
                id: row.id,
                reason: format!("unknown sentiment {:?}", row.sentiment),
            })?;
        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|err| StorageError::CorruptRow {
                id: row.id,
                reason: format!("invalid timestamp {:?}: {err}", row.timestamp),
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id: row.id,
            text: row.text,
            sentiment,
            confidence: row.confidence,
            timestamp,
        })
    }
}

/// Optional filters shared by `query` and `count`; both present means AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub text: Option<String>,
    pub sentiment: Option<Sentiment>,
}

impl HistoryFilter {
    pub fn new(text: Option<&str>, sentiment: Option<Sentiment>) -> Self {
        Self {
            text: text.map(str::to_string),
            sentiment,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.needle().is_none() && self.sentiment.is_none()
    }

    /// Case-folded search term; blank text does not filter.
    fn needle(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase)
    }

    fn sentiment_name(&self) -> Option<&'static str> {
        self.sentiment.map(|sentiment| sentiment.as_str())
    }
}

pub struct HistoryStore {
    handles: HandleCache,
}

impl HistoryStore {
    /// Open (creating if needed) the database file and apply migrations.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let store = Self {
            handles: HandleCache::new(options),
        };
        let mut lease = store.handles.acquire().await?;
        let migrated = MIGRATOR.run(&mut lease.conn).await;
        store.handles.restore(lease).await;
        migrated?;

        Ok(store)
    }

    /// Persist a record and return the id SQLite assigned to it.
    pub async fn append(&self, record: &ClassificationRecord) -> Result<i64, StorageError> {
        let mut lease = self.handles.acquire().await?;
        let result = sqlx::query(
            "INSERT INTO sentiments (text, search_text, sentiment, confidence, timestamp)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.text)
        .bind(record.text.to_lowercase())
        .bind(record.sentiment.as_str())
        .bind(record.confidence)
        .bind(format_timestamp(&record.timestamp))
        .execute(&mut lease.conn)
        .await;
        self.handles.restore(lease).await;

        Ok(result?.last_insert_rowid())
    }

    pub async fn try_query(
        &self,
        filter: &HistoryFilter,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<HistoryEntry>, StorageError> {
        let sql = format!(
            "SELECT id, text, sentiment, confidence, timestamp
             FROM sentiments
             WHERE {FILTER_CLAUSE}
             ORDER BY timestamp DESC, id DESC
             LIMIT ?3 OFFSET ?4"
        );

        let mut lease = self.handles.acquire().await?;
        let rows = sqlx::query_as::<_, HistoryRow>(&sql)
            .bind(filter.needle())
            .bind(filter.sentiment_name())
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&mut lease.conn)
            .await;
        self.handles.restore(lease).await;

        rows?.into_iter().map(HistoryEntry::try_from).collect()
    }

    pub async fn try_count(&self, filter: &HistoryFilter) -> Result<u64, StorageError> {
        let sql = format!("SELECT COUNT(*) FROM sentiments WHERE {FILTER_CLAUSE}");

        let mut lease = self.handles.acquire().await?;
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(filter.needle())
            .bind(filter.sentiment_name())
            .fetch_one(&mut lease.conn)
            .await;
        self.handles.restore(lease).await;

        Ok(u64::try_from(count?).unwrap_or_default())
    }

    /// Newest-first window over the filtered history; empty on storage failure.
    pub async fn query(
        &self,
        filter: &HistoryFilter,
        limit: u32,
        offset: u32,
    ) -> Vec<HistoryEntry> {
        self.try_query(filter, limit, offset)
            .await
            .unwrap_or_else(|err| {
                warn!(?err, ?filter, limit, offset, "history query failed");
                Vec::new()
            })
    }

    /// Matching record count ignoring pagination; zero on storage failure.
    pub async fn count(&self, filter: &HistoryFilter) -> u64 {
        self.try_count(filter).await.unwrap_or_else(|err| {
            warn!(?err, ?filter, "history count failed");
            0
        })
    }

    pub async fn total_count(&self) -> u64 {
        self.count(&HistoryFilter::default()).await
    }

    pub async fn release_current(&self) -> Result<bool, StorageError> {
        self.handles.release_current().await
    }

    pub async fn release_all(&self) -> Result<usize, StorageError> {
        self.handles.release_all().await
    }

    pub fn cached_handles(&self) -> usize {
        self.handles.cached_handles()
    }
}

/// Fixed-width UTC form so lexical order matches chronological order.
fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}
