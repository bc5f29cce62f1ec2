//! SQLite-backed audit store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tracing::debug;

use super::{AuditError, AuditRecord, AuditSink, HistoricalScore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS validation_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        input TEXT NOT NULL,
        provider TEXT NOT NULL,
        model TEXT NOT NULL,
        output TEXT NOT NULL,
        validation_score REAL NOT NULL,
        validation_method TEXT NOT NULL,
        confidence TEXT NOT NULL,
        prompt_hash TEXT NOT NULL,
        recorded_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_validation_results_lookup
        ON validation_results(prompt_hash, model);";

/// Audit sink writing to a local SQLite file.
///
/// rusqlite is blocking, so every statement runs on the blocking pool.
#[derive(Clone)]
pub struct SqliteAuditStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAuditStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        Self::init(Connection::open(path)?)
    }

    /// Store that lives only as long as the process.
    pub fn in_memory() -> Result<Self, AuditError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, AuditError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, AuditError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, AuditError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || -> Result<T, AuditError> {
            let guard = conn
                .lock()
                .map_err(|_| AuditError::Unavailable("connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| AuditError::Unavailable(e.to_string()))?
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<usize, AuditError> {
        self.with_conn(|conn| {
            let n: i64 =
                conn.query_row("SELECT COUNT(*) FROM validation_results", [], |row| row.get(0))?;
            Ok(n.max(0) as usize)
        })
        .await
    }
}

#[async_trait]
impl AuditSink for SqliteAuditStore {
    async fn append(&self, record: AuditRecord) -> Result<(), AuditError> {
        debug!(
            "Recording validation for {} ({:.1}, {})",
            record.model, record.score, record.method
        );
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO validation_results
                 (input, provider, model, output, validation_score, validation_method,
                  confidence, prompt_hash, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.input,
                    record.provider,
                    record.model,
                    record.output,
                    record.score,
                    record.method,
                    record.confidence,
                    record.prompt_hash,
                    record.recorded_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn historical_score(
        &self,
        prompt_hash: &str,
        model: &str,
    ) -> Result<Option<HistoricalScore>, AuditError> {
        let prompt_hash = prompt_hash.to_string();
        let model = model.to_string();
        self.with_conn(move |conn| {
            let (avg_score, count) = conn.query_row(
                "SELECT AVG(validation_score), COUNT(*) FROM validation_results
                 WHERE prompt_hash = ?1 AND model = ?2",
                params![prompt_hash, model],
                |row| Ok((row.get::<_, Option<f64>>(0)?, row.get::<_, i64>(1)?)),
            )?;
            Ok(avg_score.map(|avg_score| HistoricalScore {
                avg_score,
                count: count.max(0) as usize,
            }))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(model: &str, score: f64) -> AuditRecord {
        AuditRecord {
            input: "User: What is 2+2?".to_string(),
            provider: "openai".to_string(),
            model: model.to_string(),
            output: "4".to_string(),
            score,
            method: "heuristics".to_string(),
            confidence: "HIGH".to_string(),
            prompt_hash: "abc123".to_string(),
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_append_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.db");

        let store = SqliteAuditStore::open(&path).unwrap();
        store.append(record("gpt-4o", 90.0)).await.unwrap();
        store.append(record("gpt-4o", 70.0)).await.unwrap();
        drop(store);

        let reopened = SqliteAuditStore::open(&path).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_historical_score_per_model() {
        let store = SqliteAuditStore::in_memory().unwrap();
        store.append(record("gpt-4o", 90.0)).await.unwrap();
        store.append(record("gpt-4o", 70.0)).await.unwrap();
        store.append(record("gpt-4o-mini", 10.0)).await.unwrap();

        let history = store.historical_score("abc123", "gpt-4o").await.unwrap().unwrap();
        assert_eq!(history.count, 2);
        assert!((history.avg_score - 80.0).abs() < 1e-9);

        assert!(store
            .historical_score("abc123", "claude-3-haiku")
            .await
            .unwrap()
            .is_none());
    }
}
