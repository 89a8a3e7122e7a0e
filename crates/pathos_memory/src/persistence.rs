//! Session persistence.
//!
//! A key-value collaborator: one JSON snapshot per conversation id.
//! Failures are typed so the turn orchestrator can log them, keep the
//! session in memory and retry at the next checkpoint.

use crate::session::Session;
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use pathos_core::config::{SessionBackend, SessionConfig};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to (de)serialize session {id}: {source}")]
    Serialization {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage backend error: {0}")]
    Backend(#[from] sqlx::Error),

    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_session(&self, id: &str, snapshot: &Session) -> Result<(), PersistenceError>;
    async fn load_session(&self, id: &str) -> Result<Option<Session>, PersistenceError>;

    /// Move an unreadable snapshot out of the way so a fresh session can take
    /// its id. Returns the key the old snapshot now lives under, if any.
    async fn quarantine_session(&self, id: &str) -> Result<Option<String>, PersistenceError> {
        let _ = id;
        Ok(None)
    }
}

fn quarantine_key(id: &str) -> String {
    format!("{}.corrupt-{}", id, Utc::now().timestamp_millis())
}

fn encode(id: &str, session: &Session) -> Result<String, PersistenceError> {
    session
        .to_json()
        .map_err(|source| PersistenceError::Serialization {
            id: id.to_string(),
            source,
        })
}

fn decode(id: &str, json: &str) -> Result<Session, PersistenceError> {
    Session::from_json(json).map_err(|source| PersistenceError::Serialization {
        id: id.to_string(),
        source,
    })
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local store. Snapshots are kept serialized so loads return
/// independent copies, exactly like a durable backend would.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    snapshots: RwLock<HashMap<String, String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save_session(&self, id: &str, snapshot: &Session) -> Result<(), PersistenceError> {
        let json = encode(id, snapshot)?;
        self.snapshots.write().await.insert(id.to_string(), json);
        Ok(())
    }

    async fn load_session(&self, id: &str) -> Result<Option<Session>, PersistenceError> {
        match self.snapshots.read().await.get(id) {
            Some(json) => decode(id, json).map(Some),
            None => Ok(None),
        }
    }

    async fn quarantine_session(&self, id: &str) -> Result<Option<String>, PersistenceError> {
        let mut snapshots = self.snapshots.write().await;
        match snapshots.remove(id) {
            Some(json) => {
                let key = quarantine_key(id);
                snapshots.insert(key.clone(), json);
                Ok(Some(key))
            }
            None => Ok(None),
        }
    }
}

// ============================================================================
// SQLite
// ============================================================================

#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: Pool<Sqlite>,
}

impl SqliteSessionStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> anyhow::Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&db_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                turn INTEGER NOT NULL,
                state_json TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create sessions table")?;
        Ok(())
    }

    /// Ids of every stored session, most recently updated first.
    pub async fn list_sessions(&self) -> Result<Vec<String>, PersistenceError> {
        let rows = sqlx::query("SELECT id FROM sessions ORDER BY updated_at DESC, id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| r.get::<String, _>("id")).collect())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn save_session(&self, id: &str, snapshot: &Session) -> Result<(), PersistenceError> {
        let json = encode(id, snapshot)?;
        let now = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO sessions (id, turn, state_json, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET turn = excluded.turn,
                 state_json = excluded.state_json, updated_at = excluded.updated_at",
        )
        .bind(id)
        .bind(snapshot.turn as i64)
        .bind(&json)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::debug!(session = id, turn = snapshot.turn, "Session saved");
        Ok(())
    }

    async fn load_session(&self, id: &str) -> Result<Option<Session>, PersistenceError> {
        let row = sqlx::query("SELECT state_json FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let json: String = row.get("state_json");
                decode(id, &json).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn quarantine_session(&self, id: &str) -> Result<Option<String>, PersistenceError> {
        let key = quarantine_key(id);
        let moved = sqlx::query("UPDATE sessions SET id = ? WHERE id = ?")
            .bind(&key)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok((moved > 0).then_some(key))
    }
}

/// Open the backend named by the session config.
pub async fn open_store(config: &SessionConfig) -> anyhow::Result<Arc<dyn SessionStore>> {
    match config.backend {
        SessionBackend::Memory => {
            tracing::info!("Using in-memory session store (not durable)");
            Ok(Arc::new(InMemorySessionStore::new()))
        }
        SessionBackend::Sqlite => {
            tracing::info!(path = %config.db_path, "Opening SQLite session store");
            let store = SqliteSessionStore::new(&config.db_path)
                .await
                .with_context(|| format!("Failed to open session store at {}", config.db_path))?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathos_core::config::PathosConfig;

    #[tokio::test]
    async fn test_in_memory_roundtrip() {
        let store = InMemorySessionStore::new();
        assert!(store.load_session("missing").await.unwrap().is_none());

        let mut s = Session::new("c1", &PathosConfig::default());
        s.turn = 3;
        store.save_session("c1", &s).await.unwrap();
        let loaded = store.load_session("c1").await.unwrap().unwrap();
        assert_eq!(loaded, s);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_in_memory_overwrite() {
        let store = InMemorySessionStore::new();
        let mut s = Session::new("c1", &PathosConfig::default());
        store.save_session("c1", &s).await.unwrap();
        s.turn = 9;
        store.save_session("c1", &s).await.unwrap();
        assert_eq!(store.load_session("c1").await.unwrap().unwrap().turn, 9);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_serialization_error() {
        let store = InMemorySessionStore::new();
        store
            .snapshots
            .write()
            .await
            .insert("bad".into(), "{not json".into());
        let err = store.load_session("bad").await.unwrap_err();
        assert!(matches!(err, PersistenceError::Serialization { .. }));
    }

    #[tokio::test]
    async fn test_quarantine_moves_snapshot_aside() {
        let store = InMemorySessionStore::new();
        store
            .snapshots
            .write()
            .await
            .insert("bad".into(), "{not json".into());

        let key = store.quarantine_session("bad").await.unwrap().unwrap();
        assert!(key.starts_with("bad.corrupt-"));
        assert!(store.load_session("bad").await.unwrap().is_none());
        assert_eq!(store.snapshots.read().await.get(&key).map(String::as_str), Some("{not json"));
        assert!(store.quarantine_session("bad").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_memory_store() {
        let store = open_store(&SessionConfig {
            backend: SessionBackend::Memory,
            ..SessionConfig::default()
        })
        .await
        .unwrap();
        assert!(store.load_session("x").await.unwrap().is_none());
    }
}
