//! Integration tests for session planning + SQLite persistence
//!
//! Uses tempfile::TempDir for isolated SQLite databases.

use pathos_core::config::PathosConfig;
use pathos_memory::{Session, SessionStore, SqliteSessionStore, TurnPlanner};
use std::sync::Arc;

async fn setup_store(dir: &tempfile::TempDir) -> SqliteSessionStore {
    let db_path = dir.path().join("sessions.db");
    SqliteSessionStore::new(db_path).await.unwrap()
}

/// Test 1: A planned conversation survives a restart byte-for-byte.
#[tokio::test]
async fn test_sqlite_roundtrip_after_turns() {
    let dir = tempfile::TempDir::new().unwrap();
    let planner = TurnPlanner::new(Arc::new(PathosConfig::default()));

    let mut session = Session::new("conv-a", planner.config());
    for msg in [
        "I just got promoted!",
        "My sister Ana is visiting next week",
        "she is bringing her dog",
    ] {
        session = planner.plan(&session, msg).next;
    }

    {
        let store = setup_store(&dir).await;
        store.save_session("conv-a", &session).await.unwrap();
    }

    // Re-open (simulated restart)
    let store = setup_store(&dir).await;
    let restored = store.load_session("conv-a").await.unwrap().unwrap();
    assert_eq!(restored, session);
    assert_eq!(restored.turn, 3);
    assert_eq!(restored.reflections.len(), 3);
}

/// Test 2: Unknown ids load as None, not an error.
#[tokio::test]
async fn test_sqlite_missing_session() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = setup_store(&dir).await;
    assert!(store.load_session("nope").await.unwrap().is_none());
    assert!(store.list_sessions().await.unwrap().is_empty());
}

/// Test 3: Sessions are isolated per id and upserts replace.
#[tokio::test]
async fn test_sqlite_sessions_isolated() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = setup_store(&dir).await;
    let planner = TurnPlanner::new(Arc::new(PathosConfig::default()));

    let a = planner.plan(&Session::new("a", planner.config()), "I'm so happy today!").next;
    let b = planner.plan(&Session::new("b", planner.config()), "I feel miserable and lonely").next;
    store.save_session("a", &a).await.unwrap();
    store.save_session("b", &b).await.unwrap();

    let a2 = planner.plan(&a, "still great").next;
    store.save_session("a", &a2).await.unwrap();

    let loaded_a = store.load_session("a").await.unwrap().unwrap();
    let loaded_b = store.load_session("b").await.unwrap().unwrap();
    assert_eq!(loaded_a.turn, 2);
    assert_eq!(loaded_b.turn, 1);
    assert!(loaded_a.mood.pleasure > loaded_b.mood.pleasure);

    let mut ids = store.list_sessions().await.unwrap();
    ids.sort();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
}

/// Test 4: Quarantine renames the row so the id is free again.
#[tokio::test]
async fn test_sqlite_quarantine_keeps_old_row() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = setup_store(&dir).await;
    let planner = TurnPlanner::new(Arc::new(PathosConfig::default()));

    let a = planner.plan(&Session::new("a", planner.config()), "hello there").next;
    store.save_session("a", &a).await.unwrap();

    let key = store.quarantine_session("a").await.unwrap().unwrap();
    assert!(store.load_session("a").await.unwrap().is_none());
    assert_eq!(store.list_sessions().await.unwrap(), vec![key.clone()]);
    assert_eq!(store.load_session(&key).await.unwrap().unwrap().turn, 1);

    assert!(store.quarantine_session("a").await.unwrap().is_none());
}
