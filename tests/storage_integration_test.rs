//! Integration tests for the visit log storage backends
//!
//! Tests can be filtered by database backend using the DATABASE_BACKEND environment variable:
//! - `DATABASE_BACKEND=sqlite cargo test` - Run only SQLite tests
//! - `DATABASE_BACKEND=postgres cargo test` - Run only PostgreSQL tests
//! - By default, both backends are tested (PostgreSQL only when DATABASE_URL is set)

use campaign_detector::models::{StoredCampaign, VisitorInfo};
use campaign_detector::storage::{
    PostgresStorage, SortDirection, SqliteStorage, Storage, StorageError,
};
use std::sync::Arc;

/// Get the database backend to test from environment variable
fn should_test_backend(backend: &str) -> bool {
    match std::env::var("DATABASE_BACKEND") {
        Ok(val) => val.to_lowercase() == backend.to_lowercase(),
        Err(_) => true,
    }
}

async fn create_sqlite_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

async fn create_postgres_storage(prefix: &str) -> Option<Arc<dyn Storage>> {
    let db_url = std::env::var("DATABASE_URL").ok()?;
    if !db_url.starts_with("postgres") {
        return None;
    }
    let storage = PostgresStorage::with_prefix(&db_url, 5, prefix).await.ok()?;
    storage.init().await.ok()?;
    Some(Arc::new(storage))
}

fn visit(idvisitor: &[u8], source: Option<&str>, medium: Option<&str>) -> VisitorInfo {
    VisitorInfo::new(idvisitor.to_vec()).with_campaign(StoredCampaign {
        campaign_source: source.map(str::to_string),
        campaign_medium: medium.map(str::to_string),
        ..Default::default()
    })
}

/// Seeds one visitor's history: an unattributed visit, two campaigns, another unattributed visit
async fn seed_history(storage: &Arc<dyn Storage>, idvisitor: &[u8]) {
    storage.insert_visit(&visit(idvisitor, None, None)).await.unwrap();
    storage
        .insert_visit(&visit(idvisitor, Some("newsletter"), Some("email")))
        .await
        .unwrap();
    storage
        .insert_visit(&visit(idvisitor, Some("google"), Some("cpc")))
        .await
        .unwrap();
    storage.insert_visit(&visit(idvisitor, None, None)).await.unwrap();
}

async fn check_first_and_latest(storage: Arc<dyn Storage>, idvisitor: &[u8]) {
    seed_history(&storage, idvisitor).await;
    // Another visitor's campaign must never leak in
    storage
        .insert_visit(&visit(b"otherone", Some("bing"), Some("cpc")))
        .await
        .unwrap();

    let first = storage
        .fetch_visitor_campaign(idvisitor, SortDirection::Ascending)
        .await
        .unwrap()
        .expect("visitor has attributed visits");
    assert_eq!(first.campaign_source.as_deref(), Some("newsletter"));
    assert_eq!(first.campaign_medium.as_deref(), Some("email"));
    assert_eq!(first.campaign_name, None);

    let latest = storage
        .fetch_visitor_campaign(idvisitor, SortDirection::Descending)
        .await
        .unwrap()
        .expect("visitor has attributed visits");
    assert_eq!(latest.campaign_source.as_deref(), Some("google"));
    assert_eq!(latest.campaign_medium.as_deref(), Some("cpc"));
}

#[tokio::test]
async fn test_first_and_latest_campaign_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;
    check_first_and_latest(storage, b"visitor1").await;
}

#[tokio::test]
async fn test_first_and_latest_campaign_postgres() {
    if !should_test_backend("postgres") {
        return;
    }

    let Some(storage) = create_postgres_storage("itest_first_latest_").await else {
        println!("SKIPPED: DATABASE_URL not set to a PostgreSQL database");
        return;
    };
    let idvisitor = format!("{:08}", std::process::id()).into_bytes();
    check_first_and_latest(storage, &idvisitor).await;
}

#[tokio::test]
async fn test_visitor_without_campaign_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;
    storage
        .insert_visit(&visit(b"nocampgn", None, None))
        .await
        .unwrap();

    let none = storage
        .fetch_visitor_campaign(b"nocampgn", SortDirection::Descending)
        .await
        .unwrap();
    assert!(none.is_none());

    let unknown = storage
        .fetch_visitor_campaign(b"unknown!", SortDirection::Ascending)
        .await
        .unwrap();
    assert!(unknown.is_none());
}

#[tokio::test]
async fn test_insert_visit_returns_increasing_ids_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;
    let first = storage
        .insert_visit(&visit(b"visitorA", Some("a"), None))
        .await
        .unwrap();
    let second = storage
        .insert_visit(&visit(b"visitorA", Some("b"), None))
        .await
        .unwrap();
    assert!(second > first);
}

#[tokio::test]
async fn test_table_prefix_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = SqliteStorage::with_prefix("sqlite::memory:", 5, "matomo_")
        .await
        .unwrap();
    storage.init().await.unwrap();
    storage
        .insert_visit(&visit(b"prefixed", Some("partner"), None))
        .await
        .unwrap();

    let found = storage
        .fetch_visitor_campaign(b"prefixed", SortDirection::Ascending)
        .await
        .unwrap();
    assert_eq!(found.unwrap().campaign_source.as_deref(), Some("partner"));
}

#[tokio::test]
async fn test_invalid_table_prefix_rejected_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let result = SqliteStorage::with_prefix("sqlite::memory:", 5, "x; DROP TABLE y").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_query_error_propagates_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    // No init(): the visit log table does not exist
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    let result = storage
        .fetch_visitor_campaign(b"visitor1", SortDirection::Ascending)
        .await;
    assert!(matches!(result, Err(StorageError::Query(_))));
}
