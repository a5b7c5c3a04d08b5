//! Session lifecycle, database targeting, and connection shutdown.

use std::sync::Arc;

use neo4j_adapter::driver::mock::MOCK_DRIVER_VERSION;
use neo4j_adapter::{Error, MockDriver, Neo4jAdapter, PropertyMap, Value};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_version_comes_from_driver() {
    let adapter = Neo4jAdapter::with_driver(MockDriver::new());
    assert_eq!(adapter.version(), MOCK_DRIVER_VERSION);
}

#[tokio::test]
async fn test_session_is_created_lazily_and_reused() {
    let driver = MockDriver::new();
    let adapter = Neo4jAdapter::with_driver(driver.clone());
    assert_eq!(driver.sessions_opened(), 0);

    let a = adapter.session().await.unwrap();
    let b = adapter.session().await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    for _ in 0..3 {
        adapter.run_query("RETURN 1", PropertyMap::new()).await.unwrap();
    }
    assert_eq!(driver.sessions_opened(), 1);
}

#[tokio::test]
async fn test_new_session_replaces_current() {
    let driver = MockDriver::new();
    let adapter = Neo4jAdapter::with_driver(driver.clone());

    let first = adapter.session().await.unwrap();
    let second = adapter.new_session().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));

    let current = adapter.session().await.unwrap();
    assert!(Arc::ptr_eq(&second, &current));
    assert_eq!(driver.sessions_opened(), 2);
}

#[tokio::test]
async fn test_on_database_targets_sessions() {
    let driver = MockDriver::new();
    let adapter = Neo4jAdapter::with_driver(driver.clone()).on_database("brain");

    adapter.run_query("RETURN 1", PropertyMap::new()).await.unwrap();

    assert_eq!(driver.queries()[0].database.as_deref(), Some("brain"));
}

#[tokio::test]
async fn test_query_on_database_uses_fresh_uncached_session() {
    let driver = MockDriver::new()
        .with_rows(["x"], vec![])
        .with_rows(["name"], vec![vec![Value::from("archive")]]);
    let adapter = Neo4jAdapter::with_driver(driver.clone());

    let current = adapter.session().await.unwrap();
    adapter.run_query("RETURN 1 AS x", PropertyMap::new()).await.unwrap();

    let records = adapter
        .query_on_database(Some("system"), "SHOW DATABASES YIELD name", PropertyMap::new())
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value("name"), &Value::from("archive"));

    let queries = driver.queries();
    assert_eq!(queries[0].database, None);
    assert_eq!(queries[1].database.as_deref(), Some("system"));
    assert_eq!(driver.sessions_opened(), 2);
    assert!(Arc::ptr_eq(&current, &adapter.session().await.unwrap()));
}

#[tokio::test]
async fn test_query_on_database_reports_failure() {
    let driver = MockDriver::new().with_error("Database does not exist");
    let adapter = Neo4jAdapter::with_driver(driver);

    let err = adapter
        .query_on_database(Some("nope"), "MATCH (n) RETURN n", PropertyMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Query(_)));
}

#[tokio::test]
async fn test_close_shuts_down_driver_and_rejects_sessions() {
    let driver = MockDriver::new();
    let adapter = Neo4jAdapter::with_driver(driver.clone());
    adapter.session().await.unwrap();

    adapter.close().await.unwrap();
    adapter.close().await.unwrap();

    assert!(driver.is_closed());
    assert!(adapter.is_closed());
    assert!(matches!(adapter.session().await, Err(Error::Session(_))));
    assert!(matches!(adapter.new_session().await, Err(Error::Session(_))));
    assert!(adapter.run_query("RETURN 1", PropertyMap::new()).await.is_err());
    assert!(
        adapter
            .query_on_database(None, "RETURN 1", PropertyMap::new())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_unreachable_server_is_connection_error() {
    let adapter = Neo4jAdapter::with_driver(MockDriver::new().refusing_sessions());

    let err = adapter.next_available_id("BA", None).await.unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
    assert!(err.to_string().contains("check that Neo4j is running"));
}
