use connectors::{
    adapter::Adapter,
    error::AdapterError,
    sql::{
        base::{
            adapter::SqlAdapter,
            capabilities::CapabilityCache,
            error::DbError,
            probe::{CapabilityProbe, CaseSensitivityProbe},
        },
        sqlite::adapter::SqliteAdapter,
    },
};
use planner::{
    query::capabilities::{BackendKind, DialectCapabilities},
    settings::CaseProbeSettings,
};

fn probe(table: &str, column: &str) -> CaseSensitivityProbe {
    CaseSensitivityProbe::new(&CaseProbeSettings {
        table: table.to_string(),
        column: column.to_string(),
    })
}

fn sqlite_caps() -> DialectCapabilities {
    DialectCapabilities::for_backend(&BackendKind::Sqlite).unwrap()
}

async fn adapter_with_names(collation: &str, names: &[&str]) -> SqliteAdapter {
    let adapter = SqliteAdapter::in_memory().await.unwrap();
    adapter
        .exec(&format!("CREATE TABLE people (name TEXT {collation})"))
        .await
        .unwrap();
    for name in names {
        adapter
            .exec_params("INSERT INTO people (name) VALUES (?)", vec![(*name).into()])
            .await
            .unwrap();
    }
    adapter
}

#[tokio::test]
async fn test_binary_collation_is_case_sensitive() {
    let adapter = adapter_with_names("", &["Bob", "alice", "42"]).await;
    let caps = probe("people", "name")
        .detect(&adapter, sqlite_caps().with_case_insensitive(true))
        .await
        .unwrap();
    assert!(!caps.case_insensitive);
}

#[tokio::test]
async fn test_nocase_collation_is_case_insensitive() {
    let adapter = adapter_with_names("COLLATE NOCASE", &["Bob", "alice"]).await;
    let caps = probe("people", "name")
        .detect(&adapter, sqlite_caps())
        .await
        .unwrap();
    assert!(caps.case_insensitive);
}

#[tokio::test]
async fn test_probe_on_missing_table_fails() {
    let adapter = SqliteAdapter::in_memory().await.unwrap();
    let result = probe("nowhere", "name").detect(&adapter, sqlite_caps()).await;
    assert!(matches!(result, Err(DbError::Sql(_))));
}

#[tokio::test]
async fn test_cache_resolves_once() {
    let cache = CapabilityCache::default();
    let adapter = adapter_with_names("COLLATE NOCASE", &["Bob"]).await;

    let first = cache
        .resolve("sqlite://people", &adapter, Some(&probe("people", "name")))
        .await
        .unwrap();
    assert!(first.case_insensitive);

    // A second resolution is answered from the memo; this probe would fail.
    let second = cache
        .resolve("sqlite://people", &adapter, Some(&probe("nowhere", "name")))
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(cache.get("sqlite://people"), Some(first));
    assert_eq!(cache.get("sqlite://other"), None);
}

#[tokio::test]
async fn test_concurrent_resolution_agrees() {
    let cache = CapabilityCache::default();
    let adapter = adapter_with_names("", &["Bob"]).await;
    let probe = probe("people", "name");

    let (a, b) = tokio::join!(
        cache.resolve("sqlite://shared", &adapter, Some(&probe)),
        cache.resolve("sqlite://shared", &adapter, Some(&probe)),
    );
    assert_eq!(a.unwrap(), b.unwrap());
}

#[tokio::test]
async fn test_global_cache_without_probe() {
    let adapter = SqliteAdapter::in_memory().await.unwrap();
    let caps = CapabilityCache::global()
        .resolve("sqlite://global-test", &adapter, None)
        .await
        .unwrap();
    assert_eq!(caps, sqlite_caps());
}

#[tokio::test]
async fn test_adapter_for_backend() {
    let adapter = Adapter::sql(&BackendKind::Sqlite, "sqlite::memory:")
        .await
        .unwrap();
    assert_eq!(adapter.get_sql().kind(), BackendKind::Sqlite);

    assert!(matches!(
        Adapter::sql(&BackendKind::Postgres, "postgres://localhost").await,
        Err(AdapterError::UnsupportedBackend(name)) if name == "postgres"
    ));
}
