use connectors::sql::{base::adapter::SqlAdapter, sqlite::adapter::SqliteAdapter};
use model::{
    core::value::Value,
    filter::node::FilterNode,
    query::request::{Ordering, QueryRequest},
    records::row::RowData,
};
use planner::{
    compiler::QueryCompiler,
    query::{
        capabilities::{BackendKind, DialectCapabilities, PagingStyle},
        dialect::Sqlite,
    },
    schema::{EntityDef, Schema},
};
use pretty_assertions::assert_eq;

fn schema() -> Schema {
    Schema::new()
        .with_entity(
            "Item",
            EntityDef::new("items")
                .property("position")
                .one_to_many("tags", "Tag", "item_id"),
        )
        .with_entity("Tag", EntityDef::new("tags").property("label"))
}

fn sqlite_caps() -> DialectCapabilities {
    DialectCapabilities::for_backend(&BackendKind::Sqlite).unwrap()
}

/// 200 items; item `n` sits at position `201 - n`.
async fn seeded() -> SqliteAdapter {
    let adapter = SqliteAdapter::in_memory().await.unwrap();
    adapter
        .exec("CREATE TABLE items (id INTEGER PRIMARY KEY, position INTEGER NOT NULL)")
        .await
        .unwrap();
    adapter
        .exec("CREATE TABLE tags (id INTEGER PRIMARY KEY, item_id INTEGER NOT NULL, label TEXT NOT NULL)")
        .await
        .unwrap();
    adapter
        .exec(
            "WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 200) \
             INSERT INTO items (id, position) SELECT n, 201 - n FROM seq",
        )
        .await
        .unwrap();
    adapter
}

fn positions(rows: &[RowData]) -> Vec<i64> {
    rows.iter()
        .map(|row| match row.get_value("position") {
            Value::Int(n) => n,
            other => panic!("unexpected position {other:?}"),
        })
        .collect()
}

async fn fetch_page(
    adapter: &SqliteAdapter,
    caps: &DialectCapabilities,
    offset: usize,
    limit: usize,
) -> (String, Vec<RowData>) {
    let schema = schema();
    let request = QueryRequest::new("Item")
        .project(vec!["position"])
        .order_by(Ordering::asc("position"))
        .page(offset, limit);
    let compiled = QueryCompiler::new(&schema, &Sqlite, caps)
        .compile(&request)
        .unwrap();
    let rows = adapter.fetch(&compiled).await.unwrap();
    (compiled.text, rows)
}

#[tokio::test]
async fn test_row_number_page_returns_requested_rows() {
    let adapter = seeded().await;
    let caps = sqlite_caps().with_paging(PagingStyle::RowNumberCte);

    let (sql, rows) = fetch_page(&adapter, &caps, 50, 100).await;
    assert!(sql.starts_with("WITH query AS ("));
    assert_eq!(positions(&rows), (51..=150).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_row_number_page_past_the_end_is_short() {
    let adapter = seeded().await;
    let caps = sqlite_caps().with_paging(PagingStyle::RowNumberCte);

    let (_, rows) = fetch_page(&adapter, &caps, 190, 100).await;
    assert_eq!(positions(&rows), (191..=200).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_first_page_skips_row_numbers() {
    let schema = schema();
    let request = QueryRequest::new("Item")
        .project(vec!["position"])
        .order_by(Ordering::asc("position"))
        .page(0, 100);

    let caps = sqlite_caps().with_paging(PagingStyle::RowNumberCte);
    let compiled = QueryCompiler::new(&schema, &Sqlite, &caps)
        .compile(&request)
        .unwrap();
    assert!(!compiled.text.contains("ROW_NUMBER"));
    assert!(compiled.text.ends_with(" FETCH FIRST 100 ROWS ONLY"));

    let adapter = seeded().await;
    let (sql, rows) = fetch_page(&adapter, &sqlite_caps(), 0, 100).await;
    assert!(sql.ends_with(" LIMIT 100"));
    assert_eq!(positions(&rows), (1..=100).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_native_page_matches_row_number_page() {
    let adapter = seeded().await;

    let (_, native) = fetch_page(&adapter, &sqlite_caps(), 50, 100).await;
    let (_, emulated) = fetch_page(
        &adapter,
        &sqlite_caps().with_paging(PagingStyle::RowNumberCte),
        50,
        100,
    )
    .await;
    assert_eq!(native, emulated);
}

#[tokio::test]
async fn test_filter_parameters_are_bound() {
    let adapter = seeded().await;
    let schema = schema();
    let request = QueryRequest::new("Item").filter(FilterNode::and(vec![
        FilterNode::gt("position", 10),
        FilterNode::in_list("id", vec![190, 191, 5]),
    ]));

    let compiled = QueryCompiler::new(&schema, &Sqlite, &sqlite_caps())
        .compile(&request)
        .unwrap();
    let rows = adapter.fetch(&compiled).await.unwrap();
    let mut ids: Vec<Value> = rows.iter().map(|row| row.get_value("id")).collect();
    ids.sort_by_key(|v| v.as_i64());
    assert_eq!(ids, vec![Value::Int(5), Value::Int(190)]);
}

#[tokio::test]
async fn test_client_side_distinct() {
    let adapter = seeded().await;
    adapter
        .exec("INSERT INTO tags (id, item_id, label) VALUES (1, 7, 'x'), (2, 7, 'x'), (3, 8, 'y')")
        .await
        .unwrap();

    let schema = schema();
    let request = QueryRequest::new("Item")
        .filter(FilterNode::eq("tags.label", "x"))
        .distinct();

    let mut caps = sqlite_caps();
    caps.distinct_without_projection = false;
    let compiled = QueryCompiler::new(&schema, &Sqlite, &caps)
        .compile(&request)
        .unwrap();
    assert!(compiled.client_side_distinct);
    assert_eq!(adapter.query_rows(&compiled.text, &compiled.params).await.unwrap().len(), 2);

    let rows = adapter.fetch(&compiled).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_value("id"), Value::Int(7));
}
