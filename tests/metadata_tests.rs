//! End-to-end tests for table listing and schema resolution

use docstore_connector::glob::PatternSet;
use docstore_connector::metadata::SchemaSource;
use docstore_connector::models::SOURCE_TABLE_PROPERTY;
use docstore_connector::{
    ColumnKind, ConnectorConfig, Document, MemoryStore, MetadataError, MetadataHandler, Value,
};
use std::sync::Arc;

fn tenant_store() -> MemoryStore {
    MemoryStore::new()
        .with_collection(
            "sales",
            "orders_acme",
            vec![
                Document::new()
                    .with("id", 1)
                    .with("total", 10)
                    .with("tags", Value::Array(Vec::new())),
                Document::new().with("id", 2).with("total", 12),
            ],
        )
        .with_collection(
            "sales",
            "orders_globex",
            vec![
                Document::new()
                    .with("id", 3_000_000_000i64)
                    .with("total", 9.5)
                    .with("tags", Value::Array(vec![Value::from("rush")]))
                    .with(
                        "customer",
                        Document::new().with("name", "Hank").with("vip", true),
                    ),
            ],
        )
        .with_collection(
            "sales",
            "Customers",
            vec![Document::new().with("name", "Hank")],
        )
        .with_collection("hr", "people", Vec::new())
}

fn handler(glob_pattern: &str) -> MetadataHandler {
    let config = ConnectorConfig {
        glob_pattern: glob_pattern.to_string(),
        ..ConnectorConfig::default()
    };
    MetadataHandler::new(Arc::new(tenant_store()), config)
}

#[test]
fn test_list_schemas_and_tables() {
    let handler = handler("orders_{{tenant}}");
    assert_eq!(handler.list_schema_names().unwrap(), vec!["sales", "hr"]);
    assert_eq!(
        handler.list_table_names("sales").unwrap(),
        vec!["orders_tenant", "Customers"]
    );
}

#[test]
fn test_pass_through_without_patterns() {
    let handler = handler("");
    assert_eq!(
        handler.list_table_names("sales").unwrap(),
        vec!["orders_acme", "orders_globex", "Customers"]
    );
}

#[test]
fn test_multi_tenant_schema_is_merged_across_collections() {
    let table = handler("orders_{{tenant}}")
        .get_table("sales", "orders_tenant")
        .unwrap();
    let schema = &table.schema;

    assert_eq!(table.source, SchemaSource::Inferred);
    let names: Vec<&str> = schema.names().collect();
    assert_eq!(names, vec!["id", "total", "tags", "customer", "tenant"]);
    assert_eq!(schema.kind_of("id"), Some(&ColumnKind::Int64));
    assert_eq!(schema.kind_of("total"), Some(&ColumnKind::Float64));
    assert_eq!(
        schema.kind_of("tags"),
        Some(&ColumnKind::list_of(ColumnKind::String))
    );
    assert_eq!(schema.kind_of("tenant"), Some(&ColumnKind::String));

    let customer = schema.column("customer").unwrap();
    assert_eq!(customer.child("vip").unwrap().kind, ColumnKind::Boolean);
    assert!(schema.columns.iter().all(|c| c.nullable));
    assert_eq!(
        schema.metadata.get(SOURCE_TABLE_PROPERTY),
        Some(&"orders_tenant".to_string())
    );
}

#[test]
fn test_plain_table_resolves_ignoring_case() {
    let table = handler("orders_{{tenant}}")
        .get_table("sales", "customers")
        .unwrap();
    assert_eq!(table.schema.kind_of("name"), Some(&ColumnKind::String));
}

#[test]
fn test_empty_collection_yields_empty_schema() {
    let table = handler("").get_table("hr", "people").unwrap();
    assert!(table.schema.is_empty());
}

#[test]
fn test_unknown_table_is_an_error() {
    let result = handler("orders_{{tenant}}").get_table("sales", "invoices");
    match result {
        Err(MetadataError::TableNotFound { schema, table }) => {
            assert_eq!(schema, "sales");
            assert_eq!(table, "invoices");
        }
        other => panic!("expected TableNotFound, got {:?}", other),
    }
}

#[test]
fn test_unconfigured_logical_name_matches_everything() {
    let patterns = PatternSet::parse("orders_{{tenant}}");
    assert!(patterns.matches("invoices", "anything_at_all"));
    assert!(!patterns.matches("orders_tenant", "invoices"));
    assert!(patterns.matches("ORDERS_TENANT", "Orders_Acme"));
}

#[test]
fn test_table_info_serializes() {
    let table = handler("").get_table("sales", "Customers").unwrap();
    let json = serde_json::to_value(&table).unwrap();
    assert_eq!(json["source"], "inferred");
    assert_eq!(json["schema"]["columns"][0]["name"], "name");
    assert_eq!(json["schema"]["columns"][0]["type"], "string");
}
