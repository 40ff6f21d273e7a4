//! Integration tests for the complete denorm pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - SQL DDL → RelationalSchema → correlated profiles
//! - Bundle JSON → analysis → ranked candidates
//! - Telemetry → co-access → candidacy
//!
//! Run with: cargo test --test integration_tests

use denorm_core::*;
use denorm_ingest_sql::parse_sql_ddl;
use tempfile::tempdir;

const SHOP_DDL: &str = r#"
    CREATE TABLE customers (
        id INT PRIMARY KEY,
        name TEXT NOT NULL
    );
    CREATE TABLE customer_profiles (
        id INT PRIMARY KEY,
        customer_id INT NOT NULL UNIQUE REFERENCES customers(id),
        bio TEXT
    );
    CREATE TABLE orders (
        id INT PRIMARY KEY,
        customer_id INT NOT NULL,
        placed_at TIMESTAMP,
        FOREIGN KEY (customer_id) REFERENCES customers(id)
    );
    CREATE INDEX idx_orders_customer ON orders (customer_id);
    CREATE TABLE products (id INT PRIMARY KEY, title TEXT);
    CREATE TABLE order_products (
        order_id INT NOT NULL REFERENCES orders(id),
        product_id INT NOT NULL REFERENCES products(id),
        created_at TIMESTAMP,
        PRIMARY KEY (order_id, product_id)
    );
"#;

fn shop_entities() -> Vec<EntityModel> {
    vec![
        EntityModel::new("Customer").with_table("customers"),
        EntityModel::new("CustomerProfile").with_table("customer_profiles"),
        EntityModel::new("Order")
            .with_table("orders")
            .with_navigation("Products", "Product", Cardinality::ManyToMany),
        EntityModel::new("Product").with_table("products"),
    ]
}

// ============================================================================
// DDL → schema
// ============================================================================

#[test]
fn test_ddl_relationship_derivation() {
    let schema = parse_sql_ddl(SHOP_DDL).expect("should parse");
    assert_eq!(schema.tables.len(), 5);

    let card = |from: &str, to: &str| {
        schema
            .relationships
            .iter()
            .find(|r| r.from_table == from && r.to_table == to)
            .map(|r| r.cardinality)
    };
    assert_eq!(card("customer_profiles", "customers"), Some(Cardinality::OneToOne));
    assert_eq!(card("orders", "customers"), Some(Cardinality::ManyToOne));
    assert_eq!(card("orders", "products"), Some(Cardinality::ManyToMany));

    let orders = schema.table("ORDERS").expect("case-insensitive lookup");
    assert_eq!(orders.indexes.len(), 2);
}

// ============================================================================
// DDL → analysis
// ============================================================================

#[test]
fn test_schema_one_to_one_joins_read_heavy_candidate() {
    let input = AnalysisInput {
        entities: shop_entities(),
        patterns: vec![QueryPattern::new(PatternKind::SingleLookup, "Customer.ById", 500)],
        schema: Some(parse_sql_ddl(SHOP_DDL).unwrap()),
        ..Default::default()
    };

    let result = analyze(&input, &AnalysisConfig::discovery()).unwrap();
    let customer = result.candidate("Customer").expect("read-heavy customer");

    assert!(customer.related_entities.contains("CustomerProfile"));
    assert!(!customer.related_entities.contains("Order"));
    assert_eq!(customer.fired_rules[0].rule, CandidacyRule::ReadHeavy);
    // 2 columns + 1 index * 2 + 2 relationships * 3
    assert_eq!(customer.complexity_score, 10);
    assert_eq!(customer.complexity, ComplexityClass::Low);

    let order = result.profiles().get("Order").unwrap();
    assert_eq!(order.related_entities.get("Customer"), Some(&Cardinality::ManyToOne));
    assert_eq!(order.related_entities.get("Product"), Some(&Cardinality::ManyToMany));
}

#[test]
fn test_telemetry_co_access_end_to_end() {
    let telemetry: ProductionTelemetry = serde_json::from_str(
        r#"{
            "total_queries_analyzed": 3,
            "queries": [
                { "operation": "read", "tables": ["customers", "orders"], "execution_count": 4000 },
                { "operation": "update", "tables": ["orders"], "execution_count": 40,
                  "mean_duration_ms": 2500.0 },
                { "operation": "read", "tables": ["legacy_audit"], "execution_count": 10 }
            ]
        }"#,
    )
    .unwrap();

    let input = AnalysisInput {
        entities: shop_entities(),
        schema: Some(parse_sql_ddl(SHOP_DDL).unwrap()),
        telemetry: Some(telemetry),
        ..Default::default()
    };
    let result = analyze(&input, &AnalysisConfig::discovery()).unwrap();

    let insights = result.telemetry().expect("telemetry insights");
    assert_eq!(insights.total_executions, 4050);
    assert_eq!(insights.frequent_combinations.len(), 1);
    assert_eq!(insights.slow_queries.len(), 1);
    assert!(insights.unresolved_tables.contains("legacy_audit"));

    let customer = result.candidate("Customer").expect("co-accessed customer");
    assert!(customer.related_entities.contains("Order"));
    assert!(customer
        .fired_rules
        .iter()
        .any(|f| f.rule == CandidacyRule::HighProductionUsage));
    assert!(result.candidate("Product").is_none());
}

#[test]
fn test_bundle_round_trip_through_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bundle.json");

    let input = AnalysisInput {
        entities: shop_entities(),
        patterns: vec![QueryPattern::new(PatternKind::EagerLoad, "Order.Products", 80)],
        ..Default::default()
    };
    std::fs::write(&path, serde_json::to_string(&input).unwrap()).unwrap();

    let loaded: AnalysisInput =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let result = analyze(&loaded, &AnalysisConfig::discovery()).unwrap();

    let order = result.candidate("Order").expect("eager-loading order");
    assert!(order.related_entities.contains("Product"));
    assert_eq!(result.candidates().len(), 1);
}
