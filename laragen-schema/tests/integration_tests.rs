//! Integration tests for the detect -> analyze -> generate workflow

use laragen_schema::{
    ColumnInfo, ConstraintAnalyzer, DatabaseSchema, Driver, ForeignKey, GenerationOptions,
    IndexInfo, ModelMetadata, NameResolver, RelationshipDetector, TableMetadata,
};
use laragen_schema::relations::RelationKind;

fn shop_schema() -> DatabaseSchema {
    DatabaseSchema::new(Driver::Postgres, "shop")
        .with_table(
            TableMetadata::new("users")
                .with_columns(vec![
                    ColumnInfo::new("id", "bigint").auto_increment(),
                    ColumnInfo::new("email", "character varying"),
                    ColumnInfo::new("password", "character varying"),
                    ColumnInfo::new("email_verified_at", "timestamp without time zone").nullable(),
                    ColumnInfo::new("created_at", "timestamp without time zone").nullable(),
                    ColumnInfo::new("updated_at", "timestamp without time zone").nullable(),
                ])
                .with_primary_key(&["id"])
                .with_index(IndexInfo::new("users_pkey", &["id"]).primary())
                .with_index(IndexInfo::new("users_email_unique", &["email"]).unique()),
        )
        .with_table(
            TableMetadata::new("orders")
                .with_columns(vec![
                    ColumnInfo::new("id", "bigint").auto_increment(),
                    ColumnInfo::new("user_id", "bigint"),
                    ColumnInfo::new("total", "numeric(10,2)"),
                    ColumnInfo::new("meta", "jsonb").nullable(),
                    ColumnInfo::new("deleted_at", "timestamp without time zone").nullable(),
                ])
                .with_primary_key(&["id"])
                .with_foreign_key(ForeignKey::new("user_id", "users", "id"))
                .with_index(IndexInfo::new("orders_pkey", &["id"]).primary())
                .with_index(IndexInfo::new("orders_user_id_index", &["user_id"])),
        )
        .with_table(
            TableMetadata::new("products")
                .with_columns(vec![
                    ColumnInfo::new("sku", "character varying"),
                    ColumnInfo::new("name", "character varying"),
                ])
                .with_primary_key(&["sku"]),
        )
        .with_table(
            TableMetadata::new("order_product")
                .with_columns(vec![
                    ColumnInfo::new("order_id", "bigint"),
                    ColumnInfo::new("product_sku", "character varying"),
                    ColumnInfo::new("quantity", "integer"),
                ])
                .with_primary_key(&["order_id", "product_sku"])
                .with_foreign_key(ForeignKey::new("order_id", "orders", "id"))
                .with_foreign_key(ForeignKey::new("product_sku", "products", "sku")),
        )
}

fn model(schema: &DatabaseSchema, table: &str) -> ModelMetadata {
    let names = NameResolver::default();
    let detector = RelationshipDetector::new(schema);
    let mut analyzer = ConstraintAnalyzer::new(schema);
    let analysis = analyzer.analyze_table(table).unwrap().clone();

    ModelMetadata::from_table(schema.table(table).unwrap(), &names, "App\\Models")
        .unwrap()
        .with_relations(&detector, true, true, true)
        .with_analysis(analysis)
}

#[test]
fn test_relations_attach_to_metadata() {
    let schema = shop_schema();

    let users = model(&schema, "users");
    assert_eq!(users.inverse_relations.len(), 1);
    assert_eq!(users.inverse_relations[0].method, "orders");
    assert_eq!(users.inverse_relations[0].kind, RelationKind::HasMany);

    let orders = model(&schema, "orders");
    assert_eq!(orders.belongs_to[0].method, "user");
    assert_eq!(orders.many_to_many[0].method, "products");
    assert_eq!(orders.many_to_many[0].pivot_table, "order_product");
    assert!(orders.soft_deletes);
    assert!(!orders.timestamps);

    let products = model(&schema, "products");
    assert_eq!(products.many_to_many[0].method, "orders");
    assert_eq!(products.many_to_many[0].related_pivot_key, "order_id");
}

#[test]
fn test_options_drive_enabled_generators() {
    let options = GenerationOptions {
        resources: true,
        policies: true,
        ..Default::default()
    };
    let kinds: Vec<&str> = options.enabled_artifacts().iter().map(|k| k.name()).collect();
    assert_eq!(kinds, vec!["model", "resource", "policy"]);
}

#[test]
fn test_summary_over_whole_schema() {
    let schema = shop_schema();
    let mut analyzer = ConstraintAnalyzer::new(&schema);
    let tables: Vec<String> = schema.tables.keys().cloned().collect();
    let summary = analyzer.constraint_summary(&tables).unwrap();

    assert_eq!(summary.total_tables, 4);
    assert_eq!(summary.tables_with_primary_key, 4);
    assert_eq!(summary.total_foreign_keys, 3);
    // order_product.product_sku is not the leading column of any index
    assert!(summary.tables_with_issues.contains(&"order_product".to_string()));
    assert!(!summary.tables_with_issues.contains(&"users".to_string()));
}

#[cfg(feature = "codegen")]
mod codegen {
    use super::*;
    use laragen_schema::codegen::{GenerationOrchestrator, TemplateGenerator};
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn test_generate_all_artifacts() {
        let schema = shop_schema();
        let models = vec![model(&schema, "users"), model(&schema, "orders")];
        let options = GenerationOptions::default().all();

        let templates = Arc::new(TemplateGenerator::with_builtin_templates().unwrap());
        let orchestrator = GenerationOrchestrator::with_defaults(templates);
        let results = orchestrator.generate(&models, &options);

        assert_eq!(results.len(), 2);
        for result in &results {
            assert_eq!(result.artifacts.len(), 5);
            assert!(result.artifacts.iter().all(|(_, a)| a.is_ok()));
        }

        let paths: Vec<PathBuf> = results[1]
            .artifacts
            .iter()
            .map(|(_, a)| a.as_ref().unwrap().relative_path.clone())
            .collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("app/Models/Order.php"),
                PathBuf::from("app/Http/Controllers/OrderController.php"),
                PathBuf::from("app/Http/Resources/OrderResource.php"),
                PathBuf::from("app/Observers/OrderObserver.php"),
                PathBuf::from("app/Policies/OrderPolicy.php"),
            ]
        );
    }

    #[test]
    fn test_custom_namespace_path() {
        let schema = shop_schema();
        let names = NameResolver::default();
        let meta = ModelMetadata::from_table(schema.table("users").unwrap(), &names, "App\\Domain\\Models")
            .unwrap();
        let options = GenerationOptions::default();
        assert_eq!(
            laragen_schema::codegen::model_path(&meta, &options),
            PathBuf::from("app/Domain/Models/User.php")
        );
    }
}
