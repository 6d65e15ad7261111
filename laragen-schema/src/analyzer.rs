//! Constraint analysis and schema recommendations

use crate::relations::has_unique_single_column_index;
use crate::types::{CheckConstraint, DatabaseSchema, SortOrder, TableMetadata};
use crate::{Result, SchemaError};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryKeyKind {
    Single,
    Composite,
    None,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrimaryKeyAnalysis {
    pub kind: PrimaryKeyKind,
    pub columns: Vec<String>,
    pub primary_column: Option<String>,
    pub is_auto_increment: bool,
    pub is_uuid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForeignKeyCardinality {
    #[serde(rename = "one-to-one")]
    OneToOne,
    #[serde(rename = "one-to-many")]
    OneToMany,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForeignKeyAnalysis {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub constraint_name: Option<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
    pub is_nullable: bool,
    pub has_index: bool,
    pub relationship_type: ForeignKeyCardinality,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexAnalysis {
    pub name: String,
    pub columns: Vec<String>,
    pub column_count: usize,
    pub is_composite: bool,
    pub unique: bool,
    pub primary: bool,
    pub index_type: String,
    pub column_order: Vec<SortOrder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UniqueConstraintAnalysis {
    pub name: String,
    pub columns: Vec<String>,
    pub is_nullable: bool,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Performance,
    Optimization,
    Info,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Performance => "performance",
            Severity::Optimization => "optimization",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    PrimaryKey,
    Index,
    RedundantIndex,
    NullableFk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub severity: Severity,
    pub category: RecommendationCategory,
    pub message: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableAnalysis {
    pub table: String,
    pub primary_key: PrimaryKeyAnalysis,
    pub foreign_keys: Vec<ForeignKeyAnalysis>,
    pub indexes: Vec<IndexAnalysis>,
    pub unique_constraints: Vec<UniqueConstraintAnalysis>,
    pub check_constraints: Vec<CheckConstraint>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConstraintSummary {
    pub total_tables: usize,
    pub tables_with_primary_key: usize,
    pub tables_without_primary_key: usize,
    pub total_foreign_keys: usize,
    pub total_indexes: usize,
    pub total_unique_constraints: usize,
    pub total_check_constraints: usize,
    pub tables_with_issues: Vec<String>,
    pub recommendations: Vec<(String, Vec<Recommendation>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityIssueKind {
    MissingReferencedTable,
    MissingReferencedColumn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityIssue {
    pub kind: IntegrityIssueKind,
    pub table: String,
    pub column: String,
    pub message: String,
}

/// Per-run analyzer; results are cached by table name
pub struct ConstraintAnalyzer<'a> {
    schema: &'a DatabaseSchema,
    cache: HashMap<String, TableAnalysis>,
}

impl<'a> ConstraintAnalyzer<'a> {
    pub fn new(schema: &'a DatabaseSchema) -> Self {
        Self {
            schema,
            cache: HashMap::new(),
        }
    }

    pub fn analyze_table(&mut self, table: &str) -> Result<&TableAnalysis> {
        if !self.cache.contains_key(table) {
            let meta = self
                .schema
                .table(table)
                .ok_or_else(|| SchemaError::TableNotFound(table.to_string()))?;
            log::debug!("Analyzing constraints of table '{}'", table);
            let analysis = analyze(meta);
            self.cache.insert(table.to_string(), analysis);
        }

        self.cache
            .get(table)
            .ok_or_else(|| SchemaError::TableNotFound(table.to_string()))
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn constraint_summary(&mut self, tables: &[String]) -> Result<ConstraintSummary> {
        let mut summary = ConstraintSummary::default();

        for table in tables {
            let analysis = self.analyze_table(table)?;
            summary.total_tables += 1;
            if analysis.primary_key.kind == PrimaryKeyKind::None {
                summary.tables_without_primary_key += 1;
            } else {
                summary.tables_with_primary_key += 1;
            }
            summary.total_foreign_keys += analysis.foreign_keys.len();
            summary.total_indexes += analysis.indexes.len();
            summary.total_unique_constraints += analysis.unique_constraints.len();
            summary.total_check_constraints += analysis.check_constraints.len();

            if !analysis.recommendations.is_empty() {
                summary.tables_with_issues.push(table.clone());
                summary
                    .recommendations
                    .push((table.clone(), analysis.recommendations.clone()));
            }
        }

        Ok(summary)
    }

    /// Foreign keys whose target table or column is missing from the snapshot
    pub fn validate_constraint_integrity(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        for (table, meta) in &self.schema.tables {
            for fk in &meta.foreign_keys {
                match self.schema.table(&fk.referenced_table) {
                    None => issues.push(IntegrityIssue {
                        kind: IntegrityIssueKind::MissingReferencedTable,
                        table: table.clone(),
                        column: fk.column.clone(),
                        message: format!("Referenced table '{}' does not exist", fk.referenced_table),
                    }),
                    Some(target) if !target.has_column(&fk.referenced_column) => {
                        issues.push(IntegrityIssue {
                            kind: IntegrityIssueKind::MissingReferencedColumn,
                            table: table.clone(),
                            column: fk.column.clone(),
                            message: format!(
                                "Referenced column '{}.{}' does not exist",
                                fk.referenced_table, fk.referenced_column
                            ),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        issues
    }
}

fn analyze(meta: &TableMetadata) -> TableAnalysis {
    let primary_key = analyze_primary_key(meta);
    let foreign_keys = analyze_foreign_keys(meta);
    let indexes = analyze_indexes(meta);
    let unique_constraints = analyze_unique_constraints(meta);
    let recommendations = recommendations(&primary_key, &foreign_keys, &indexes);

    TableAnalysis {
        table: meta.name.clone(),
        primary_key,
        foreign_keys,
        indexes,
        unique_constraints,
        check_constraints: meta.check_constraints.clone(),
        recommendations,
    }
}

fn analyze_primary_key(meta: &TableMetadata) -> PrimaryKeyAnalysis {
    let columns = if meta.composite_primary_key.is_empty() {
        meta.primary_key.iter().cloned().collect()
    } else {
        meta.composite_primary_key.clone()
    };

    let kind = match columns.len() {
        0 => PrimaryKeyKind::None,
        1 => PrimaryKeyKind::Single,
        _ => PrimaryKeyKind::Composite,
    };

    let key_column = match kind {
        PrimaryKeyKind::Single => columns.first().and_then(|c| meta.column(c)),
        _ => None,
    };
    let is_auto_increment = key_column.map_or(false, |c| c.is_auto_increment());
    let is_uuid = key_column.map_or(false, |c| {
        let data_type = c.data_type.to_ascii_lowercase();
        data_type.contains("uuid")
            || data_type.contains("uniqueidentifier")
            || data_type == "char(36)"
            || data_type == "varchar(36)"
            || c.udt_name.as_deref() == Some("uuid")
    });

    PrimaryKeyAnalysis {
        kind,
        primary_column: columns.first().cloned(),
        columns,
        is_auto_increment,
        is_uuid,
    }
}

fn analyze_foreign_keys(meta: &TableMetadata) -> Vec<ForeignKeyAnalysis> {
    meta.foreign_keys
        .iter()
        .map(|fk| {
            let relationship_type = if has_unique_single_column_index(meta, &fk.column) {
                ForeignKeyCardinality::OneToOne
            } else {
                ForeignKeyCardinality::OneToMany
            };

            ForeignKeyAnalysis {
                column: fk.column.clone(),
                referenced_table: fk.referenced_table.clone(),
                referenced_column: fk.referenced_column.clone(),
                constraint_name: fk.constraint_name.clone(),
                on_delete: fk.on_delete.clone(),
                on_update: fk.on_update.clone(),
                is_nullable: meta.column(&fk.column).map_or(false, |c| c.nullable),
                has_index: meta.indexes.iter().any(|i| i.leads_with(&fk.column)),
                relationship_type,
            }
        })
        .collect()
}

fn analyze_indexes(meta: &TableMetadata) -> Vec<IndexAnalysis> {
    meta.indexes
        .iter()
        .map(|index| IndexAnalysis {
            name: index.name.clone(),
            columns: index.columns.iter().map(|c| c.name.clone()).collect(),
            column_count: index.columns.len(),
            is_composite: index.columns.len() > 1,
            unique: index.unique,
            primary: index.primary,
            index_type: index.index_type.clone(),
            column_order: index.columns.iter().map(|c| c.order).collect(),
        })
        .collect()
}

fn analyze_unique_constraints(meta: &TableMetadata) -> Vec<UniqueConstraintAnalysis> {
    meta.unique_constraints()
        .map(|index| {
            let is_nullable = index
                .columns
                .iter()
                .any(|c| meta.column(&c.name).map_or(false, |col| col.nullable));
            UniqueConstraintAnalysis {
                name: index.name.clone(),
                columns: index.columns.iter().map(|c| c.name.clone()).collect(),
                is_nullable,
                suggestion: is_nullable.then(|| {
                    "Consider making columns NOT NULL for stricter uniqueness enforcement".to_string()
                }),
            }
        })
        .collect()
}

fn recommendations(
    primary_key: &PrimaryKeyAnalysis,
    foreign_keys: &[ForeignKeyAnalysis],
    indexes: &[IndexAnalysis],
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if primary_key.kind == PrimaryKeyKind::None {
        recommendations.push(Recommendation {
            severity: Severity::Warning,
            category: RecommendationCategory::PrimaryKey,
            message: "Table has no primary key defined".to_string(),
            suggestion: "Add a primary key for better data integrity and performance".to_string(),
        });
    }

    for fk in foreign_keys.iter().filter(|fk| !fk.has_index) {
        recommendations.push(Recommendation {
            severity: Severity::Performance,
            category: RecommendationCategory::Index,
            message: format!("Foreign key column '{}' lacks an index", fk.column),
            suggestion: format!("Add an index on '{}' for better query performance", fk.column),
        });
    }

    for (shorter, longer) in redundant_indexes(indexes) {
        recommendations.push(Recommendation {
            severity: Severity::Optimization,
            category: RecommendationCategory::RedundantIndex,
            message: format!("Index '{}' may be redundant with '{}'", shorter, longer),
            suggestion: "Consider removing the shorter index if the longer one serves both purposes"
                .to_string(),
        });
    }

    for fk in foreign_keys.iter().filter(|fk| fk.is_nullable) {
        recommendations.push(Recommendation {
            severity: Severity::Info,
            category: RecommendationCategory::NullableFk,
            message: format!("Foreign key '{}' is nullable", fk.column),
            suggestion: "Ensure this is intentional for optional relationships".to_string(),
        });
    }

    recommendations
}

/// Pairs (shorter, longer) where the shorter index's columns are a strict
/// prefix of the longer one's. Unique and primary indexes enforce a
/// constraint and are never reported.
fn redundant_indexes(indexes: &[IndexAnalysis]) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();

    for shorter in indexes.iter().filter(|i| !i.unique && !i.primary) {
        for longer in indexes {
            if longer.column_count > shorter.column_count
                && longer.columns[..shorter.column_count] == shorter.columns[..]
            {
                pairs.push((shorter.name.as_str(), longer.name.as_str()));
                break;
            }
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnInfo, Driver, ForeignKey, IndexInfo};

    fn schema() -> DatabaseSchema {
        DatabaseSchema::new(Driver::MySql, "shop")
            .with_table(
                TableMetadata::new("customers")
                    .with_columns(vec![ColumnInfo::new("id", "char(36)")])
                    .with_primary_key(&["id"])
                    .with_index(IndexInfo::new("PRIMARY", &["id"]).primary()),
            )
            .with_table(
                TableMetadata::new("orders")
                    .with_columns(vec![
                        ColumnInfo::new("id", "bigint unsigned").auto_increment(),
                        ColumnInfo::new("customer_id", "char(36)").nullable(),
                        ColumnInfo::new("status", "varchar(20)"),
                        ColumnInfo::new("placed_at", "datetime"),
                        ColumnInfo::new("coupon_code", "varchar(32)").nullable(),
                    ])
                    .with_primary_key(&["id"])
                    .with_foreign_key(ForeignKey::new("customer_id", "customers", "id"))
                    .with_index(IndexInfo::new("PRIMARY", &["id"]).primary())
                    .with_index(IndexInfo::new("orders_status_index", &["status"]))
                    .with_index(IndexInfo::new("orders_status_placed_at_index", &["status", "placed_at"]))
                    .with_index(IndexInfo::new("orders_coupon_code_unique", &["coupon_code"]).unique()),
            )
            .with_table(
                TableMetadata::new("audit_log")
                    .with_columns(vec![ColumnInfo::new("message", "text")]),
            )
    }

    #[test]
    fn test_primary_key_analysis() {
        let schema = schema();
        let mut analyzer = ConstraintAnalyzer::new(&schema);

        let customers = analyzer.analyze_table("customers").unwrap();
        assert_eq!(customers.primary_key.kind, PrimaryKeyKind::Single);
        assert!(customers.primary_key.is_uuid);
        assert!(!customers.primary_key.is_auto_increment);

        let orders = analyzer.analyze_table("orders").unwrap();
        assert!(orders.primary_key.is_auto_increment);
        assert!(!orders.primary_key.is_uuid);
    }

    #[test]
    fn test_recommendations() {
        let schema = schema();
        let mut analyzer = ConstraintAnalyzer::new(&schema);
        let orders = analyzer.analyze_table("orders").unwrap();

        let categories: Vec<_> = orders.recommendations.iter().map(|r| r.category).collect();
        assert_eq!(
            categories,
            vec![
                RecommendationCategory::Index,
                RecommendationCategory::RedundantIndex,
                RecommendationCategory::NullableFk,
            ]
        );
        assert_eq!(
            orders.recommendations[0].message,
            "Foreign key column 'customer_id' lacks an index"
        );
        assert_eq!(
            orders.recommendations[1].message,
            "Index 'orders_status_index' may be redundant with 'orders_status_placed_at_index'"
        );

        let unique = &orders.unique_constraints[0];
        assert!(unique.is_nullable);
        assert!(unique.suggestion.is_some());

        let log = analyzer.analyze_table("audit_log").unwrap();
        assert_eq!(log.primary_key.kind, PrimaryKeyKind::None);
        assert_eq!(log.recommendations[0].message, "Table has no primary key defined");
    }

    #[test]
    fn test_clear_cache() {
        let schema = schema();
        let mut analyzer = ConstraintAnalyzer::new(&schema);
        analyzer.analyze_table("orders").unwrap();
        analyzer.analyze_table("customers").unwrap();
        analyzer.analyze_table("orders").unwrap();
        assert_eq!(analyzer.cache.len(), 2);

        analyzer.clear_cache();
        assert!(analyzer.cache.is_empty());

        let orders = analyzer.analyze_table("orders").unwrap();
        assert_eq!(orders.recommendations.len(), 3);
        assert_eq!(analyzer.cache.len(), 1);
    }

    #[test]
    fn test_summary_and_unknown_table() {
        let schema = schema();
        let mut analyzer = ConstraintAnalyzer::new(&schema);
        let tables: Vec<String> = schema.table_names().iter().map(|s| s.to_string()).collect();
        let summary = analyzer.constraint_summary(&tables).unwrap();

        assert_eq!(summary.total_tables, 3);
        assert_eq!(summary.tables_without_primary_key, 1);
        assert_eq!(summary.total_foreign_keys, 1);
        assert_eq!(summary.tables_with_issues, vec!["orders".to_string(), "audit_log".to_string()]);

        assert!(matches!(
            analyzer.analyze_table("missing"),
            Err(SchemaError::TableNotFound(_))
        ));
        assert!(analyzer.validate_constraint_integrity().is_empty());
    }
}
