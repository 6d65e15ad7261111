//! Per-table view handed to the code emitters

use crate::analyzer::TableAnalysis;
use crate::naming::{self, NameResolver};
use crate::relations::{
    BelongsToRelation, InverseRelation, ManyToManyRelation, PolymorphicRelation,
    RelationshipDetector,
};
use crate::types::{CheckConstraint, ColumnInfo, ForeignKey, IndexInfo, TableMetadata};
use crate::{Result, SchemaError};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub table: String,
    pub model: String,
    pub namespace: String,
    pub comment: Option<String>,
    pub columns: Vec<ColumnInfo>,
    pub primary_key: Option<String>,
    pub composite_primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<IndexInfo>,
    pub unique_constraints: Vec<IndexInfo>,
    pub check_constraints: Vec<CheckConstraint>,
    pub timestamps: bool,
    pub soft_deletes: bool,
    pub analysis: Option<TableAnalysis>,
    pub belongs_to: Vec<BelongsToRelation>,
    pub inverse_relations: Vec<InverseRelation>,
    pub many_to_many: Vec<ManyToManyRelation>,
    pub polymorphic: Vec<PolymorphicRelation>,
}

impl ModelMetadata {
    /// Build from inspected table data; relations are attached separately
    pub fn from_table(table: &TableMetadata, names: &NameResolver, namespace: &str) -> Result<Self> {
        let model = names.model_name(&table.name);
        if !naming::is_valid_model_name(&model) {
            return Err(SchemaError::InvalidName {
                table: table.name.clone(),
                name: model,
            });
        }

        Ok(Self {
            table: table.name.clone(),
            model,
            namespace: naming::normalize_namespace(namespace),
            comment: table.comment.clone(),
            columns: table.columns.clone(),
            primary_key: table.primary_key.clone(),
            composite_primary_key: table.composite_primary_key.clone(),
            foreign_keys: table.foreign_keys.clone(),
            indexes: table.indexes.clone(),
            unique_constraints: table.unique_constraints().cloned().collect(),
            check_constraints: table.check_constraints.clone(),
            timestamps: table.has_column("created_at") && table.has_column("updated_at"),
            soft_deletes: table.has_column("deleted_at"),
            analysis: None,
            belongs_to: Vec::new(),
            inverse_relations: Vec::new(),
            many_to_many: Vec::new(),
            polymorphic: Vec::new(),
        })
    }

    /// Attach the relations the detector finds for this table
    pub fn with_relations(
        mut self,
        detector: &RelationshipDetector<'_>,
        inverse: bool,
        many_to_many: bool,
        polymorphic: bool,
    ) -> Self {
        self.belongs_to = detector.belongs_to(&self.table);
        if inverse {
            self.inverse_relations = detector.inverse_relationships(&self.table);
        }
        if many_to_many {
            self.many_to_many = detector.many_to_many_relations(&self.table);
        }
        if polymorphic {
            self.polymorphic = detector.detect_polymorphic(&self.table);
        }
        self
    }

    pub fn with_analysis(mut self, analysis: TableAnalysis) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn primary_column(&self) -> &str {
        self.primary_key.as_deref().unwrap_or("id")
    }

    pub fn has_composite_primary_key(&self) -> bool {
        self.composite_primary_key.len() > 1
    }

    pub fn is_primary_key_column(&self, column: &str) -> bool {
        self.primary_column() == column || self.composite_primary_key.iter().any(|c| c == column)
    }

    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    pub fn is_unique_column(&self, column: &str) -> bool {
        self.unique_constraints
            .iter()
            .any(|index| index.is_single_column(column))
    }

    pub fn is_indexed_column(&self, column: &str) -> bool {
        self.indexes.iter().any(|index| index.leads_with(column))
    }

    /// Fully qualified class name
    pub fn class_name(&self) -> String {
        format!("{}\\{}", self.namespace, self.model)
    }

    /// Columns that are mass-assignable
    pub fn fillable(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| !self.is_primary_key_column(&c.name))
            .filter(|c| !naming::is_timestamp_column(&c.name))
            .filter(|c| !c.is_auto_increment())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Columns excluded from serialization
    pub fn hidden(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| naming::is_sensitive_column(&c.name))
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableMetadata {
        TableMetadata::new("users")
            .with_columns(vec![
                ColumnInfo::new("id", "bigint unsigned").auto_increment(),
                ColumnInfo::new("name", "varchar(255)"),
                ColumnInfo::new("password", "varchar(255)"),
                ColumnInfo::new("remember_token", "varchar(100)").nullable(),
                ColumnInfo::new("created_at", "timestamp").nullable(),
                ColumnInfo::new("updated_at", "timestamp").nullable(),
            ])
            .with_primary_key(&["id"])
    }

    #[test]
    fn test_from_table() {
        let meta = ModelMetadata::from_table(&users(), &NameResolver::default(), "\\App\\Models").unwrap();
        assert_eq!(meta.model, "User");
        assert_eq!(meta.namespace, "App\\Models");
        assert_eq!(meta.class_name(), "App\\Models\\User");
        assert!(meta.timestamps);
        assert!(!meta.soft_deletes);
        assert_eq!(meta.fillable(), vec!["name", "password", "remember_token"]);
        assert_eq!(meta.hidden(), vec!["password", "remember_token"]);
    }

    #[test]
    fn test_invalid_model_name() {
        let table = TableMetadata::new("2fa_codes");
        let err = ModelMetadata::from_table(&table, &NameResolver::default(), "App\\Models").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidName { .. }));
    }
}
