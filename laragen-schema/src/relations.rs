//! Relationship inference over a schema snapshot
//!
//! Everything here is derived from foreign keys and column names only:
//! inverse relations (parent -> children), pivot tables for many-to-many
//! relations, and `*_type` / `*_id` polymorphic pairs.

use crate::naming::{self, NameResolver};
use crate::types::{DatabaseSchema, ForeignKey, TableMetadata};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RelationKind {
    BelongsTo,
    HasOne,
    HasMany,
    BelongsToMany,
    MorphTo,
}

impl RelationKind {
    /// Eloquent builder method, e.g. `hasMany`
    pub fn method(&self) -> &'static str {
        match self {
            RelationKind::BelongsTo => "belongsTo",
            RelationKind::HasOne => "hasOne",
            RelationKind::HasMany => "hasMany",
            RelationKind::BelongsToMany => "belongsToMany",
            RelationKind::MorphTo => "morphTo",
        }
    }

    /// Relation class name, e.g. `HasMany`
    pub fn class(&self) -> &'static str {
        match self {
            RelationKind::BelongsTo => "BelongsTo",
            RelationKind::HasOne => "HasOne",
            RelationKind::HasMany => "HasMany",
            RelationKind::BelongsToMany => "BelongsToMany",
            RelationKind::MorphTo => "MorphTo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

/// Parent side of a foreign key declared on another table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InverseRelation {
    pub method: String,
    pub model: String,
    pub source_table: String,
    pub foreign_key: String,
    pub local_key: String,
    pub kind: RelationKind,
}

/// Join table linking two tables through exactly two foreign keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PivotTable {
    pub pivot_table: String,
    pub model1: String,
    pub model2: String,
    pub foreign_key1: String,
    pub foreign_key2: String,
    pub table1: String,
    pub table2: String,
}

/// Belongs-to-many relation seen from one side of a pivot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManyToManyRelation {
    pub method: String,
    pub model: String,
    pub related_table: String,
    pub pivot_table: String,
    pub foreign_pivot_key: String,
    pub related_pivot_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolymorphicRelation {
    pub name: String,
    pub type_column: String,
    pub id_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BelongsToRelation {
    pub method: String,
    pub model: String,
    pub foreign_key: String,
    pub owner_key: String,
    pub related_table: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationshipSummary {
    pub table: String,
    pub model: String,
    pub belongs_to: Vec<BelongsToRelation>,
    pub inverse: Vec<InverseRelation>,
    pub many_to_many: Vec<ManyToManyRelation>,
    pub polymorphic: Vec<PolymorphicRelation>,
    pub is_pivot: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyIssueKind {
    MissingReferencedTable,
    MissingReferencedColumn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyIssue {
    pub kind: ForeignKeyIssueKind,
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub message: String,
}

pub struct RelationshipDetector<'a> {
    schema: &'a DatabaseSchema,
    names: NameResolver,
}

impl<'a> RelationshipDetector<'a> {
    pub fn new(schema: &'a DatabaseSchema) -> Self {
        Self::with_names(schema, NameResolver::default())
    }

    pub fn with_names(schema: &'a DatabaseSchema, names: NameResolver) -> Self {
        Self { schema, names }
    }

    /// Foreign keys of every table, keyed by table name
    pub fn foreign_key_map(&self) -> HashMap<&'a str, &'a [ForeignKey]> {
        self.schema
            .tables
            .iter()
            .map(|(name, table)| (name.as_str(), table.foreign_keys.as_slice()))
            .collect()
    }

    /// Belongs-to side for each foreign key declared on `table`
    pub fn belongs_to(&self, table: &str) -> Vec<BelongsToRelation> {
        let Some(meta) = self.schema.table(table) else {
            return Vec::new();
        };

        meta.foreign_keys
            .iter()
            .map(|fk| {
                let model = self.names.model_name(&fk.referenced_table);
                let method = naming::foreign_key_to_relation_name(&fk.column)
                    .unwrap_or_else(|| naming::camel(&model));
                BelongsToRelation {
                    method,
                    model,
                    foreign_key: fk.column.clone(),
                    owner_key: fk.referenced_column.clone(),
                    related_table: fk.referenced_table.clone(),
                }
            })
            .collect()
    }

    /// Tables whose foreign keys point at `table`, as has-one / has-many relations
    pub fn inverse_relationships(&self, table: &str) -> Vec<InverseRelation> {
        let mut relations = Vec::new();

        for (source_table, source) in &self.schema.tables {
            for fk in source.foreign_keys.iter().filter(|fk| fk.referenced_table == table) {
                let model = self.names.model_name(source_table);
                let kind = if self.should_be_has_one(source_table, &fk.column) {
                    RelationKind::HasOne
                } else {
                    RelationKind::HasMany
                };
                let method = match kind {
                    RelationKind::HasOne => naming::has_one_method_name(&model),
                    _ => naming::has_many_method_name(&model),
                };

                relations.push(InverseRelation {
                    method,
                    model,
                    source_table: source_table.clone(),
                    foreign_key: fk.column.clone(),
                    local_key: fk.referenced_column.clone(),
                    kind,
                });
            }
        }

        relations
    }

    /// A foreign key backed by a single-column unique index is a one-to-one link
    pub fn should_be_has_one(&self, source_table: &str, column: &str) -> bool {
        self.schema
            .table(source_table)
            .map_or(false, |t| has_unique_single_column_index(t, column))
    }

    pub fn determine_cardinality(&self, source_table: &str, column: &str) -> Cardinality {
        if self.should_be_has_one(source_table, column) {
            Cardinality::One
        } else {
            Cardinality::Many
        }
    }

    /// Pivot detection: exactly two foreign keys and at most two other
    /// non-timestamp columns
    pub fn detect_many_to_many(&self, table: &str) -> Option<PivotTable> {
        let meta = self.schema.table(table)?;
        if meta.foreign_keys.len() != 2 {
            return None;
        }

        let fk_columns: Vec<&str> = meta.foreign_keys.iter().map(|fk| fk.column.as_str()).collect();
        let other_columns = meta
            .columns
            .iter()
            .filter(|c| !fk_columns.contains(&c.name.as_str()))
            .filter(|c| !naming::is_timestamp_column(&c.name))
            .count();
        if other_columns > 2 {
            return None;
        }

        let fk1 = &meta.foreign_keys[0];
        let fk2 = &meta.foreign_keys[1];
        Some(PivotTable {
            pivot_table: table.to_string(),
            model1: self.names.model_name(&fk1.referenced_table),
            model2: self.names.model_name(&fk2.referenced_table),
            foreign_key1: fk1.column.clone(),
            foreign_key2: fk2.column.clone(),
            table1: fk1.referenced_table.clone(),
            table2: fk2.referenced_table.clone(),
        })
    }

    pub fn pivot_tables(&self) -> Vec<PivotTable> {
        self.schema
            .tables
            .keys()
            .filter_map(|name| self.detect_many_to_many(name))
            .collect()
    }

    pub fn is_pivot_table(&self, table: &str) -> bool {
        self.detect_many_to_many(table).is_some()
    }

    pub fn many_to_many_method_name(&self, related_table: &str) -> String {
        naming::has_many_method_name(&self.names.model_name(related_table))
    }

    /// Belongs-to-many relations of `table` through every pivot that joins it
    pub fn many_to_many_relations(&self, table: &str) -> Vec<ManyToManyRelation> {
        let mut relations = Vec::new();

        for pivot in self.pivot_tables() {
            if pivot.pivot_table == table {
                continue;
            }

            let sides = [
                (&pivot.table1, &pivot.foreign_key1, &pivot.table2, &pivot.foreign_key2),
                (&pivot.table2, &pivot.foreign_key2, &pivot.table1, &pivot.foreign_key1),
            ];
            for (own_table, own_key, related_table, related_key) in sides {
                if own_table != table {
                    continue;
                }
                relations.push(ManyToManyRelation {
                    method: self.many_to_many_method_name(related_table),
                    model: self.names.model_name(related_table),
                    related_table: related_table.clone(),
                    pivot_table: pivot.pivot_table.clone(),
                    foreign_pivot_key: own_key.clone(),
                    related_pivot_key: related_key.clone(),
                });
                // a self-referencing pivot yields one relation, not two
                if pivot.table1 == pivot.table2 {
                    break;
                }
            }
        }

        relations
    }

    /// `{name}_type` + `{name}_id` column pairs
    pub fn detect_polymorphic(&self, table: &str) -> Vec<PolymorphicRelation> {
        let Some(meta) = self.schema.table(table) else {
            return Vec::new();
        };

        meta.columns
            .iter()
            .filter_map(|column| {
                let name = column.name.strip_suffix("_type")?;
                if name.is_empty() {
                    return None;
                }
                let id_column = format!("{}_id", name);
                meta.has_column(&id_column).then(|| PolymorphicRelation {
                    name: name.to_string(),
                    type_column: column.name.clone(),
                    id_column,
                })
            })
            .collect()
    }

    pub fn relationship_summary(&self, table: &str) -> RelationshipSummary {
        RelationshipSummary {
            table: table.to_string(),
            model: self.names.model_name(table),
            belongs_to: self.belongs_to(table),
            inverse: self.inverse_relationships(table),
            many_to_many: self.many_to_many_relations(table),
            polymorphic: self.detect_polymorphic(table),
            is_pivot: self.is_pivot_table(table),
        }
    }

    /// Foreign keys pointing at tables or columns missing from the snapshot
    pub fn validate_foreign_keys(&self) -> Vec<ForeignKeyIssue> {
        let mut issues = Vec::new();

        for (table, meta) in &self.schema.tables {
            for fk in &meta.foreign_keys {
                let issue = match self.schema.table(&fk.referenced_table) {
                    None => Some((
                        ForeignKeyIssueKind::MissingReferencedTable,
                        format!(
                            "Foreign key {}.{} references missing table '{}'",
                            table, fk.column, fk.referenced_table
                        ),
                    )),
                    Some(target) if !target.has_column(&fk.referenced_column) => Some((
                        ForeignKeyIssueKind::MissingReferencedColumn,
                        format!(
                            "Foreign key {}.{} references missing column '{}.{}'",
                            table, fk.column, fk.referenced_table, fk.referenced_column
                        ),
                    )),
                    Some(_) => None,
                };

                if let Some((kind, message)) = issue {
                    issues.push(ForeignKeyIssue {
                        kind,
                        table: table.clone(),
                        column: fk.column.clone(),
                        referenced_table: fk.referenced_table.clone(),
                        referenced_column: fk.referenced_column.clone(),
                        message,
                    });
                }
            }
        }

        issues
    }
}

pub(crate) fn has_unique_single_column_index(table: &TableMetadata, column: &str) -> bool {
    table
        .indexes
        .iter()
        .any(|index| index.unique && index.is_single_column(column))
}
