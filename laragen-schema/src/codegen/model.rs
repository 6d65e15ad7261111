//! Eloquent model generation

use super::{model_path, Artifact, ArtifactGenerator, TemplateGenerator};
use crate::metadata::ModelMetadata;
use crate::naming;
use crate::options::{ArtifactKind, GenerationOptions};
use crate::relations::RelationKind;
use crate::Result;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

const RELATIONS_NAMESPACE: &str = "Illuminate\\Database\\Eloquent\\Relations";
const COLLECTION_CLASS: &str = "\\Illuminate\\Database\\Eloquent\\Collection";

#[derive(Debug, Serialize)]
struct ModelContext {
    namespace: String,
    class_name: String,
    table: String,
    imports: Vec<String>,
    traits: String,
    docblock: Vec<String>,
    primary_key: Option<String>,
    primary_key_doc: &'static str,
    key_type: Option<String>,
    non_incrementing: bool,
    timestamps_disabled: bool,
    constraint_comments: Vec<String>,
    fillable: Vec<String>,
    hidden: Vec<String>,
    casts: Vec<CastEntry>,
    relationships: Vec<RelationshipMethod>,
}

#[derive(Debug, Serialize)]
struct CastEntry {
    column: String,
    cast: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationshipMethod {
    pub method: String,
    pub kind: RelationKind,
    pub related_model: Option<String>,
    pub description: String,
    pub return_doc: String,
    pub return_class: String,
    pub call: String,
}

/// Assembles the pieces of one model class
pub struct ModelBuilder<'a> {
    meta: &'a ModelMetadata,
    options: &'a GenerationOptions,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(meta: &'a ModelMetadata, options: &'a GenerationOptions) -> Self {
        Self { meta, options }
    }

    pub fn build(&self, templates: &TemplateGenerator) -> Result<String> {
        let relationships = self.relationships();
        let context = ModelContext {
            namespace: self.meta.namespace.clone(),
            class_name: self.meta.model.clone(),
            table: self.meta.table.clone(),
            imports: self.imports(&relationships),
            traits: if self.meta.soft_deletes {
                "SoftDeletes".to_string()
            } else {
                String::new()
            },
            docblock: if self.options.with_phpdoc {
                self.docblock(&relationships)
            } else {
                Vec::new()
            },
            primary_key: self.primary_key_literal(),
            primary_key_doc: if self.meta.has_composite_primary_key() {
                "array<int, string>"
            } else {
                "string"
            },
            key_type: self.key_type(),
            non_incrementing: self.non_incrementing(),
            timestamps_disabled: !self.meta.timestamps,
            constraint_comments: if self.options.with_constraints {
                self.constraint_comments()
            } else {
                Vec::new()
            },
            fillable: self.meta.fillable().into_iter().map(String::from).collect(),
            hidden: self.meta.hidden().into_iter().map(String::from).collect(),
            casts: self.casts(),
            relationships,
        };

        templates.render("model", &context)
    }

    /// `$primaryKey` literal; absent for the framework default `id`
    fn primary_key_literal(&self) -> Option<String> {
        if self.meta.has_composite_primary_key() {
            let columns: Vec<String> = self
                .meta
                .composite_primary_key
                .iter()
                .map(|c| format!("'{}'", c))
                .collect();
            return Some(format!("[{}]", columns.join(", ")));
        }

        match self.meta.primary_key.as_deref() {
            Some(key) if key != "id" => Some(format!("'{}'", key)),
            _ => None,
        }
    }

    fn single_key_column(&self) -> Option<&crate::types::ColumnInfo> {
        if self.meta.has_composite_primary_key() {
            return None;
        }
        self.meta.primary_key.as_deref().and_then(|k| self.meta.column(k))
    }

    fn key_type(&self) -> Option<String> {
        let column = self.single_key_column()?;
        let is_uuid = self
            .meta
            .analysis
            .as_ref()
            .map_or(false, |a| a.primary_key.is_uuid);
        let php = naming::php_type(&column.data_type, &self.options.type_mappings);
        (is_uuid || (php == "string" && !column.is_auto_increment())).then(|| "string".to_string())
    }

    fn non_incrementing(&self) -> bool {
        if self.meta.has_composite_primary_key() {
            return true;
        }
        self.single_key_column()
            .map_or(false, |column| !column.is_auto_increment())
    }

    fn casts(&self) -> Vec<CastEntry> {
        self.meta
            .columns
            .iter()
            .filter_map(|c| {
                naming::cast_type(&c.name, &c.data_type).map(|cast| CastEntry {
                    column: c.name.clone(),
                    cast,
                })
            })
            .collect()
    }

    fn imports(&self, relationships: &[RelationshipMethod]) -> Vec<String> {
        let mut imports = BTreeSet::new();
        imports.insert("Illuminate\\Database\\Eloquent\\Model".to_string());
        if self.meta.soft_deletes {
            imports.insert("Illuminate\\Database\\Eloquent\\SoftDeletes".to_string());
        }
        for relation in relationships {
            imports.insert(format!("{}\\{}", RELATIONS_NAMESPACE, relation.return_class));
        }
        imports.into_iter().collect()
    }

    /// Relationship methods with collision-free names
    pub fn relationships(&self) -> Vec<RelationshipMethod> {
        let mut used: HashSet<String> = self.meta.columns.iter().map(|c| c.name.clone()).collect();
        let mut methods = Vec::new();

        for relation in &self.meta.belongs_to {
            let mut call = format!(
                "$this->belongsTo({}::class, '{}'",
                relation.model, relation.foreign_key
            );
            if relation.owner_key != "id" {
                call.push_str(&format!(", '{}'", relation.owner_key));
            }
            call.push(')');
            methods.push(relation_method(
                &mut used,
                &relation.method,
                RelationKind::BelongsTo,
                Some(&relation.model),
                call,
            ));
        }

        for relation in &self.meta.polymorphic {
            let method = naming::camel(&relation.name);
            let call = format!(
                "$this->morphTo('{}', '{}', '{}')",
                method, relation.type_column, relation.id_column
            );
            methods.push(relation_method(&mut used, &method, RelationKind::MorphTo, None, call));
        }

        for relation in &self.meta.inverse_relations {
            let mut call = format!(
                "$this->{}({}::class, '{}'",
                relation.kind.method(),
                relation.model,
                relation.foreign_key
            );
            if relation.local_key != "id" {
                call.push_str(&format!(", '{}'", relation.local_key));
            }
            call.push(')');
            methods.push(relation_method(
                &mut used,
                &relation.method,
                relation.kind,
                Some(&relation.model),
                call,
            ));
        }

        for relation in &self.meta.many_to_many {
            let call = format!(
                "$this->belongsToMany({}::class, '{}', '{}', '{}')",
                relation.model, relation.pivot_table, relation.foreign_pivot_key, relation.related_pivot_key
            );
            methods.push(relation_method(
                &mut used,
                &relation.method,
                RelationKind::BelongsToMany,
                Some(&relation.model),
                call,
            ));
        }

        methods
    }

    fn docblock(&self, relationships: &[RelationshipMethod]) -> Vec<String> {
        let mut lines = vec![format!("{} model for the `{}` table.", self.meta.model, self.meta.table)];
        if let Some(comment) = self.meta.comment.as_deref().filter(|c| !c.is_empty()) {
            lines.push(String::new());
            lines.push(comment.to_string());
        }
        lines.push(String::new());

        for column in &self.meta.columns {
            let php = naming::php_type(&column.data_type, &self.options.type_mappings);
            let php = if column.nullable && php != "mixed" {
                format!("?{}", php)
            } else {
                php
            };

            let mut line = format!("@property {} ${}", php, column.name);
            if let Some(comment) = column.comment.as_deref().filter(|c| !c.is_empty()) {
                line.push(' ');
                line.push_str(comment);
            }
            let markers = self.constraint_markers(&column.name);
            if !markers.is_empty() {
                line.push_str(&format!(" ({})", markers.join(", ")));
            }
            lines.push(line);
        }

        for relation in relationships {
            let doc_type = match (relation.kind, relation.related_model.as_deref()) {
                (RelationKind::HasMany | RelationKind::BelongsToMany, Some(model)) => {
                    format!("{}<int, {}>", COLLECTION_CLASS, model)
                }
                (_, Some(model)) => model.to_string(),
                (_, None) => "\\Illuminate\\Database\\Eloquent\\Model".to_string(),
            };
            lines.push(format!("@property-read {} ${}", doc_type, relation.method));
        }

        lines
    }

    fn constraint_markers(&self, column: &str) -> Vec<String> {
        let mut markers = Vec::new();
        if self.meta.is_primary_key_column(column) && self.meta.has_column(column) {
            markers.push("PK".to_string());
        }
        if let Some(fk) = self.meta.foreign_key(column) {
            markers.push(format!("FK -> {}.{}", fk.referenced_table, fk.referenced_column));
        }
        if self.meta.is_unique_column(column) {
            markers.push("UNIQUE".to_string());
        } else if self.meta.is_indexed_column(column) && !self.meta.is_primary_key_column(column) {
            markers.push("INDEXED".to_string());
        }
        markers
    }

    fn constraint_comments(&self) -> Vec<String> {
        let mut lines = vec!["Database Constraints".to_string(), "-".repeat(50)];

        if self.meta.has_composite_primary_key() {
            lines.push(String::new());
            lines.push(format!(
                "Primary Key: ({})",
                self.meta.composite_primary_key.join(", ")
            ));
        } else if let Some(key) = &self.meta.primary_key {
            lines.push(String::new());
            lines.push(format!("Primary Key: {}", key));
        }

        if !self.meta.foreign_keys.is_empty() {
            lines.push(String::new());
            lines.push("Foreign Keys:".to_string());
            for fk in &self.meta.foreign_keys {
                let mut line = format!(
                    "  - {} -> {}.{}",
                    fk.column, fk.referenced_table, fk.referenced_column
                );
                if let Some(on_delete) = &fk.on_delete {
                    line.push_str(&format!(" (ON DELETE {})", on_delete));
                }
                lines.push(line);
            }
        }

        if !self.meta.unique_constraints.is_empty() {
            lines.push(String::new());
            lines.push("Unique Constraints:".to_string());
            for index in &self.meta.unique_constraints {
                lines.push(format!("  - {}: {}", index.name, index.column_names().join(", ")));
            }
        }

        let plain: Vec<_> = self
            .meta
            .indexes
            .iter()
            .filter(|i| !i.unique && !i.primary)
            .collect();
        if !plain.is_empty() {
            lines.push(String::new());
            lines.push("Indexes:".to_string());
            for index in plain {
                let columns: Vec<String> = index
                    .columns
                    .iter()
                    .map(|c| format!("{} {}", c.name, c.order))
                    .collect();
                lines.push(format!("  - {}: {}", index.name, columns.join(", ")));
            }
        }

        if !self.meta.check_constraints.is_empty() {
            lines.push(String::new());
            lines.push("Check Constraints:".to_string());
            for check in &self.meta.check_constraints {
                lines.push(format!("  - {}: {}", check.name, check.definition));
            }
        }

        lines
    }
}

fn relation_method(
    used: &mut HashSet<String>,
    method: &str,
    kind: RelationKind,
    related_model: Option<&str>,
    call: String,
) -> RelationshipMethod {
    let method = unique_method_name(used, method);
    RelationshipMethod {
        description: format!("Get the {} relationship.", method),
        return_doc: format!("\\{}\\{}", RELATIONS_NAMESPACE, kind.class()),
        return_class: kind.class().to_string(),
        related_model: related_model.map(String::from),
        method,
        kind,
        call,
    }
}

/// `name`, then `name1`, `name2`, ... until unused
fn unique_method_name(used: &mut HashSet<String>, name: &str) -> String {
    let mut candidate = name.to_string();
    let mut counter = 1;
    while used.contains(&candidate) {
        candidate = format!("{}{}", name, counter);
        counter += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// Generates `{target_path}/{namespace}/{Model}.php`
pub struct ModelGenerator {
    templates: Arc<TemplateGenerator>,
}

impl ModelGenerator {
    pub fn new(templates: Arc<TemplateGenerator>) -> Self {
        Self { templates }
    }
}

impl ArtifactGenerator for ModelGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Model
    }

    fn generate(&self, meta: &ModelMetadata, options: &GenerationOptions) -> Result<Artifact> {
        let content = ModelBuilder::new(meta, options).build(&self.templates)?;
        Ok(Artifact {
            kind: ArtifactKind::Model,
            name: meta.model.clone(),
            relative_path: model_path(meta, options),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_method_name() {
        let mut used: HashSet<String> = ["user".to_string()].into_iter().collect();
        assert_eq!(unique_method_name(&mut used, "user"), "user1");
        assert_eq!(unique_method_name(&mut used, "user"), "user2");
        assert_eq!(unique_method_name(&mut used, "posts"), "posts");
    }
}
