//! Controller, resource, observer and policy generators

use super::{app_class_path, Artifact, ArtifactGenerator, TemplateGenerator};
use crate::metadata::ModelMetadata;
use crate::naming;
use crate::options::{ArtifactKind, GenerationOptions};
use crate::types::ColumnInfo;
use crate::Result;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct RuleEntry {
    column: String,
    rules: String,
}

#[derive(Debug, Serialize)]
struct ControllerContext {
    model: String,
    model_class: String,
    variable: String,
    store_rules: Vec<RuleEntry>,
    update_rules: Vec<RuleEntry>,
}

/// JSON API controller: `app/Http/Controllers/{Model}Controller.php`
pub struct ControllerGenerator {
    templates: Arc<TemplateGenerator>,
}

impl ControllerGenerator {
    pub fn new(templates: Arc<TemplateGenerator>) -> Self {
        Self { templates }
    }
}

impl ArtifactGenerator for ControllerGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Controller
    }

    fn generate(&self, meta: &ModelMetadata, _options: &GenerationOptions) -> Result<Artifact> {
        let fillable = meta.fillable();
        let mut store_rules = Vec::new();
        let mut update_rules = Vec::new();

        for column in meta.columns.iter().filter(|c| fillable.contains(&c.name.as_str())) {
            let rules = validation_rules(meta, column);
            let mut store = rules.clone();
            if meta.is_unique_column(&column.name) {
                store.push(format!("unique:{},{}", meta.table, column.name));
            }

            store_rules.push(RuleEntry {
                column: column.name.clone(),
                rules: store.join("|"),
            });
            update_rules.push(RuleEntry {
                column: column.name.clone(),
                rules: format!("sometimes|{}", rules.join("|")),
            });
        }

        let name = format!("{}Controller", meta.model);
        let context = ControllerContext {
            model: meta.model.clone(),
            model_class: meta.class_name(),
            variable: naming::camel(&meta.model),
            store_rules,
            update_rules,
        };

        Ok(Artifact {
            kind: ArtifactKind::Controller,
            relative_path: app_class_path("Http/Controllers", &name),
            content: self.templates.render("controller", &context)?,
            name,
        })
    }
}

/// Laravel validation rules derived from a column definition
pub fn validation_rules(meta: &ModelMetadata, column: &ColumnInfo) -> Vec<String> {
    let mut rules = vec![if column.nullable { "nullable" } else { "required" }.to_string()];

    let data_type = column.data_type.trim().to_ascii_lowercase();
    let base = naming::base_type(&column.data_type);
    if data_type.starts_with("tinyint(1)") {
        rules.push("boolean".to_string());
    } else {
        match base.as_str() {
            "integer" | "bigint" | "smallint" | "tinyint" | "mediumint" => {
                rules.push("integer".to_string())
            }
            "decimal" | "float" | "double" | "real" => rules.push("numeric".to_string()),
            "boolean" => rules.push("boolean".to_string()),
            "varchar" | "char" => {
                rules.push("string".to_string());
                if let Some(max) = column.max_length.or_else(|| type_length(&data_type)) {
                    rules.push(format!("max:{}", max));
                }
            }
            "text" | "tinytext" | "mediumtext" | "longtext" => rules.push("string".to_string()),
            "date" | "datetime" | "timestamp" => rules.push("date".to_string()),
            "json" | "jsonb" => rules.push("array".to_string()),
            "uuid" => rules.push("uuid".to_string()),
            _ => {}
        }
    }

    if let Some(fk) = meta.foreign_key(&column.name) {
        rules.push(format!("exists:{},{}", fk.referenced_table, fk.referenced_column));
    }

    rules
}

fn type_length(data_type: &str) -> Option<i64> {
    let open = data_type.find('(')?;
    let close = data_type[open..].find(')')? + open;
    data_type[open + 1..close].trim().parse().ok()
}

#[derive(Debug, Serialize)]
struct ResourceContext {
    model: String,
    columns: Vec<String>,
}

/// JSON resource: `app/Http/Resources/{Model}Resource.php`
pub struct ResourceGenerator {
    templates: Arc<TemplateGenerator>,
}

impl ResourceGenerator {
    pub fn new(templates: Arc<TemplateGenerator>) -> Self {
        Self { templates }
    }
}

impl ArtifactGenerator for ResourceGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Resource
    }

    fn generate(&self, meta: &ModelMetadata, _options: &GenerationOptions) -> Result<Artifact> {
        let hidden = meta.hidden();
        let columns = meta
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|c| !hidden.contains(c))
            .map(String::from)
            .collect();

        let name = format!("{}Resource", meta.model);
        let context = ResourceContext {
            model: meta.model.clone(),
            columns,
        };

        Ok(Artifact {
            kind: ArtifactKind::Resource,
            relative_path: app_class_path("Http/Resources", &name),
            content: self.templates.render("resource", &context)?,
            name,
        })
    }
}

#[derive(Debug, Serialize)]
struct ObserverEvent {
    name: &'static str,
    model: String,
    variable: String,
}

#[derive(Debug, Serialize)]
struct ObserverContext {
    model: String,
    model_class: String,
    events: Vec<ObserverEvent>,
}

/// Model observer: `app/Observers/{Model}Observer.php`
pub struct ObserverGenerator {
    templates: Arc<TemplateGenerator>,
}

impl ObserverGenerator {
    pub fn new(templates: Arc<TemplateGenerator>) -> Self {
        Self { templates }
    }
}

/// Model events worth observing for this table
pub fn observer_events(meta: &ModelMetadata) -> Vec<&'static str> {
    let mut events = Vec::new();
    if meta.timestamps {
        events.push("created");
        events.push("updated");
    }
    events.push("deleted");
    if meta.soft_deletes {
        events.push("restored");
    }
    events.push("forceDeleted");
    events
}

impl ArtifactGenerator for ObserverGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Observer
    }

    fn generate(&self, meta: &ModelMetadata, _options: &GenerationOptions) -> Result<Artifact> {
        let variable = naming::camel(&meta.model);
        let events = observer_events(meta)
            .into_iter()
            .map(|name| ObserverEvent {
                name,
                model: meta.model.clone(),
                variable: variable.clone(),
            })
            .collect();

        let name = format!("{}Observer", meta.model);
        let context = ObserverContext {
            model: meta.model.clone(),
            model_class: meta.class_name(),
            events,
        };

        Ok(Artifact {
            kind: ArtifactKind::Observer,
            relative_path: app_class_path("Observers", &name),
            content: self.templates.render("observer", &context)?,
            name,
        })
    }
}

#[derive(Debug, Serialize)]
struct PolicyAbility {
    name: &'static str,
    description: &'static str,
    model: String,
    variable: String,
    check: String,
}

#[derive(Debug, Serialize)]
struct PolicyContext {
    model: String,
    variable: String,
    imports: Vec<String>,
    abilities: Vec<PolicyAbility>,
}

/// Authorization policy: `app/Policies/{Model}Policy.php`
pub struct PolicyGenerator {
    templates: Arc<TemplateGenerator>,
}

impl PolicyGenerator {
    pub fn new(templates: Arc<TemplateGenerator>) -> Self {
        Self { templates }
    }
}

impl ArtifactGenerator for PolicyGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Policy
    }

    fn generate(&self, meta: &ModelMetadata, _options: &GenerationOptions) -> Result<Artifact> {
        // `$user` is taken by the acting user
        let variable = match naming::camel(&meta.model) {
            v if v == "user" => "model".to_string(),
            v => v,
        };

        let user_class = format!("{}\\User", meta.namespace);
        let mut imports = vec![meta.class_name()];
        if !imports.contains(&user_class) {
            imports.push(user_class);
        }
        imports.sort();

        let check = if meta.has_column("user_id") {
            format!("$user->id === ${}->user_id", variable)
        } else {
            "true".to_string()
        };

        let abilities = [
            ("update", "update"),
            ("delete", "delete"),
            ("restore", "restore"),
            ("forceDelete", "permanently delete"),
        ]
        .into_iter()
        .map(|(name, description)| PolicyAbility {
            name,
            description,
            model: meta.model.clone(),
            variable: variable.clone(),
            check: check.clone(),
        })
        .collect();

        let name = format!("{}Policy", meta.model);
        let context = PolicyContext {
            model: meta.model.clone(),
            variable,
            imports,
            abilities,
        };

        Ok(Artifact {
            kind: ArtifactKind::Policy,
            relative_path: app_class_path("Policies", &name),
            content: self.templates.render("policy", &context)?,
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::NameResolver;
    use crate::types::{ForeignKey, IndexInfo, TableMetadata};

    fn post_meta() -> ModelMetadata {
        let table = TableMetadata::new("posts")
            .with_columns(vec![
                ColumnInfo::new("id", "bigint unsigned").auto_increment(),
                ColumnInfo::new("user_id", "bigint unsigned"),
                ColumnInfo::new("slug", "varchar(120)"),
                ColumnInfo::new("body", "text").nullable(),
                ColumnInfo::new("published", "tinyint(1)"),
                ColumnInfo::new("created_at", "timestamp").nullable(),
                ColumnInfo::new("updated_at", "timestamp").nullable(),
            ])
            .with_primary_key(&["id"])
            .with_foreign_key(ForeignKey::new("user_id", "users", "id"))
            .with_index(IndexInfo::new("posts_slug_unique", &["slug"]).unique());
        ModelMetadata::from_table(&table, &NameResolver::default(), "App\\Models").unwrap()
    }

    #[test]
    fn test_validation_rules() {
        let meta = post_meta();
        let rules = |name: &str| validation_rules(&meta, meta.column(name).unwrap()).join("|");

        assert_eq!(rules("user_id"), "required|integer|exists:users,id");
        assert_eq!(rules("slug"), "required|string|max:120");
        assert_eq!(rules("body"), "nullable|string");
        assert_eq!(rules("published"), "required|boolean");
    }

    #[test]
    fn test_observer_events() {
        let mut meta = post_meta();
        assert_eq!(observer_events(&meta), vec!["created", "updated", "deleted", "forceDeleted"]);

        meta.timestamps = false;
        meta.soft_deletes = true;
        assert_eq!(observer_events(&meta), vec!["deleted", "restored", "forceDeleted"]);
    }
}
