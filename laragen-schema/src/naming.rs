//! Naming conventions: inflection, class names, PHP types and casts

use heck::{ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Columns managed by the framework itself
pub const TIMESTAMP_COLUMNS: &[&str] = &["created_at", "updated_at", "deleted_at"];

/// Framework bookkeeping tables that never get models
pub const DEFAULT_IGNORED_TABLES: &[&str] = &[
    "migrations",
    "password_resets",
    "password_reset_tokens",
    "failed_jobs",
    "personal_access_tokens",
    "jobs",
    "job_batches",
    "cache",
    "cache_locks",
    "sessions",
];

/// Name fragments that mark a column as hidden from serialization
pub const SENSITIVE_COLUMN_PATTERNS: &[&str] = &["password", "secret", "token", "api_key"];

/// PHP types accepted in type mappings
pub const PHP_TYPES: &[&str] = &["int", "float", "string", "bool", "array", "mixed"];

static CLASS_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_\x7f-\xff][a-zA-Z0-9_\x7f-\xff]*$").expect("valid regex"));

static NAMESPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z][A-Za-z0-9_]*(\\[A-Z][A-Za-z0-9_]*)*$").expect("valid regex")
});

static MODEL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9]*$").expect("valid regex"));

pub fn snake(input: &str) -> String {
    input.to_snake_case()
}

pub fn camel(input: &str) -> String {
    input.to_lower_camel_case()
}

pub fn studly(input: &str) -> String {
    input.to_upper_camel_case()
}

pub fn plural(word: &str) -> String {
    inflect(word, |w| pluralizer::pluralize(w, 2, false))
}

pub fn singular(word: &str) -> String {
    inflect(word, |w| pluralizer::pluralize(w, 1, false))
}

/// Inflect the last word of a compound name, keeping its casing style
fn inflect(word: &str, f: impl Fn(&str) -> String) -> String {
    if word.is_empty() {
        return String::new();
    }

    let snake = word.to_snake_case();
    let inflected = match snake.rsplit_once('_') {
        Some((head, last)) => format!("{}_{}", head, f(last)),
        None => f(&snake),
    };

    if word.starts_with(|c: char| c.is_uppercase()) {
        inflected.to_upper_camel_case()
    } else if word == snake {
        inflected
    } else {
        inflected.to_lower_camel_case()
    }
}

/// `post_comments` -> `PostComment`
pub fn table_to_model_name(table: &str) -> String {
    studly(&singular(table))
}

/// Relation method name for a belongs-to foreign key column
pub fn foreign_key_to_relation_name(column: &str) -> Option<String> {
    column
        .strip_suffix("_id")
        .filter(|stem| !stem.is_empty())
        .map(camel)
}

/// Has-many method name for a related model
pub fn has_many_method_name(model: &str) -> String {
    camel(&plural(model))
}

pub fn has_one_method_name(model: &str) -> String {
    camel(model)
}

pub fn is_timestamp_column(column: &str) -> bool {
    TIMESTAMP_COLUMNS.contains(&column)
}

pub fn is_sensitive_column(column: &str) -> bool {
    let lower = column.to_ascii_lowercase();
    SENSITIVE_COLUMN_PATTERNS.iter().any(|p| lower.contains(p))
}

pub fn is_valid_class_name(name: &str) -> bool {
    CLASS_NAME.is_match(name)
}

/// Stricter check applied to generated model names
pub fn is_valid_model_name(name: &str) -> bool {
    MODEL_NAME.is_match(name)
}

pub fn is_valid_namespace(namespace: &str) -> bool {
    NAMESPACE.is_match(namespace)
}

/// Trim surrounding separators: `\App\Models\` -> `App\Models`
pub fn normalize_namespace(namespace: &str) -> String {
    namespace.trim_matches('\\').to_string()
}

/// Directory of a namespace relative to the target path.
///
/// `App\Models` under `app` maps to `Models` since `app/` already is the `App` root.
pub fn namespace_to_path(namespace: &str, target_path: &str) -> String {
    let path = normalize_namespace(namespace).replace('\\', "/");
    if target_path.trim_matches('/') == "app" {
        if path == "App" {
            return String::new();
        }
        if let Some(rest) = path.strip_prefix("App/") {
            return rest.to_string();
        }
    }
    path
}

/// Whether a table is excluded by name or by pattern
pub fn should_ignore_table(table: &str, ignored: &[String], patterns: &[Regex]) -> bool {
    ignored.iter().any(|t| t == table) || patterns.iter().any(|p| p.is_match(table))
}

/// Lowercased type without parameters, with dialect spellings folded together
pub fn base_type(db_type: &str) -> String {
    let lower = db_type.trim().to_ascii_lowercase();
    let stripped = match lower.find('(') {
        Some(pos) => {
            let tail = lower[pos..].find(')').map(|end| &lower[pos + end + 1..]).unwrap_or("");
            format!("{}{}", &lower[..pos], tail)
        }
        None => lower,
    };
    let stripped = stripped
        .replace(" unsigned", "")
        .replace(" zerofill", "")
        .trim()
        .to_string();

    let folded = match stripped.as_str() {
        "character varying" | "nvarchar" | "varchar2" => "varchar",
        "character" | "nchar" | "bpchar" => "char",
        "ntext" | "citext" => "text",
        "int2" => "smallint",
        "int4" | "int" | "serial" => "integer",
        "int8" | "bigserial" => "bigint",
        "smallserial" => "smallint",
        "float4" => "real",
        "float8" | "double precision" => "double",
        "numeric" | "money" | "smallmoney" => "decimal",
        "bool" | "bit" => "boolean",
        "timestamp without time zone" | "timestamp with time zone" | "timestamptz" => "timestamp",
        "datetime2" | "smalldatetime" | "datetimeoffset" => "datetime",
        "time without time zone" | "time with time zone" | "timetz" => "time",
        "uniqueidentifier" => "uuid",
        other => other,
    };
    folded.to_string()
}

/// PHP type for a column's docblock, honouring user type mappings
pub fn php_type(db_type: &str, overrides: &HashMap<String, String>) -> String {
    let base = base_type(db_type);
    if let Some(mapped) = overrides.get(&base).or_else(|| overrides.get(db_type)) {
        return mapped.clone();
    }

    if db_type.trim().eq_ignore_ascii_case("tinyint(1)") {
        return "bool".to_string();
    }

    match base.as_str() {
        "integer" | "bigint" | "smallint" | "tinyint" | "mediumint" | "year" => "int",
        "decimal" | "float" | "double" | "real" => "float",
        "boolean" => "bool",
        "date" | "datetime" | "timestamp" | "time" => "string",
        "varchar" | "char" | "text" | "tinytext" | "mediumtext" | "longtext" | "enum" | "set"
        | "uuid" | "xml" | "inet" | "cidr" | "macaddr" => "string",
        "json" | "jsonb" => "array",
        _ => "mixed",
    }
    .to_string()
}

/// Eloquent cast for a column, if one applies
pub fn cast_type(column: &str, db_type: &str) -> Option<String> {
    if column == "email_verified_at" {
        return Some("datetime".to_string());
    }
    if is_timestamp_column(column) {
        return None;
    }

    let normalized = db_type.trim().to_ascii_lowercase();
    if normalized.starts_with("tinyint(1)") {
        return Some("boolean".to_string());
    }

    let cast = match base_type(db_type).as_str() {
        "boolean" => "boolean".to_string(),
        "integer" | "bigint" | "smallint" | "tinyint" | "mediumint" => "integer".to_string(),
        "decimal" => match decimal_scale(&normalized) {
            Some(scale) => format!("decimal:{}", scale),
            None => "decimal:2".to_string(),
        },
        "float" | "real" => "float".to_string(),
        "double" => "double".to_string(),
        "date" => "date".to_string(),
        "datetime" | "timestamp" => "datetime".to_string(),
        "json" | "jsonb" => "array".to_string(),
        _ => return None,
    };
    Some(cast)
}

fn decimal_scale(db_type: &str) -> Option<u32> {
    let open = db_type.find('(')?;
    let close = db_type[open..].find(')')? + open;
    let params = &db_type[open + 1..close];
    params.split(',').nth(1)?.trim().parse().ok()
}

/// Resolves model class names, applying configured overrides first
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    custom_model_names: HashMap<String, String>,
}

impl NameResolver {
    pub fn new(custom_model_names: HashMap<String, String>) -> Self {
        Self { custom_model_names }
    }

    pub fn model_name(&self, table: &str) -> String {
        self.custom_model_names
            .get(table)
            .cloned()
            .unwrap_or_else(|| table_to_model_name(table))
    }
}
