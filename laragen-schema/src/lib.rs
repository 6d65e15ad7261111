//! laragen schema - normalized database schema model and Eloquent code generation
//!
//! This crate holds everything that works on an already-inspected schema:
//!
//! - **Normalized schema model** shared by all four dialects
//! - **Relationship inference** (inverse relations, pivot tables, polymorphic pairs)
//! - **Constraint analysis** with recommendations
//! - **Template-based generation** of models, controllers, resources, observers and policies
//!
//! # Example
//!
//! ```rust
//! use laragen_schema::{
//!     ColumnInfo, DatabaseSchema, Driver, ForeignKey, RelationshipDetector, TableMetadata,
//! };
//!
//! let schema = DatabaseSchema::new(Driver::Sqlite, "main")
//!     .with_table(
//!         TableMetadata::new("users")
//!             .with_columns(vec![ColumnInfo::new("id", "integer").auto_increment()])
//!             .with_primary_key(&["id"]),
//!     )
//!     .with_table(
//!         TableMetadata::new("posts")
//!             .with_columns(vec![
//!                 ColumnInfo::new("id", "integer").auto_increment(),
//!                 ColumnInfo::new("user_id", "integer"),
//!             ])
//!             .with_primary_key(&["id"])
//!             .with_foreign_key(ForeignKey::new("user_id", "users", "id")),
//!     );
//!
//! let detector = RelationshipDetector::new(&schema);
//! let inverse = detector.inverse_relationships("users");
//! assert_eq!(inverse[0].method, "posts");
//! ```

use thiserror::Error;

pub mod analyzer;
pub mod metadata;
pub mod naming;
pub mod options;
pub mod relations;
pub mod types;

#[cfg(feature = "codegen")]
pub mod codegen;

pub use analyzer::ConstraintAnalyzer;
pub use metadata::ModelMetadata;
pub use naming::NameResolver;
pub use options::{ArtifactKind, GenerationOptions};
pub use relations::RelationshipDetector;
pub use types::*;

/// Schema system errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Column not found: {table}.{column}")]
    ColumnNotFound { table: String, column: String },

    #[error("Invalid class name '{name}' derived from table '{table}'")]
    InvalidName { table: String, name: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Code generation error: {0}")]
    CodeGen(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "codegen")]
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),
}

pub type Result<T> = std::result::Result<T, SchemaError>;

/// Validation result containing all errors and warnings
///
/// Entries are keyed by the option they concern and render as `[key] message`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create a new empty validation result
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add a validation error for a key
    pub fn add_error(&mut self, key: &str, error: impl AsRef<str>) {
        self.errors.push(format!("[{}] {}", key, error.as_ref()));
    }

    /// Add a validation warning for a key
    pub fn add_warning(&mut self, key: &str, warning: impl AsRef<str>) {
        self.warnings.push(format!("[{}] {}", key, warning.as_ref()));
    }

    /// Check if there are any validation errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Check if there are any validation warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Get total count of issues (errors + warnings)
    pub fn total_issues(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }

    /// Convert to a single error if there are validation errors
    pub fn into_result(self) -> Result<()> {
        if self.has_errors() {
            Err(SchemaError::Validation(format!(
                "validation failed with {} error(s):\n{}",
                self.errors.len(),
                self.errors.join("\n")
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_result_keys() {
        let mut result = ValidationResult::new();
        result.add_error("namespace", "Invalid namespace format");
        result.add_warning("type_mappings.money", "Unknown PHP type 'money'");

        assert!(result.has_errors());
        assert_eq!(result.total_issues(), 2);
        assert_eq!(result.errors[0], "[namespace] Invalid namespace format");

        let err = result.into_result().unwrap_err().to_string();
        assert!(err.contains("1 error(s)"));
    }
}
