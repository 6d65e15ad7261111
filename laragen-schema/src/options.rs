//! Resolved options for one generation run

use crate::naming;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kinds of files the emitter can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Model,
    Controller,
    Resource,
    Observer,
    Policy,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Model,
        ArtifactKind::Controller,
        ArtifactKind::Resource,
        ArtifactKind::Observer,
        ArtifactKind::Policy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKind::Model => "model",
            ArtifactKind::Controller => "controller",
            ArtifactKind::Resource => "resource",
            ArtifactKind::Observer => "observer",
            ArtifactKind::Policy => "policy",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub models: bool,
    pub controllers: bool,
    pub resources: bool,
    pub observers: bool,
    pub policies: bool,

    pub force: bool,
    pub dry_run: bool,
    pub backup: bool,

    pub with_phpdoc: bool,
    pub with_inverse: bool,
    pub with_constraints: bool,
    pub validate_fk: bool,
    pub analyze_constraints: bool,
    pub show_recommendations: bool,
    pub detect_many_to_many: bool,
    pub detect_polymorphic: bool,

    /// Namespace of generated models, e.g. `App\Models`
    pub namespace: String,
    /// Directory the `App` namespace lives in, relative to the project
    pub target_path: String,

    pub connection: Option<String>,
    pub tables: Vec<String>,
    pub ignore: Vec<String>,

    pub custom_model_names: HashMap<String, String>,
    pub type_mappings: HashMap<String, String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            models: true,
            controllers: false,
            resources: false,
            observers: false,
            policies: false,
            force: false,
            dry_run: false,
            backup: false,
            with_phpdoc: true,
            with_inverse: true,
            with_constraints: false,
            validate_fk: false,
            analyze_constraints: false,
            show_recommendations: false,
            detect_many_to_many: true,
            detect_polymorphic: true,
            namespace: "App\\Models".to_string(),
            target_path: "app".to_string(),
            connection: None,
            tables: Vec::new(),
            ignore: Vec::new(),
            custom_model_names: HashMap::new(),
            type_mappings: HashMap::new(),
        }
    }
}

impl GenerationOptions {
    /// Enable every artifact kind
    pub fn all(mut self) -> Self {
        self.models = true;
        self.controllers = true;
        self.resources = true;
        self.observers = true;
        self.policies = true;
        self
    }

    pub fn is_enabled(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Model => self.models,
            ArtifactKind::Controller => self.controllers,
            ArtifactKind::Resource => self.resources,
            ArtifactKind::Observer => self.observers,
            ArtifactKind::Policy => self.policies,
        }
    }

    pub fn enabled_artifacts(&self) -> Vec<ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    /// Problems that make the options unusable
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !naming::is_valid_namespace(&naming::normalize_namespace(&self.namespace)) {
            errors.push(format!("Invalid namespace format: {}", self.namespace));
        }
        if self.tables.iter().any(|t| t.trim().is_empty()) {
            errors.push("Table names cannot be empty".to_string());
        }
        if self.target_path.trim().is_empty() {
            errors.push("Target path cannot be empty".to_string());
        }
        if self.enabled_artifacts().is_empty() {
            errors.push("At least one artifact type must be enabled".to_string());
        }

        errors
    }

    pub fn summary(&self) -> String {
        let artifacts: Vec<&str> = self.enabled_artifacts().iter().map(|k| k.name()).collect();
        let tables = if self.tables.is_empty() {
            "all tables".to_string()
        } else {
            self.tables.join(", ")
        };

        let mut flags = Vec::new();
        if self.force {
            flags.push("force");
        }
        if self.dry_run {
            flags.push("dry-run");
        }
        if self.backup {
            flags.push("backup");
        }

        let mut summary = format!(
            "{} for {} into {}",
            artifacts.join(", "),
            tables,
            naming::normalize_namespace(&self.namespace)
        );
        if !flags.is_empty() {
            summary.push_str(&format!(" ({})", flags.join(", ")));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = GenerationOptions::default();
        assert_eq!(options.enabled_artifacts(), vec![ArtifactKind::Model]);
        assert!(options.validate().is_empty());
        assert_eq!(options.summary(), "model for all tables into App\\Models");
    }

    #[test]
    fn test_all_and_validation() {
        let mut options = GenerationOptions::default().all();
        assert_eq!(options.enabled_artifacts().len(), 5);

        options.namespace = "app/models".to_string();
        options.tables = vec!["users".to_string(), " ".to_string()];
        let errors = options.validate();
        assert_eq!(errors.len(), 2);

        let none = GenerationOptions {
            models: false,
            ..Default::default()
        };
        assert_eq!(none.validate(), vec!["At least one artifact type must be enabled".to_string()]);
    }

    #[test]
    fn test_summary_flags() {
        let options = GenerationOptions {
            tables: vec!["users".to_string()],
            force: true,
            dry_run: true,
            ..Default::default()
        };
        assert_eq!(options.summary(), "model for users into App\\Models (force, dry-run)");
    }
}
