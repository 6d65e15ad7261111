//! One generation run: inspect, detect relations, analyze, render, write

use crate::inspector::DatabaseIntrospector;
use crate::writer::{FileWriter, WriteOutcome, WriteStatus};
use anyhow::{Context, Result};
use laragen_schema::analyzer::{ConstraintSummary, Recommendation};
use laragen_schema::codegen::{
    Artifact, GenerationOrchestrator, ModelArtifacts, TemplateGenerator, BUILTIN_TEMPLATES,
};
use laragen_schema::naming;
use laragen_schema::relations::ForeignKeyIssue;
use laragen_schema::{
    ArtifactKind, ConstraintAnalyzer, DatabaseSchema, Driver, GenerationOptions, ModelMetadata,
    NameResolver, RelationshipDetector,
};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Built-in templates with `{name}.php.hbs` overrides from `dir` applied
pub fn load_templates(dir: Option<&Path>) -> Result<TemplateGenerator> {
    let mut templates = TemplateGenerator::with_builtin_templates()?;

    let Some(dir) = dir else {
        return Ok(templates);
    };
    if !dir.is_dir() {
        log::warn!("Templates directory {} does not exist", dir.display());
        return Ok(templates);
    }

    for (name, _) in BUILTIN_TEMPLATES {
        let path = dir.join(format!("{}.php.hbs", name));
        if !path.exists() {
            continue;
        }
        let source = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        templates
            .register_template(name, &source)
            .with_context(|| format!("Invalid template {}", path.display()))?;
        log::info!("Using custom {} template from {}", name, path.display());
    }

    Ok(templates)
}

/// Tables a run works on, after ignore rules and `--tables`
#[derive(Debug, Default, PartialEq)]
pub struct TableSelection {
    /// Every table not ignored, in catalog order
    pub available: Vec<String>,
    /// Tables to generate for
    pub targets: Vec<String>,
    /// Requested tables the database does not have
    pub missing: Vec<String>,
    /// Requested tables dropped by the ignore rules
    pub ignored: Vec<String>,
}

pub fn select_tables(
    tables: &[String],
    options: &GenerationOptions,
    patterns: &[Regex],
) -> Result<TableSelection> {
    let mut selection = TableSelection {
        available: tables
            .iter()
            .filter(|t| !naming::should_ignore_table(t, &options.ignore, patterns))
            .cloned()
            .collect(),
        ..Default::default()
    };

    if options.tables.is_empty() {
        selection.targets = selection.available.clone();
        if selection.targets.is_empty() {
            anyhow::bail!("No tables to generate: the database has no tables outside the ignore list");
        }
        return Ok(selection);
    }

    for requested in &options.tables {
        let requested = requested.trim();
        if selection.targets.iter().any(|t| t == requested) {
            continue;
        }
        if selection.available.iter().any(|t| t == requested) {
            selection.targets.push(requested.to_string());
        } else if tables.iter().any(|t| t == requested) {
            selection.ignored.push(requested.to_string());
        } else {
            selection.missing.push(requested.to_string());
        }
    }

    if selection.targets.is_empty() {
        anyhow::bail!(
            "None of the requested tables can be generated: {}",
            options.tables.join(", ")
        );
    }
    Ok(selection)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Generated,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Created,
    Overwritten,
    Skipped,
    DryRun,
    Failed,
}

impl ArtifactStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactStatus::Created => "created",
            ArtifactStatus::Overwritten => "overwritten",
            ArtifactStatus::Skipped => "skipped",
            ArtifactStatus::DryRun => "dry-run",
            ArtifactStatus::Failed => "failed",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ArtifactStatus::Created => "✅",
            ArtifactStatus::Overwritten => "♻️ ",
            ArtifactStatus::Skipped => "⏭️ ",
            ArtifactStatus::DryRun => "📝",
            ArtifactStatus::Failed => "❌",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactOutcome {
    pub kind: ArtifactKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub status: ArtifactStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
}

impl ArtifactOutcome {
    fn written(artifact: &Artifact, outcome: WriteOutcome) -> Self {
        let (status, message) = match outcome.status {
            WriteStatus::Created => (ArtifactStatus::Created, None),
            WriteStatus::Overwritten => (ArtifactStatus::Overwritten, None),
            WriteStatus::Skipped(reason) => (ArtifactStatus::Skipped, Some(reason)),
            WriteStatus::DryRun => (ArtifactStatus::DryRun, None),
        };
        Self {
            kind: artifact.kind,
            name: artifact.name.clone(),
            path: Some(outcome.relative_path),
            status,
            message,
            backup_path: outcome.backup_path,
        }
    }

    fn failed(kind: ArtifactKind, name: &str, path: Option<PathBuf>, message: String) -> Self {
        Self {
            kind,
            name: name.to_string(),
            path,
            status: ArtifactStatus::Failed,
            message: Some(message),
            backup_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub status: TableStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub artifacts: Vec<ArtifactOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<Recommendation>,
}

impl TableReport {
    fn skipped(table: &str, message: impl Into<String>) -> Self {
        Self::without_artifacts(table, TableStatus::Skipped, message.into())
    }

    fn failed(table: &str, message: impl Into<String>) -> Self {
        Self::without_artifacts(table, TableStatus::Failed, message.into())
    }

    fn without_artifacts(table: &str, status: TableStatus, message: String) -> Self {
        Self {
            table: table.to_string(),
            model: None,
            status,
            message: Some(message),
            artifacts: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// Everything a run did, per table
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub driver: Driver,
    pub database: String,
    pub dry_run: bool,
    pub tables: Vec<TableReport>,
    pub foreign_key_issues: Vec<ForeignKeyIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint_summary: Option<ConstraintSummary>,
}

impl GenerationReport {
    fn new(driver: Driver, database: String, dry_run: bool) -> Self {
        Self {
            driver,
            database,
            dry_run,
            tables: Vec::new(),
            foreign_key_issues: Vec::new(),
            constraint_summary: None,
        }
    }

    /// Number of artifacts that ended with `status`
    pub fn count(&self, status: ArtifactStatus) -> usize {
        self.tables
            .iter()
            .flat_map(|t| &t.artifacts)
            .filter(|a| a.status == status)
            .count()
    }

    pub fn tables_with_status(&self, status: TableStatus) -> usize {
        self.tables.iter().filter(|t| t.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.tables_with_status(TableStatus::Failed) > 0 || self.count(ArtifactStatus::Failed) > 0
    }

    /// Order table entries the way the catalog listed them; unknown tables go last
    fn sort_tables(&mut self, order: &[String]) {
        self.tables.sort_by_key(|report| {
            order
                .iter()
                .position(|t| *t == report.table)
                .unwrap_or(usize::MAX)
        });
    }
}

pub struct Pipeline {
    options: GenerationOptions,
    ignore_patterns: Vec<Regex>,
    templates: Arc<TemplateGenerator>,
    writer: FileWriter,
}

impl Pipeline {
    pub fn new(
        options: GenerationOptions,
        ignore_patterns: Vec<Regex>,
        templates: TemplateGenerator,
        project_path: &Path,
    ) -> Self {
        let writer = FileWriter::new(project_path, options.force, options.dry_run, options.backup);
        Self {
            options,
            ignore_patterns,
            templates: Arc::new(templates),
            writer,
        }
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub async fn run(&self, introspector: &dyn DatabaseIntrospector) -> Result<GenerationReport> {
        let options = &self.options;
        let driver = introspector.driver();
        let database = introspector.database_name().await?;
        log::info!("Inspecting {} database '{}'", driver, database);

        let tables = introspector.list_tables().await?;
        let selection = select_tables(&tables, options, &self.ignore_patterns)?;
        log::debug!(
            "{} table(s) selected, {} available after ignore rules",
            selection.targets.len(),
            selection.available.len()
        );

        let mut report = GenerationReport::new(driver, database.clone(), options.dry_run);
        for table in &selection.missing {
            report.tables.push(TableReport::failed(table, "Table not found"));
        }
        for table in &selection.ignored {
            report.tables.push(TableReport::skipped(table, "Table is in the ignore list"));
        }

        // inverse and pivot detection and FK validation need every table, not only the targets
        let describe = if options.with_inverse || options.detect_many_to_many || options.validate_fk
        {
            &selection.available
        } else {
            &selection.targets
        };

        let mut schema = DatabaseSchema::new(driver, database);
        for table in describe {
            match introspector.describe_table(table).await {
                Ok(meta) => schema.add_table(meta),
                Err(e) => {
                    log::warn!("Failed to describe table {}: {:#}", table, e);
                    if selection.targets.contains(table) {
                        report.tables.push(TableReport::failed(table, format!("{:#}", e)));
                    }
                }
            }
        }

        let names = NameResolver::new(options.custom_model_names.clone());
        let detector = RelationshipDetector::with_names(&schema, names.clone());
        if options.validate_fk {
            report.foreign_key_issues = detector.validate_foreign_keys();
            for issue in &report.foreign_key_issues {
                log::warn!("{}", issue.message);
            }
        }

        let mut analyzer = ConstraintAnalyzer::new(&schema);
        let mut models = Vec::with_capacity(selection.targets.len());
        for table in &selection.targets {
            let Some(meta) = schema.table(table) else {
                continue;
            };
            let analysis = analyzer.analyze_table(table)?.clone();

            match ModelMetadata::from_table(meta, &names, &options.namespace) {
                Ok(model) => models.push(
                    model
                        .with_relations(
                            &detector,
                            options.with_inverse,
                            options.detect_many_to_many,
                            options.detect_polymorphic,
                        )
                        .with_analysis(analysis),
                ),
                Err(e) => {
                    log::warn!("Skipping table {}: {}", table, e);
                    report.tables.push(TableReport::skipped(table, e.to_string()));
                }
            }
        }

        if options.analyze_constraints {
            let analyzed: Vec<String> = models.iter().map(|m| m.table.clone()).collect();
            report.constraint_summary = Some(analyzer.constraint_summary(&analyzed)?);
        }

        let orchestrator = GenerationOrchestrator::with_defaults(self.templates.clone());
        for (meta, generated) in models.iter().zip(orchestrator.generate(&models, options)) {
            let recommendations = match (&meta.analysis, options.show_recommendations) {
                (Some(analysis), true) => analysis.recommendations.clone(),
                _ => Vec::new(),
            };
            report.tables.push(self.write_artifacts(generated, recommendations));
        }

        report.sort_tables(&tables);
        Ok(report)
    }

    fn write_artifacts(
        &self,
        generated: ModelArtifacts,
        recommendations: Vec<Recommendation>,
    ) -> TableReport {
        let mut artifacts = Vec::with_capacity(generated.artifacts.len());

        for (kind, result) in generated.artifacts {
            let outcome = match result {
                Ok(artifact) => match self.writer.write(&artifact.relative_path, &artifact.content) {
                    Ok(written) => {
                        log::debug!("{} {}", written.status.label(), written.path.display());
                        ArtifactOutcome::written(&artifact, written)
                    }
                    Err(e) => {
                        log::warn!("Failed to write {}: {:#}", artifact.relative_path.display(), e);
                        ArtifactOutcome::failed(
                            kind,
                            &artifact.name,
                            Some(artifact.relative_path.clone()),
                            format!("{:#}", e),
                        )
                    }
                },
                Err(e) => ArtifactOutcome::failed(kind, &generated.model, None, e.to_string()),
            };
            artifacts.push(outcome);
        }

        let status = if artifacts.iter().all(|a| a.status == ArtifactStatus::Failed) {
            TableStatus::Failed
        } else {
            TableStatus::Generated
        };

        TableReport {
            table: generated.table,
            model: Some(generated.model),
            status,
            message: None,
            artifacts,
            recommendations,
        }
    }
}
