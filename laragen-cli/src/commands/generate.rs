//! `laragen generate`: models and companion classes from the database schema

use super::ConnectionArgs;
use crate::config::LaragenConfig;
use crate::inspector::mask_database_url;
use crate::pipeline::{self, ArtifactStatus, GenerationReport, Pipeline, TableStatus};
use anyhow::Result;
use clap::{Args, ValueEnum};
use laragen_schema::GenerationOptions;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Only generate these tables (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Additional tables to ignore (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub ignore: Vec<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Namespace of generated models
    #[arg(long)]
    pub namespace: Option<String>,

    /// Directory the App namespace lives in
    #[arg(long)]
    pub path: Option<String>,

    /// Generate API resource controllers
    #[arg(long)]
    pub controllers: bool,

    /// Generate JSON API resources
    #[arg(long)]
    pub resources: bool,

    /// Generate model observers
    #[arg(long)]
    pub observers: bool,

    /// Generate authorization policies
    #[arg(long)]
    pub policies: bool,

    /// Generate every artifact type
    #[arg(long)]
    pub all: bool,

    /// Skip the models themselves
    #[arg(long)]
    pub no_models: bool,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,

    /// Show what would be written without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Keep a timestamped copy of every overwritten file
    #[arg(long)]
    pub backup: bool,

    /// Leave out the @property docblock
    #[arg(long)]
    pub no_phpdoc: bool,

    /// Leave out hasMany / hasOne relations to child tables
    #[arg(long)]
    pub no_inverse: bool,

    /// Add a database constraints comment to each model
    #[arg(long)]
    pub with_constraints: bool,

    /// Report foreign keys pointing at missing tables or columns
    #[arg(long)]
    pub validate_fk: bool,

    /// Print a constraint summary for the generated tables
    #[arg(long)]
    pub analyze_constraints: bool,

    /// Print schema recommendations per table
    #[arg(long)]
    pub show_recommendations: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

impl GenerateArgs {
    /// Lay the command-line flags over options built from configuration
    pub fn apply(&self, mut options: GenerationOptions) -> GenerationOptions {
        if self.all {
            options = options.all();
        }
        options.controllers |= self.controllers;
        options.resources |= self.resources;
        options.observers |= self.observers;
        options.policies |= self.policies;
        if self.no_models {
            options.models = false;
        }

        options.force = self.force;
        options.dry_run = self.dry_run;
        options.backup = self.backup;

        if self.no_phpdoc {
            options.with_phpdoc = false;
        }
        if self.no_inverse {
            options.with_inverse = false;
        }
        options.with_constraints |= self.with_constraints;
        options.validate_fk |= self.validate_fk;
        options.analyze_constraints |= self.analyze_constraints;
        options.show_recommendations |= self.show_recommendations;

        if let Some(namespace) = &self.namespace {
            options.namespace = namespace.clone();
        }
        if let Some(path) = &self.path {
            options.target_path = path.clone();
        }
        if let Some(connection) = &self.connection.connection {
            options.connection = Some(connection.clone());
        }

        options.tables = self.tables.iter().map(|t| t.trim().to_string()).collect();
        for table in &self.ignore {
            let table = table.trim();
            if !table.is_empty() && !options.ignore.iter().any(|t| t == table) {
                options.ignore.push(table.to_string());
            }
        }

        options
    }
}

pub async fn run(args: GenerateArgs, project_path: &Path, config: &LaragenConfig) -> Result<()> {
    let options = args.apply(config.to_options());
    let errors = options.validate();
    if !errors.is_empty() {
        anyhow::bail!("Invalid generation options:\n  {}", errors.join("\n  "));
    }

    let text = args.format == ReportFormat::Text;
    let quiet = config.output.is_quiet();
    let connection = args.connection.resolve(config)?;

    if text && !quiet {
        println!("🚀 Generating Laravel code from database...");
        println!("📂 Project: {}", project_path.display());
        println!("📍 Database: {}", mask_database_url(&connection.url));
        println!("⚙️  {}", options.summary());
        if options.dry_run {
            println!("📝 Dry run: no files will be written");
        }
        println!();
    }

    let introspector = super::connect(&connection).await?;
    let templates = pipeline::load_templates(config.templates_path(project_path).as_deref())?;
    let pipeline = Pipeline::new(options, config.ignore_patterns(), templates, project_path);
    let report = pipeline.run(introspector.as_ref()).await?;

    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        ReportFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
        ReportFormat::Text => print_report(&report, quiet, config.output.is_verbose()),
    }

    Ok(())
}

fn print_report(report: &GenerationReport, quiet: bool, verbose: bool) {
    for table in &report.tables {
        let failed = table.status == TableStatus::Failed
            || table.artifacts.iter().any(|a| a.status == ArtifactStatus::Failed);
        if quiet && !failed {
            continue;
        }

        match (&table.model, table.status) {
            (Some(model), _) => println!("📋 {} → {}", table.table, model),
            (None, TableStatus::Skipped) => println!("⏭️  {}", table.table),
            (None, _) => println!("❌ {}", table.table),
        }
        if let Some(message) = &table.message {
            println!("   {}", message);
        }

        for artifact in &table.artifacts {
            let target = artifact
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| artifact.name.clone());
            let detail = artifact
                .message
                .as_ref()
                .map(|m| format!(" ({})", m))
                .unwrap_or_default();
            println!(
                "   {} {:<10} {}{}",
                artifact.status.icon(),
                artifact.kind.name(),
                target,
                detail
            );
            if let (Some(backup), true) = (&artifact.backup_path, verbose) {
                println!("      📦 backup: {}", backup.display());
            }
        }

        for recommendation in &table.recommendations {
            println!(
                "   💡 [{}] {}",
                recommendation.severity.label(),
                recommendation.message
            );
            if verbose {
                println!("      {}", recommendation.suggestion);
            }
        }
    }

    if !report.foreign_key_issues.is_empty() {
        println!();
        println!("⚠️  Foreign key issues:");
        for issue in &report.foreign_key_issues {
            println!("  - {}", issue.message);
        }
    }

    if let Some(summary) = &report.constraint_summary {
        println!();
        println!("📈 Constraint summary:");
        println!("  Tables:             {}", summary.total_tables);
        println!(
            "  With primary key:   {} (without: {})",
            summary.tables_with_primary_key, summary.tables_without_primary_key
        );
        println!("  Foreign keys:       {}", summary.total_foreign_keys);
        println!("  Indexes:            {}", summary.total_indexes);
        println!("  Unique constraints: {}", summary.total_unique_constraints);
        println!("  Check constraints:  {}", summary.total_check_constraints);
        if !summary.tables_with_issues.is_empty() {
            println!("  Tables with issues: {}", summary.tables_with_issues.join(", "));
        }
    }

    println!();
    let done = if report.dry_run {
        format!("{} file(s) would be written", report.count(ArtifactStatus::DryRun))
    } else {
        format!(
            "{} created, {} overwritten",
            report.count(ArtifactStatus::Created),
            report.count(ArtifactStatus::Overwritten)
        )
    };
    println!(
        "{} {}, {} skipped, {} failed",
        if report.has_failures() { "⚠️ " } else { "🎉" },
        done,
        report.count(ArtifactStatus::Skipped),
        report.count(ArtifactStatus::Failed) + report.tables_with_status(TableStatus::Failed)
    );
}
