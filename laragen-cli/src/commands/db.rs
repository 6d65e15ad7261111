//! Database introspection commands

use super::ConnectionArgs;
use crate::config::LaragenConfig;
use crate::inspector::{mask_database_url, DatabaseIntrospector};
use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use laragen_schema::analyzer::TableAnalysis;
use laragen_schema::naming;
use laragen_schema::relations::RelationshipSummary;
use laragen_schema::{
    ConstraintAnalyzer, DatabaseSchema, NameResolver, RelationshipDetector, TableMetadata,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Debug, Args)]
pub struct DbCommand {
    #[command(subcommand)]
    pub action: DbAction,
}

#[derive(Debug, Subcommand)]
pub enum DbAction {
    /// Test database connection
    TestConnection {
        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// List all tables in the database
    ListTables {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Describe table structure
    Describe {
        /// Table name to describe
        table_name: String,

        #[command(flatten)]
        connection: ConnectionArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Show the relations inferred for a table
    Relationships {
        /// Table name to inspect
        table_name: String,

        #[command(flatten)]
        connection: ConnectionArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Analyze keys, indexes and constraints
    Analyze {
        /// Only analyze these tables (comma separated)
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,

        #[command(flatten)]
        connection: ConnectionArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

impl DbCommand {
    pub async fn execute(self, config: &LaragenConfig) -> Result<()> {
        match self.action {
            DbAction::TestConnection { connection } => test_connection(config, connection).await,
            DbAction::ListTables { connection, format } => {
                list_tables(config, connection, format).await
            }
            DbAction::Describe {
                table_name,
                connection,
                format,
            } => describe_table(config, connection, table_name, format).await,
            DbAction::Relationships {
                table_name,
                connection,
                format,
            } => relationships(config, connection, table_name, format).await,
            DbAction::Analyze {
                tables,
                connection,
                format,
            } => analyze(config, connection, tables, format).await,
        }
    }
}

fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Table => return Ok(false),
    }
    Ok(true)
}

/// Snapshot of every table outside the ignore rules
async fn load_schema(
    introspector: &dyn DatabaseIntrospector,
    config: &LaragenConfig,
) -> Result<DatabaseSchema> {
    let patterns = config.ignore_patterns();
    let mut schema = DatabaseSchema::new(
        introspector.driver(),
        introspector.database_name().await?,
    );

    for table in introspector.list_tables().await? {
        if naming::should_ignore_table(&table, &config.ignore_tables, &patterns) {
            continue;
        }
        match introspector.describe_table(&table).await {
            Ok(meta) => schema.add_table(meta),
            Err(e) => log::warn!("Failed to describe table {}: {:#}", table, e),
        }
    }
    Ok(schema)
}

/// Test database connection
async fn test_connection(config: &LaragenConfig, connection: ConnectionArgs) -> Result<()> {
    println!("🔌 Testing database connection...");

    let resolved = connection.resolve(config)?;
    if let Some(name) = &resolved.name {
        println!("🔗 Connection: {}", name);
    }
    println!("📍 Connecting to: {}", mask_database_url(&resolved.url));

    let introspector = super::connect(&resolved).await?;
    let db_name = introspector.database_name().await?;

    println!("✅ Connection successful!");
    println!("📊 Database: {} ({})", db_name, introspector.driver());

    let tables = introspector.list_tables().await?;
    println!("📋 Tables found: {}", tables.len());

    Ok(())
}

#[derive(Debug, Serialize)]
struct TableListing {
    name: String,
    ignored: bool,
}

/// List all tables in the database
async fn list_tables(
    config: &LaragenConfig,
    connection: ConnectionArgs,
    format: OutputFormat,
) -> Result<()> {
    let introspector = super::connect(&connection.resolve(config)?).await?;
    let patterns = config.ignore_patterns();

    let tables: Vec<TableListing> = introspector
        .list_tables()
        .await?
        .into_iter()
        .map(|name| TableListing {
            ignored: naming::should_ignore_table(&name, &config.ignore_tables, &patterns),
            name,
        })
        .collect();

    if print_structured(&tables, format)? {
        return Ok(());
    }

    if tables.is_empty() {
        println!("No tables found in the database.");
        return Ok(());
    }

    println!("📋 Tables in database:\n");
    println!("{:<40} {:<20}", "Table Name", "Model");
    println!("{:-<60}", "");

    let names = NameResolver::new(config.to_options().custom_model_names);
    for table in &tables {
        let model = if table.ignored {
            "(ignored)".to_string()
        } else {
            names.model_name(&table.name)
        };
        println!("{:<40} {:<20}", table.name, model);
    }

    Ok(())
}

/// Describe table structure
async fn describe_table(
    config: &LaragenConfig,
    connection: ConnectionArgs,
    table_name: String,
    format: OutputFormat,
) -> Result<()> {
    let introspector = super::connect(&connection.resolve(config)?).await?;
    let table = introspector.describe_table(&table_name).await?;

    if print_structured(&table, format)? {
        return Ok(());
    }
    print_table(&table);
    Ok(())
}

fn print_table(table: &TableMetadata) {
    println!("📊 Table: {}\n", table.name);

    if let Some(comment) = &table.comment {
        println!("📝 Description: {}\n", comment);
    }

    println!("📋 Columns:");
    println!(
        "{:<25} {:<25} {:<10} {:<6} {:<15} {:<15}",
        "Column", "Type", "Nullable", "Key", "Default", "Extra"
    );
    println!("{:-<100}", "");

    for column in &table.columns {
        let key = if column.key.is_empty() && table.foreign_key(&column.name).is_some() {
            "FK"
        } else {
            column.key.as_str()
        };
        println!(
            "{:<25} {:<25} {:<10} {:<6} {:<15} {:<15}",
            column.name,
            column.data_type,
            if column.nullable { "YES" } else { "NO" },
            key,
            column.default.as_deref().unwrap_or("-"),
            column.extra
        );
    }

    if !table.indexes.is_empty() {
        println!("\n📑 Indexes:");
        for index in &table.indexes {
            let kind = if index.primary {
                "PRIMARY"
            } else if index.unique {
                "UNIQUE"
            } else {
                ""
            };
            let columns: Vec<String> = index
                .columns
                .iter()
                .map(|c| match c.length {
                    Some(length) => format!("{}({}) {}", c.name, length, c.order),
                    None => format!("{} {}", c.name, c.order),
                })
                .collect();
            println!(
                "  - {} ({}) {} {}",
                index.name,
                columns.join(", "),
                index.index_type,
                kind
            );
        }
    }

    if !table.foreign_keys.is_empty() {
        println!("\n🔗 Foreign Keys:");
        for fk in &table.foreign_keys {
            let mut line = format!(
                "  - {} -> {}.{}",
                fk.column, fk.referenced_table, fk.referenced_column
            );
            if let Some(on_delete) = &fk.on_delete {
                line.push_str(&format!(" ON DELETE {}", on_delete));
            }
            if let Some(on_update) = &fk.on_update {
                line.push_str(&format!(" ON UPDATE {}", on_update));
            }
            println!("{}", line);
        }
    }

    if !table.check_constraints.is_empty() {
        println!("\n✔️  Check Constraints:");
        for check in &table.check_constraints {
            println!("  - {}: {}", check.name, check.definition);
        }
    }
}

/// Show the relations inferred for a table
async fn relationships(
    config: &LaragenConfig,
    connection: ConnectionArgs,
    table_name: String,
    format: OutputFormat,
) -> Result<()> {
    let introspector = super::connect(&connection.resolve(config)?).await?;
    let schema = load_schema(introspector.as_ref(), config).await?;
    if schema.table(&table_name).is_none() {
        anyhow::bail!("Table '{}' not found (or ignored)", table_name);
    }

    let names = NameResolver::new(config.to_options().custom_model_names);
    let summary = RelationshipDetector::with_names(&schema, names).relationship_summary(&table_name);

    if print_structured(&summary, format)? {
        return Ok(());
    }
    print_relationships(&summary);
    Ok(())
}

fn print_relationships(summary: &RelationshipSummary) {
    println!("🔗 Relationships for {} ({})", summary.table, summary.model);
    if summary.is_pivot {
        println!("🔀 {} is a pivot table", summary.table);
    }

    let empty = summary.belongs_to.is_empty()
        && summary.inverse.is_empty()
        && summary.many_to_many.is_empty()
        && summary.polymorphic.is_empty();
    if empty {
        println!("\nNo relationships detected.");
        return;
    }

    if !summary.belongs_to.is_empty() {
        println!("\n⬆️  Belongs to:");
        for relation in &summary.belongs_to {
            println!(
                "  - {}() -> {} ({} -> {}.{})",
                relation.method,
                relation.model,
                relation.foreign_key,
                relation.related_table,
                relation.owner_key
            );
        }
    }

    if !summary.inverse.is_empty() {
        println!("\n⬇️  Has one / has many:");
        for relation in &summary.inverse {
            println!(
                "  - {}() {} {} ({}.{})",
                relation.method,
                relation.kind.method(),
                relation.model,
                relation.source_table,
                relation.foreign_key
            );
        }
    }

    if !summary.many_to_many.is_empty() {
        println!("\n🔀 Belongs to many:");
        for relation in &summary.many_to_many {
            println!(
                "  - {}() -> {} via {} ({}, {})",
                relation.method,
                relation.model,
                relation.pivot_table,
                relation.foreign_pivot_key,
                relation.related_pivot_key
            );
        }
    }

    if !summary.polymorphic.is_empty() {
        println!("\n🎭 Polymorphic:");
        for relation in &summary.polymorphic {
            println!(
                "  - {} ({}, {})",
                relation.name, relation.type_column, relation.id_column
            );
        }
    }
}

#[derive(Debug, Serialize)]
struct AnalysisReport {
    tables: Vec<TableAnalysis>,
    summary: laragen_schema::analyzer::ConstraintSummary,
}

/// Analyze keys, indexes and constraints
async fn analyze(
    config: &LaragenConfig,
    connection: ConnectionArgs,
    tables: Vec<String>,
    format: OutputFormat,
) -> Result<()> {
    let introspector = super::connect(&connection.resolve(config)?).await?;
    let schema = load_schema(introspector.as_ref(), config).await?;

    let targets: Vec<String> = if tables.is_empty() {
        schema.table_names().into_iter().map(String::from).collect()
    } else {
        let mut targets = Vec::new();
        for table in tables {
            let table = table.trim().to_string();
            if schema.table(&table).is_none() {
                anyhow::bail!("Table '{}' not found (or ignored)", table);
            }
            targets.push(table);
        }
        targets
    };

    let mut analyzer = ConstraintAnalyzer::new(&schema);
    let mut analyses = Vec::with_capacity(targets.len());
    for table in &targets {
        analyses.push(analyzer.analyze_table(table)?.clone());
    }
    let report = AnalysisReport {
        tables: analyses,
        summary: analyzer.constraint_summary(&targets)?,
    };

    if print_structured(&report, format)? {
        return Ok(());
    }

    for analysis in &report.tables {
        println!("📊 {}", analysis.table);
        let pk = &analysis.primary_key;
        if pk.columns.is_empty() {
            println!("  🔑 Primary key: none");
        } else {
            let mut traits = Vec::new();
            if pk.is_auto_increment {
                traits.push("auto-increment");
            }
            if pk.is_uuid {
                traits.push("uuid");
            }
            println!(
                "  🔑 Primary key: {} {}",
                pk.columns.join(", "),
                if traits.is_empty() {
                    String::new()
                } else {
                    format!("({})", traits.join(", "))
                }
            );
        }
        for fk in &analysis.foreign_keys {
            println!(
                "  🔗 {} -> {}.{} [{}{}]",
                fk.column,
                fk.referenced_table,
                fk.referenced_column,
                if fk.has_index { "indexed" } else { "not indexed" },
                if fk.is_nullable { ", nullable" } else { "" }
            );
        }
        for recommendation in &analysis.recommendations {
            println!(
                "  💡 [{}] {}",
                recommendation.severity.label(),
                recommendation.message
            );
            println!("     {}", recommendation.suggestion);
        }
        println!();
    }

    let summary = &report.summary;
    println!("📈 Summary:");
    println!("  Tables:             {}", summary.total_tables);
    println!(
        "  With primary key:   {} (without: {})",
        summary.tables_with_primary_key, summary.tables_without_primary_key
    );
    println!("  Foreign keys:       {}", summary.total_foreign_keys);
    println!("  Indexes:            {}", summary.total_indexes);
    println!("  Unique constraints: {}", summary.total_unique_constraints);
    println!("  Check constraints:  {}", summary.total_check_constraints);
    if summary.tables_with_issues.is_empty() {
        println!("\n✅ No issues found");
    } else {
        println!(
            "\n⚠️  Tables with recommendations: {}",
            summary.tables_with_issues.join(", ")
        );
    }

    Ok(())
}
