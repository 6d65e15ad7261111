//! Database schema inspection
//!
//! One introspector per dialect reads the system catalogs and normalizes the
//! rows into the shared [`TableMetadata`] model. Catalog-row normalization lives
//! in plain functions so it can be tested without a server.

mod mysql;
mod postgres;
mod sqlite;
mod sqlsrv;

use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use laragen_schema::{
    CheckConstraint, ColumnInfo, Driver, ForeignKey, IndexColumn, IndexInfo, SchemaError,
    SortOrder, TableMetadata,
};

pub use self::{
    mysql::MySqlIntrospector, postgres::PostgresIntrospector, sqlite::SqliteIntrospector,
    sqlsrv::SqlServerIntrospector,
};

/// Database introspector trait for database-specific implementations
#[async_trait]
pub trait DatabaseIntrospector: Send + Sync {
    fn driver(&self) -> Driver;

    /// Name of the connected database
    async fn database_name(&self) -> Result<String>;

    /// Base tables in the inspected schema, sorted by name
    async fn list_tables(&self) -> Result<Vec<String>>;

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Primary key columns in key order; empty when the table has none
    async fn primary_key(&self, table: &str) -> Result<Vec<String>>;

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>>;

    async fn indexes(&self, table: &str) -> Result<Vec<IndexInfo>>;

    async fn check_constraints(&self, table: &str) -> Result<Vec<CheckConstraint>>;

    async fn table_comment(&self, table: &str) -> Result<Option<String>>;

    /// Describe a specific table structure
    async fn describe_table(&self, table: &str) -> Result<TableMetadata> {
        let mut columns = self.columns(table).await?;
        if columns.is_empty() {
            return Err(SchemaError::TableNotFound(table.to_string()).into());
        }

        let primary_key = self.primary_key(table).await.unwrap_or_else(|e| {
            log::debug!("Primary key lookup failed for {}: {}", table, e);
            Vec::new()
        });
        let foreign_keys = self.foreign_keys(table).await?;
        let indexes = self.indexes(table).await?;
        let check_constraints = self.check_constraints(table).await.unwrap_or_else(|e| {
            log::debug!("Check constraint lookup failed for {}: {}", table, e);
            Vec::new()
        });
        let comment = self.table_comment(table).await.unwrap_or_else(|e| {
            log::debug!("Comment lookup failed for {}: {}", table, e);
            None
        });

        apply_column_keys(&mut columns, &primary_key, &indexes, &foreign_keys);

        Ok(TableMetadata {
            name: table.to_string(),
            comment,
            columns,
            primary_key: primary_key.first().cloned(),
            composite_primary_key: primary_key,
            foreign_keys,
            indexes,
            check_constraints,
        })
    }
}

/// Create a database introspector based on the database URL
///
/// `schema` selects the PostgreSQL / SQL Server schema; other dialects ignore it.
pub async fn create_introspector(
    database_url: &str,
    schema: Option<&str>,
) -> Result<Box<dyn DatabaseIntrospector>> {
    match Driver::from_url(database_url) {
        Some(Driver::MySql) => Ok(Box::new(MySqlIntrospector::new(database_url).await?)),
        Some(Driver::Postgres) => Ok(Box::new(
            PostgresIntrospector::new(database_url, schema.unwrap_or("public")).await?,
        )),
        Some(Driver::Sqlite) => Ok(Box::new(SqliteIntrospector::new(database_url).await?)),
        Some(Driver::SqlServer) => Ok(Box::new(
            SqlServerIntrospector::new(database_url, schema.unwrap_or("dbo")).await?,
        )),
        None => anyhow::bail!(
            "Unsupported database type. Supported: MySQL, PostgreSQL, SQLite, SQL Server"
        ),
    }
}

/// Hide credentials before a URL is printed
pub fn mask_database_url(database_url: &str) -> String {
    match url::Url::parse(database_url) {
        Ok(mut parsed) => {
            if parsed.username().is_empty() && parsed.password().is_none() {
                return database_url.to_string();
            }
            if parsed.set_username("***").is_err() || parsed.set_password(None).is_err() {
                return format!("{}://***", parsed.scheme());
            }
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}

/// Fill the MySQL-style `PRI` / `UNI` / `MUL` key marker where the dialect left it empty
pub(crate) fn apply_column_keys(
    columns: &mut [ColumnInfo],
    primary_key: &[String],
    indexes: &[IndexInfo],
    foreign_keys: &[ForeignKey],
) {
    for column in columns.iter_mut().filter(|c| c.key.is_empty()) {
        let name = column.name.as_str();
        column.key = if primary_key.first().map(String::as_str) == Some(name) {
            "PRI"
        } else if indexes
            .iter()
            .any(|i| i.unique && !i.primary && i.is_single_column(name))
        {
            "UNI"
        } else if indexes.iter().any(|i| i.leads_with(name))
            || foreign_keys.iter().any(|fk| fk.column == name)
        {
            "MUL"
        } else {
            ""
        }
        .to_string();
    }
}

/// One catalog row per (index, column), in key order
#[derive(Debug, Clone)]
pub(crate) struct IndexRow {
    pub index_name: String,
    pub column_name: String,
    pub unique: bool,
    pub primary: bool,
    pub descending: bool,
    pub length: Option<i64>,
    pub index_type: String,
}

/// Fold per-column index rows into indexes, keeping first-seen order
pub(crate) fn group_index_rows(rows: impl IntoIterator<Item = IndexRow>) -> Vec<IndexInfo> {
    let mut grouped: IndexMap<String, IndexInfo> = IndexMap::new();

    for row in rows {
        let index = grouped
            .entry(row.index_name.clone())
            .or_insert_with(|| IndexInfo {
                name: row.index_name.clone(),
                columns: Vec::new(),
                unique: row.unique || row.primary,
                primary: row.primary,
                index_type: row.index_type.to_ascii_uppercase(),
            });
        index.columns.push(IndexColumn {
            name: row.column_name,
            order: if row.descending {
                SortOrder::Desc
            } else {
                SortOrder::Asc
            },
            length: row.length,
        });
    }

    grouped.into_values().collect()
}

/// Catalogs report missing comments as empty strings
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `SET_NULL` / `set null` / `NO ACTION` all become `SET NULL` / `NO ACTION`
pub(crate) fn referential_action(action: Option<String>) -> Option<String> {
    non_empty(action).map(|a| a.replace('_', " ").to_ascii_uppercase())
}
