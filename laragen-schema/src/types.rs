//! Normalized schema model shared by every dialect

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Database engine a schema was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    MySql,
    Postgres,
    Sqlite,
    SqlServer,
}

impl Driver {
    /// Detect the driver from a connection URL scheme
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?.to_ascii_lowercase();
        match scheme.as_str() {
            "mysql" | "mariadb" => Some(Driver::MySql),
            "postgres" | "postgresql" => Some(Driver::Postgres),
            "sqlite" => Some(Driver::Sqlite),
            "mssql" | "sqlserver" => Some(Driver::SqlServer),
            _ => None,
        }
    }

    /// Laravel connection driver name
    pub fn name(&self) -> &'static str {
        match self {
            Driver::MySql => "mysql",
            Driver::Postgres => "pgsql",
            Driver::Sqlite => "sqlite",
            Driver::SqlServer => "sqlsrv",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Driver::MySql => "MySQL",
            Driver::Postgres => "PostgreSQL",
            Driver::Sqlite => "SQLite",
            Driver::SqlServer => "SQL Server",
        };
        f.write_str(label)
    }
}

/// Column as reported by the catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,

    /// Full type text, e.g. `varchar(255)`, `tinyint(1)`, `character varying`
    #[serde(rename = "type")]
    pub data_type: String,

    /// PostgreSQL underlying type name (`int4`, `uuid`, user enums)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udt_name: Option<String>,

    pub nullable: bool,

    pub default: Option<String>,

    /// `auto_increment` for identity columns, otherwise dialect extra text
    #[serde(default)]
    pub extra: String,

    pub comment: Option<String>,

    /// `PRI`, `UNI`, `MUL` or empty
    #[serde(default)]
    pub key: String,

    pub collation: Option<String>,

    pub max_length: Option<i64>,
    pub precision: Option<i64>,
    pub scale: Option<i64>,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            ..Default::default()
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.extra = "auto_increment".to_string();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn is_auto_increment(&self) -> bool {
        let extra = self.extra.to_ascii_lowercase();
        extra.contains("auto_increment") || extra.contains("serial")
    }
}

/// Foreign key from one column to a column of another table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub constraint_name: Option<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

impl ForeignKey {
    pub fn new(
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
            constraint_name: None,
            on_delete: None,
            on_update: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("ASC"),
            SortOrder::Desc => f.write_str("DESC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub name: String,
    pub order: SortOrder,
    /// Prefix length for partial-column indexes
    pub length: Option<i64>,
}

impl IndexColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: SortOrder::Asc,
            length: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
    pub primary: bool,
    #[serde(rename = "type")]
    pub index_type: String,
}

impl IndexInfo {
    /// Plain ascending index over the given columns
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| IndexColumn::new(*c)).collect(),
            unique: false,
            primary: false,
            index_type: "BTREE".to_string(),
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self.unique = true;
        self
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// True when the index covers exactly this one column
    pub fn is_single_column(&self, column: &str) -> bool {
        self.columns.len() == 1 && self.columns[0].name == column
    }

    pub fn leads_with(&self, column: &str) -> bool {
        self.columns.first().map_or(false, |c| c.name == column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConstraint {
    pub name: String,
    pub definition: String,
}

/// Everything the inspector knows about one table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub comment: Option<String>,
    pub columns: Vec<ColumnInfo>,
    pub primary_key: Option<String>,
    #[serde(default)]
    pub composite_primary_key: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub indexes: Vec<IndexInfo>,
    #[serde(default)]
    pub check_constraints: Vec<CheckConstraint>,
}

impl TableMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_columns(mut self, columns: Vec<ColumnInfo>) -> Self {
        self.columns = columns;
        self
    }

    /// Set the ordered primary key columns
    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.composite_primary_key = columns.iter().map(|c| c.to_string()).collect();
        self.primary_key = self.composite_primary_key.first().cloned();
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn with_index(mut self, index: IndexInfo) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Primary key column, or the framework default `id`
    pub fn primary_column(&self) -> &str {
        self.primary_key.as_deref().unwrap_or("id")
    }

    pub fn has_primary_key(&self) -> bool {
        !self.composite_primary_key.is_empty() || self.primary_key.is_some()
    }

    pub fn has_composite_primary_key(&self) -> bool {
        self.composite_primary_key.len() > 1
    }

    /// Unique indexes that are not the primary key
    pub fn unique_constraints(&self) -> impl Iterator<Item = &IndexInfo> {
        self.indexes.iter().filter(|i| i.unique && !i.primary)
    }

    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }
}

/// Immutable snapshot of every inspected table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub driver: Driver,
    pub database: String,
    pub tables: IndexMap<String, TableMetadata>,
}

impl DatabaseSchema {
    pub fn new(driver: Driver, database: impl Into<String>) -> Self {
        Self {
            driver,
            database: database.into(),
            tables: IndexMap::new(),
        }
    }

    pub fn add_table(&mut self, table: TableMetadata) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn with_table(mut self, table: TableMetadata) -> Self {
        self.add_table(table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableMetadata> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_from_url() {
        assert_eq!(Driver::from_url("mysql://root@localhost/app"), Some(Driver::MySql));
        assert_eq!(Driver::from_url("postgresql://localhost/app"), Some(Driver::Postgres));
        assert_eq!(Driver::from_url("sqlite://db.sqlite"), Some(Driver::Sqlite));
        assert_eq!(Driver::from_url("sqlite::memory:"), Some(Driver::Sqlite));
        assert_eq!(Driver::from_url("sqlserver://sa@localhost/app"), Some(Driver::SqlServer));
        assert_eq!(Driver::from_url("redis://localhost"), None);
        assert_eq!(Driver::Postgres.name(), "pgsql");
    }

    #[test]
    fn test_primary_column_falls_back_to_id() {
        let table = TableMetadata::new("logs");
        assert_eq!(table.primary_column(), "id");
        assert!(!table.has_primary_key());

        let table = TableMetadata::new("role_user").with_primary_key(&["user_id", "role_id"]);
        assert_eq!(table.primary_column(), "user_id");
        assert!(table.has_composite_primary_key());
    }

    #[test]
    fn test_unique_constraints_exclude_primary() {
        let table = TableMetadata::new("users")
            .with_index(IndexInfo::new("PRIMARY", &["id"]).primary())
            .with_index(IndexInfo::new("users_email_unique", &["email"]).unique())
            .with_index(IndexInfo::new("users_name_index", &["name"]));

        let names: Vec<_> = table.unique_constraints().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["users_email_unique"]);
    }

    #[test]
    fn test_auto_increment_detection() {
        assert!(ColumnInfo::new("id", "bigint unsigned").auto_increment().is_auto_increment());
        let mut serial = ColumnInfo::new("id", "integer");
        serial.extra = "SERIAL".to_string();
        assert!(serial.is_auto_increment());
        assert!(!ColumnInfo::new("name", "varchar(255)").is_auto_increment());
    }
}
