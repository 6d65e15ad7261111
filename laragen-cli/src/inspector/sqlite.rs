//! SQLite schema introspection

use super::DatabaseIntrospector;
use anyhow::Result;
use async_trait::async_trait;
use laragen_schema::{
    CheckConstraint, ColumnInfo, Driver, ForeignKey, IndexColumn, IndexInfo, SortOrder,
};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

/// `CHECK (` optionally preceded by `CONSTRAINT name`
static CHECK_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:\bCONSTRAINT\s+["`\[]?(\w+)["`\]]?\s+)?\bCHECK\s*\("#)
        .expect("Invalid check clause regex")
});

pub struct SqliteIntrospector {
    pool: Pool<Sqlite>,
    db_name: String,
}

impl SqliteIntrospector {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self {
            pool,
            db_name: database_name_from_url(database_url),
        })
    }
}

/// File stem of the database path, `main` for in-memory databases
fn database_name_from_url(database_url: &str) -> String {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or_default();

    if path.is_empty() || path == ":memory:" {
        return "main".to_string();
    }
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("main")
        .to_string()
}

/// Parse the `CHECK (...)` clauses out of a `CREATE TABLE` statement
///
/// Unnamed checks are numbered `{table}_check_{n}`.
pub(crate) fn extract_check_constraints(table: &str, sql: &str) -> Vec<CheckConstraint> {
    let mut constraints = Vec::new();
    let mut position = 0;

    while let Some(captures) = CHECK_CLAUSE.captures_at(sql, position) {
        let Some(clause) = captures.get(0) else {
            break;
        };
        let Some(body_end) = closing_paren(sql, clause.end()) else {
            break;
        };

        let name = captures
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| format!("{}_check_{}", table, constraints.len() + 1));
        constraints.push(CheckConstraint {
            name,
            definition: sql[clause.end()..body_end].trim().to_string(),
        });

        position = body_end + 1;
    }

    constraints
}

/// Byte offset of the `)` balancing an already-opened `(`, skipping quoted text
fn closing_paren(sql: &str, start: usize) -> Option<usize> {
    let mut depth = 1;
    let mut quote: Option<char> = None;

    for (offset, ch) in sql[start..].char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(start + offset);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// A lone `INTEGER PRIMARY KEY` aliases the rowid and auto-increments
fn is_rowid_alias(data_type: &str, primary_key_columns: usize) -> bool {
    primary_key_columns == 1 && data_type.trim().eq_ignore_ascii_case("integer")
}

#[async_trait]
impl DatabaseIntrospector for SqliteIntrospector {
    fn driver(&self) -> Driver {
        Driver::Sqlite
    }

    async fn database_name(&self) -> Result<String> {
        Ok(self.db_name.clone())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get("name").map_err(Into::into))
            .collect()
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let rows = sqlx::query(
            r#"
            SELECT name, type, "notnull" AS not_null, dflt_value, pk
            FROM pragma_table_info(?)
            ORDER BY cid
            "#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut primary_key_columns = 0;
        for row in &rows {
            let pk: i64 = row.try_get("pk")?;
            if pk > 0 {
                primary_key_columns += 1;
            }
        }

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let data_type: String = row.try_get("type")?;
            let not_null: i64 = row.try_get("not_null")?;
            let pk: i64 = row.try_get("pk")?;

            let rowid_alias = pk > 0 && is_rowid_alias(&data_type, primary_key_columns);
            columns.push(ColumnInfo {
                name: row.try_get("name")?,
                data_type: data_type.to_ascii_lowercase(),
                nullable: not_null == 0 && pk == 0,
                default: row.try_get("dflt_value")?,
                extra: if rowid_alias {
                    "auto_increment".to_string()
                } else {
                    String::new()
                },
                key: if pk > 0 { "PRI" } else { "" }.to_string(),
                ..Default::default()
            });
        }
        Ok(columns)
    }

    async fn primary_key(&self, table: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM pragma_table_info(?) WHERE pk > 0 ORDER BY pk")
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get("name").map_err(Into::into))
            .collect()
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>> {
        let rows = sqlx::query(
            r#"
            SELECT "table" AS referenced_table, "from" AS column_name, "to" AS referenced_column,
                   on_update, on_delete
            FROM pragma_foreign_key_list(?)
            ORDER BY id, seq
            "#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut foreign_keys = Vec::with_capacity(rows.len());
        for row in rows {
            let referenced_table: String = row.try_get("referenced_table")?;
            // `REFERENCES users` without a column targets the primary key
            let referenced_column = match row.try_get::<Option<String>, _>("referenced_column")? {
                Some(column) => column,
                None => self
                    .primary_key(&referenced_table)
                    .await
                    .ok()
                    .and_then(|pk| pk.into_iter().next())
                    .unwrap_or_else(|| "id".to_string()),
            };

            foreign_keys.push(ForeignKey {
                column: row.try_get("column_name")?,
                referenced_table,
                referenced_column,
                constraint_name: None,
                on_delete: super::referential_action(row.try_get("on_delete")?),
                on_update: super::referential_action(row.try_get("on_update")?),
            });
        }
        Ok(foreign_keys)
    }

    async fn indexes(&self, table: &str) -> Result<Vec<IndexInfo>> {
        let index_rows = sqlx::query(
            r#"SELECT name, "unique" AS is_unique, origin FROM pragma_index_list(?) ORDER BY seq"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut indexes = Vec::with_capacity(index_rows.len());
        for index_row in index_rows {
            let name: String = index_row.try_get("name")?;
            let unique: i64 = index_row.try_get("is_unique")?;
            let origin: String = index_row.try_get("origin")?;

            let column_rows = sqlx::query(
                r#"SELECT name, "desc" AS is_desc FROM pragma_index_xinfo(?) WHERE key = 1 ORDER BY seqno"#,
            )
            .bind(&name)
            .fetch_all(&self.pool)
            .await?;

            let mut columns = Vec::with_capacity(column_rows.len());
            for column_row in column_rows {
                // expression keys have no column name
                let Some(column) = column_row.try_get::<Option<String>, _>("name")? else {
                    continue;
                };
                let desc: i64 = column_row.try_get("is_desc")?;
                columns.push(IndexColumn {
                    order: if desc == 1 { SortOrder::Desc } else { SortOrder::Asc },
                    ..IndexColumn::new(column)
                });
            }

            let primary = origin == "pk";
            indexes.push(IndexInfo {
                name,
                columns,
                unique: unique == 1 || primary,
                primary,
                index_type: "BTREE".to_string(),
            });
        }

        indexes.sort_by_key(|index| !index.primary);
        Ok(indexes)
    }

    async fn check_constraints(&self, table: &str) -> Result<Vec<CheckConstraint>> {
        let row = sqlx::query("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_optional(&self.pool)
            .await?;

        let sql: Option<String> = match row {
            Some(row) => row.try_get("sql")?,
            None => None,
        };
        Ok(sql
            .map(|sql| extract_check_constraints(table, &sql))
            .unwrap_or_default())
    }

    async fn table_comment(&self, _table: &str) -> Result<Option<String>> {
        Ok(None)
    }
}
