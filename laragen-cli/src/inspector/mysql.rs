//! MySQL / MariaDB schema introspection

use super::{group_index_rows, non_empty, referential_action, DatabaseIntrospector, IndexRow};
use anyhow::Result;
use async_trait::async_trait;
use laragen_schema::{CheckConstraint, ColumnInfo, Driver, ForeignKey, IndexInfo};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};

pub struct MySqlIntrospector {
    pool: Pool<MySql>,
    db_name: String,
}

impl MySqlIntrospector {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = sqlx::mysql::MySqlPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let db_name_row = sqlx::query("SELECT CAST(DATABASE() AS CHAR) AS db_name")
            .fetch_one(&pool)
            .await?;
        let db_name: Option<String> = db_name_row.try_get("db_name")?;
        let Some(db_name) = db_name else {
            anyhow::bail!("No database selected; add the database name to the connection URL");
        };

        Ok(Self { pool, db_name })
    }
}

/// `information_schema.columns` row to column; `COLUMN_TYPE` keeps lengths and `unsigned`
fn column_from_row(row: &MySqlRow) -> Result<ColumnInfo> {
    let nullable: String = row.try_get("is_nullable")?;
    let extra: Option<String> = row.try_get("extra")?;

    Ok(ColumnInfo {
        name: row.try_get("column_name")?,
        data_type: row.try_get("column_type")?,
        udt_name: None,
        nullable: nullable == "YES",
        default: row.try_get("column_default")?,
        extra: normalize_extra(extra.as_deref()),
        comment: non_empty(row.try_get("column_comment")?),
        key: row.try_get::<Option<String>, _>("column_key")?.unwrap_or_default(),
        collation: row.try_get("collation_name")?,
        max_length: row.try_get("max_length")?,
        precision: row.try_get("numeric_precision")?,
        scale: row.try_get("numeric_scale")?,
    })
}

/// Lowercased `EXTRA`, e.g. `auto_increment` or `on update current_timestamp`
fn normalize_extra(extra: Option<&str>) -> String {
    extra.unwrap_or_default().trim().to_ascii_lowercase()
}

#[async_trait]
impl DatabaseIntrospector for MySqlIntrospector {
    fn driver(&self) -> Driver {
        Driver::MySql
    }

    async fn database_name(&self) -> Result<String> {
        Ok(self.db_name.clone())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT CAST(TABLE_NAME AS CHAR) AS table_name
            FROM information_schema.tables
            WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            "#,
        )
        .bind(&self.db_name)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get("table_name").map_err(Into::into))
            .collect()
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let rows = sqlx::query(
            r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR) AS column_name,
                CAST(COLUMN_TYPE AS CHAR) AS column_type,
                CAST(IS_NULLABLE AS CHAR) AS is_nullable,
                CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
                CAST(EXTRA AS CHAR) AS extra,
                CAST(COLUMN_COMMENT AS CHAR) AS column_comment,
                CAST(COLUMN_KEY AS CHAR) AS column_key,
                CAST(COLLATION_NAME AS CHAR) AS collation_name,
                CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS max_length,
                CAST(NUMERIC_PRECISION AS SIGNED) AS numeric_precision,
                CAST(NUMERIC_SCALE AS SIGNED) AS numeric_scale
            FROM information_schema.columns
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
            "#,
        )
        .bind(&self.db_name)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(column_from_row).collect()
    }

    async fn primary_key(&self, table: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT CAST(COLUMN_NAME AS CHAR) AS column_name
            FROM information_schema.statistics
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND INDEX_NAME = 'PRIMARY'
            ORDER BY SEQ_IN_INDEX
            "#,
        )
        .bind(&self.db_name)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get("column_name").map_err(Into::into))
            .collect()
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>> {
        let rows = sqlx::query(
            r#"
            SELECT
                CAST(k.COLUMN_NAME AS CHAR) AS column_name,
                CAST(k.REFERENCED_TABLE_NAME AS CHAR) AS referenced_table,
                CAST(k.REFERENCED_COLUMN_NAME AS CHAR) AS referenced_column,
                CAST(k.CONSTRAINT_NAME AS CHAR) AS constraint_name,
                CAST(r.DELETE_RULE AS CHAR) AS on_delete,
                CAST(r.UPDATE_RULE AS CHAR) AS on_update
            FROM information_schema.key_column_usage k
            JOIN information_schema.referential_constraints r
                ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
                AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME
                AND r.TABLE_NAME = k.TABLE_NAME
            WHERE k.TABLE_SCHEMA = ? AND k.TABLE_NAME = ?
                AND k.REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION
            "#,
        )
        .bind(&self.db_name)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut foreign_keys = Vec::with_capacity(rows.len());
        for row in rows {
            foreign_keys.push(ForeignKey {
                column: row.try_get("column_name")?,
                referenced_table: row.try_get("referenced_table")?,
                referenced_column: row.try_get("referenced_column")?,
                constraint_name: row.try_get("constraint_name")?,
                on_delete: referential_action(row.try_get("on_delete")?),
                on_update: referential_action(row.try_get("on_update")?),
            });
        }
        Ok(foreign_keys)
    }

    async fn indexes(&self, table: &str) -> Result<Vec<IndexInfo>> {
        let rows = sqlx::query(
            r#"
            SELECT
                CAST(INDEX_NAME AS CHAR) AS index_name,
                CAST(COLUMN_NAME AS CHAR) AS column_name,
                CAST(NON_UNIQUE AS SIGNED) AS non_unique,
                CAST(COLLATION AS CHAR) AS collation,
                CAST(SUB_PART AS SIGNED) AS sub_part,
                CAST(INDEX_TYPE AS CHAR) AS index_type
            FROM information_schema.statistics
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY INDEX_NAME = 'PRIMARY' DESC, INDEX_NAME, SEQ_IN_INDEX
            "#,
        )
        .bind(&self.db_name)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut index_rows = Vec::with_capacity(rows.len());
        for row in rows {
            // functional key parts have no column
            let Some(column_name) = row.try_get::<Option<String>, _>("column_name")? else {
                continue;
            };
            let index_name: String = row.try_get("index_name")?;
            let non_unique: i64 = row.try_get("non_unique")?;
            let collation: Option<String> = row.try_get("collation")?;

            index_rows.push(IndexRow {
                primary: index_name == "PRIMARY",
                unique: non_unique == 0,
                descending: collation.as_deref() == Some("D"),
                length: row.try_get("sub_part")?,
                index_type: row
                    .try_get::<Option<String>, _>("index_type")?
                    .unwrap_or_else(|| "BTREE".to_string()),
                index_name,
                column_name,
            });
        }

        Ok(group_index_rows(index_rows))
    }

    async fn check_constraints(&self, table: &str) -> Result<Vec<CheckConstraint>> {
        // information_schema.check_constraints exists from MySQL 8.0.16 / MariaDB 10.2
        let rows = sqlx::query(
            r#"
            SELECT
                CAST(cc.CONSTRAINT_NAME AS CHAR) AS name,
                CAST(cc.CHECK_CLAUSE AS CHAR) AS definition
            FROM information_schema.check_constraints cc
            JOIN information_schema.table_constraints tc
                ON tc.CONSTRAINT_SCHEMA = cc.CONSTRAINT_SCHEMA
                AND tc.CONSTRAINT_NAME = cc.CONSTRAINT_NAME
            WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ? AND tc.CONSTRAINT_TYPE = 'CHECK'
            ORDER BY cc.CONSTRAINT_NAME
            "#,
        )
        .bind(&self.db_name)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut constraints = Vec::with_capacity(rows.len());
        for row in rows {
            constraints.push(CheckConstraint {
                name: row.try_get("name")?,
                definition: row.try_get("definition")?,
            });
        }
        Ok(constraints)
    }

    async fn table_comment(&self, table: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT CAST(TABLE_COMMENT AS CHAR) AS table_comment
            FROM information_schema.tables
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            "#,
        )
        .bind(&self.db_name)
        .bind(table)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(non_empty(row.try_get("table_comment")?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_extra() {
        assert_eq!(normalize_extra(Some("AUTO_INCREMENT")), "auto_increment");
        assert_eq!(
            normalize_extra(Some("DEFAULT_GENERATED on update CURRENT_TIMESTAMP")),
            "default_generated on update current_timestamp"
        );
        assert_eq!(normalize_extra(None), "");
    }
}
