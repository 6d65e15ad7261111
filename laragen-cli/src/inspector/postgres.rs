//! PostgreSQL schema introspection

use super::{group_index_rows, non_empty, referential_action, DatabaseIntrospector, IndexRow};
use anyhow::Result;
use async_trait::async_trait;
use laragen_schema::{CheckConstraint, ColumnInfo, Driver, ForeignKey, IndexInfo};
use sqlx::{Pool, Postgres, Row};

pub struct PostgresIntrospector {
    pool: Pool<Postgres>,
    schema: String,
}

impl PostgresIntrospector {
    pub async fn new(database_url: &str, schema: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self {
            pool,
            schema: schema.to_string(),
        })
    }
}

/// Type text for a column: user-defined and array types are reported by `udt_name`
fn column_type(data_type: &str, udt_name: Option<&str>) -> String {
    match (data_type, udt_name) {
        ("USER-DEFINED", Some(udt)) => udt.to_string(),
        ("ARRAY", Some(udt)) => format!("{}[]", udt.trim_start_matches('_')),
        _ => data_type.to_string(),
    }
}

/// `serial` defaults and identity columns both count as auto-increment
fn is_auto_increment(default: Option<&str>, is_identity: Option<&str>) -> bool {
    default.map_or(false, |d| d.starts_with("nextval("))
        || is_identity.map_or(false, |i| i.eq_ignore_ascii_case("YES"))
}

/// `CHECK ((price > 0))` as returned by `pg_get_constraintdef` to `((price > 0))`
fn strip_check_keyword(definition: &str) -> String {
    let trimmed = definition.trim();
    let body = if trimmed.len() >= 5 && trimmed[..5].eq_ignore_ascii_case("CHECK") {
        &trimmed[5..]
    } else {
        trimmed
    };
    body.trim().trim_end_matches(" NOT VALID").to_string()
}

/// Maps the `pg_constraint.confdeltype`/`confupdtype` codes to rule names
fn action_name(code: &str) -> Option<String> {
    let name = match code {
        "a" => "NO ACTION",
        "r" => "RESTRICT",
        "c" => "CASCADE",
        "n" => "SET NULL",
        "d" => "SET DEFAULT",
        _ => return None,
    };
    Some(name.to_string())
}

#[async_trait]
impl DatabaseIntrospector for PostgresIntrospector {
    fn driver(&self) -> Driver {
        Driver::Postgres
    }

    async fn database_name(&self) -> Result<String> {
        let row = sqlx::query("SELECT current_database()::text AS db_name")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("db_name")?)
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = $1 AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .bind(&self.schema)
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
                c.column_name::text AS column_name,
                c.data_type::text AS data_type,
                c.udt_name::text AS udt_name,
                c.is_nullable::text AS is_nullable,
                c.column_default::text AS column_default,
                c.is_identity::text AS is_identity,
                c.collation_name::text AS collation_name,
                c.character_maximum_length::int8 AS max_length,
                c.numeric_precision::int8 AS numeric_precision,
                c.numeric_scale::int8 AS numeric_scale,
                col_description(
                    format('%I.%I', c.table_schema, c.table_name)::regclass::oid,
                    c.ordinal_position::int
                )::text AS column_comment
            FROM information_schema.columns c
            WHERE c.table_schema = $1 AND c.table_name = $2
            ORDER BY c.ordinal_position
            "#,
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let data_type: String = row.try_get("data_type")?;
            let udt_name: Option<String> = row.try_get("udt_name")?;
            let default: Option<String> = row.try_get("column_default")?;
            let is_identity: Option<String> = row.try_get("is_identity")?;
            let nullable: String = row.try_get("is_nullable")?;

            let extra = if is_auto_increment(default.as_deref(), is_identity.as_deref()) {
                "auto_increment".to_string()
            } else {
                String::new()
            };

            columns.push(ColumnInfo {
                name: row.try_get("column_name")?,
                data_type: column_type(&data_type, udt_name.as_deref()),
                udt_name,
                nullable: nullable == "YES",
                default,
                extra,
                comment: non_empty(row.try_get("column_comment")?),
                key: String::new(),
                collation: row.try_get("collation_name")?,
                max_length: row.try_get("max_length")?,
                precision: row.try_get("numeric_precision")?,
                scale: row.try_get("numeric_scale")?,
            });
        }
        Ok(columns)
    }

    async fn primary_key(&self, table: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT a.attname::text AS column_name
            FROM pg_index i
            JOIN pg_class t ON t.oid = i.indrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN LATERAL unnest(i.indkey) WITH ORDINALITY AS k(attnum, ord) ON true
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
            WHERE i.indisprimary AND n.nspname = $1 AND t.relname = $2
            ORDER BY k.ord
            "#,
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get("column_name").map_err(Into::into))
            .collect()
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>> {
        // conkey and confkey are unnested together so composite keys pair up by position
        let rows = sqlx::query(
            r#"
            SELECT
                a.attname::text AS column_name,
                rt.relname::text AS referenced_table,
                ra.attname::text AS referenced_column,
                con.conname::text AS constraint_name,
                con.confdeltype::text AS on_delete,
                con.confupdtype::text AS on_update
            FROM pg_constraint con
            JOIN pg_class t ON t.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_class rt ON rt.oid = con.confrelid
            JOIN LATERAL unnest(con.conkey, con.confkey)
                WITH ORDINALITY AS k(attnum, ref_attnum, ord) ON true
            JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
            JOIN pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = k.ref_attnum
            WHERE con.contype = 'f' AND n.nspname = $1 AND t.relname = $2
            ORDER BY con.conname, k.ord
            "#,
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut foreign_keys = Vec::with_capacity(rows.len());
        for row in rows {
            let on_delete: Option<String> = row.try_get("on_delete")?;
            let on_update: Option<String> = row.try_get("on_update")?;
            foreign_keys.push(ForeignKey {
                column: row.try_get("column_name")?,
                referenced_table: row.try_get("referenced_table")?,
                referenced_column: row.try_get("referenced_column")?,
                constraint_name: row.try_get("constraint_name")?,
                on_delete: referential_action(on_delete.as_deref().and_then(action_name)),
                on_update: referential_action(on_update.as_deref().and_then(action_name)),
            });
        }
        Ok(foreign_keys)
    }

    async fn indexes(&self, table: &str) -> Result<Vec<IndexInfo>> {
        let rows = sqlx::query(
            r#"
            SELECT
                ic.relname::text AS index_name,
                a.attname::text AS column_name,
                ix.indisunique AS is_unique,
                ix.indisprimary AS is_primary,
                (ix.indoption[(k.ord - 1)::int]::int & 1) = 1 AS is_descending,
                am.amname::text AS index_type
            FROM pg_index ix
            JOIN pg_class t ON t.oid = ix.indrelid
            JOIN pg_class ic ON ic.oid = ix.indexrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_am am ON am.oid = ic.relam
            JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord) ON true
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
            WHERE n.nspname = $1 AND t.relname = $2
            ORDER BY ix.indisprimary DESC, ic.relname, k.ord
            "#,
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut index_rows = Vec::with_capacity(rows.len());
        for row in rows {
            index_rows.push(IndexRow {
                index_name: row.try_get("index_name")?,
                column_name: row.try_get("column_name")?,
                unique: row.try_get("is_unique")?,
                primary: row.try_get("is_primary")?,
                descending: row.try_get::<Option<bool>, _>("is_descending")?.unwrap_or(false),
                length: None,
                index_type: row.try_get("index_type")?,
            });
        }

        Ok(group_index_rows(index_rows))
    }

    async fn check_constraints(&self, table: &str) -> Result<Vec<CheckConstraint>> {
        let rows = sqlx::query(
            r#"
            SELECT
                con.conname::text AS name,
                pg_get_constraintdef(con.oid)::text AS definition
            FROM pg_constraint con
            JOIN pg_class t ON t.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            WHERE con.contype = 'c' AND n.nspname = $1 AND t.relname = $2
            ORDER BY con.conname
            "#,
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut constraints = Vec::with_capacity(rows.len());
        for row in rows {
            let definition: String = row.try_get("definition")?;
            constraints.push(CheckConstraint {
                name: row.try_get("name")?,
                definition: strip_check_keyword(&definition),
            });
        }
        Ok(constraints)
    }

    async fn table_comment(&self, table: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT obj_description(c.oid, 'pg_class')::text AS table_comment
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relname = $2 AND c.relkind IN ('r', 'p')
            "#,
        )
        .bind(&self.schema)
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
    fn test_column_type() {
        assert_eq!(column_type("integer", Some("int4")), "integer");
        assert_eq!(column_type("USER-DEFINED", Some("order_status")), "order_status");
        assert_eq!(column_type("ARRAY", Some("_text")), "text[]");
    }

    #[test]
    fn test_auto_increment_detection() {
        assert!(is_auto_increment(Some("nextval('users_id_seq'::regclass)"), Some("NO")));
        assert!(is_auto_increment(None, Some("YES")));
        assert!(!is_auto_increment(Some("0"), Some("NO")));
    }

    #[test]
    fn test_action_name() {
        assert_eq!(action_name("c").as_deref(), Some("CASCADE"));
        assert_eq!(action_name("n").as_deref(), Some("SET NULL"));
        assert_eq!(action_name("a").as_deref(), Some("NO ACTION"));
        assert_eq!(action_name("x"), None);
        assert_eq!(
            referential_action(action_name("d")).as_deref(),
            Some("SET DEFAULT")
        );
    }

    #[test]
    fn test_strip_check_keyword() {
        assert_eq!(strip_check_keyword("CHECK ((price > (0)::numeric))"), "((price > (0)::numeric))");
        assert_eq!(strip_check_keyword("CHECK ((qty >= 0)) NOT VALID"), "((qty >= 0))");
    }
}
