//! Live schema introspection over `information_schema` (Postgres, MySQL) and
//! `pragma_table_info` (SQLite)

use crate::domain::repository::{IntrospectedColumn, SchemaIntrospector};
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, QueryResult, Statement};
use std::sync::Arc;

const PG_PRIMARY_KEY: &str = r#"
SELECT kcu.column_name::text AS column_name
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_name = tc.constraint_name
 AND kcu.table_schema = tc.table_schema
 AND kcu.table_name = tc.table_name
WHERE tc.constraint_type = 'PRIMARY KEY'
  AND tc.table_schema = current_schema()
  AND tc.table_name = $1
ORDER BY kcu.ordinal_position"#;

const PG_COLUMNS: &str = r#"
SELECT column_name::text AS column_name,
       data_type::text AS data_type,
       character_maximum_length::int8 AS max_length,
       numeric_precision::int8 AS numeric_precision,
       numeric_scale::int8 AS numeric_scale,
       is_nullable::text AS is_nullable,
       column_default::text AS column_default
FROM information_schema.columns
WHERE table_schema = current_schema()
  AND table_name = $1
ORDER BY ordinal_position"#;

const MYSQL_PRIMARY_KEY: &str = r#"
SELECT COLUMN_NAME AS column_name
FROM information_schema.KEY_COLUMN_USAGE
WHERE TABLE_SCHEMA = DATABASE()
  AND TABLE_NAME = ?
  AND CONSTRAINT_NAME = 'PRIMARY'
ORDER BY ORDINAL_POSITION"#;

const MYSQL_COLUMNS: &str = r#"
SELECT COLUMN_NAME AS column_name,
       DATA_TYPE AS data_type,
       CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS max_length,
       CAST(NUMERIC_PRECISION AS SIGNED) AS numeric_precision,
       CAST(NUMERIC_SCALE AS SIGNED) AS numeric_scale,
       IS_NULLABLE AS is_nullable,
       COLUMN_DEFAULT AS column_default
FROM information_schema.COLUMNS
WHERE TABLE_SCHEMA = DATABASE()
  AND TABLE_NAME = ?
ORDER BY ORDINAL_POSITION"#;

const SQLITE_PRIMARY_KEY: &str =
    "SELECT name AS column_name FROM pragma_table_info(?) WHERE pk > 0 ORDER BY pk";

const SQLITE_COLUMNS: &str = r#"
SELECT name AS column_name,
       type AS declared_type,
       "notnull" AS not_null,
       dflt_value AS column_default
FROM pragma_table_info(?)
ORDER BY cid"#;

pub struct SeaOrmSchemaIntrospector {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmSchemaIntrospector {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn query(&self, sql: &str, table: &str) -> Result<Vec<QueryResult>> {
        let backend = self.db.get_database_backend();
        let rows = self
            .db
            .query_all(Statement::from_sql_and_values(backend, sql, [table.into()]))
            .await?;
        Ok(rows)
    }
}

fn dimension(row: &QueryResult, column: &str) -> Result<Option<u32>> {
    let value: Option<i64> = row.try_get("", column)?;
    Ok(value.and_then(|v| u32::try_from(v).ok()))
}

/// Split a declared SQLite type such as `varchar(200)` or `decimal(10,2)`
/// into its name and dimensions
pub(crate) fn parse_declared_type(declared: &str) -> (String, Option<u32>, Option<u32>) {
    let declared = declared.trim().to_ascii_lowercase();
    let Some((name, rest)) = declared.split_once('(') else {
        return (declared, None, None);
    };
    let mut dims = rest
        .trim_end_matches(')')
        .split(',')
        .map(|d| d.trim().parse::<u32>().ok());
    let first = dims.next().flatten();
    let second = dims.next().flatten();
    (name.trim().to_string(), first, second)
}

#[async_trait]
impl SchemaIntrospector for SeaOrmSchemaIntrospector {
    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>> {
        let sql = match self.db.get_database_backend() {
            DatabaseBackend::Postgres => PG_PRIMARY_KEY,
            DatabaseBackend::MySql => MYSQL_PRIMARY_KEY,
            DatabaseBackend::Sqlite => SQLITE_PRIMARY_KEY,
        };
        self.query(sql, table)
            .await?
            .iter()
            .map(|row| -> Result<String> { Ok(row.try_get("", "column_name")?) })
            .collect()
    }

    async fn columns(&self, table: &str) -> Result<Vec<IntrospectedColumn>> {
        let backend = self.db.get_database_backend();
        if backend == DatabaseBackend::Sqlite {
            return self
                .query(SQLITE_COLUMNS, table)
                .await?
                .iter()
                .map(|row| -> Result<IntrospectedColumn> {
                    let declared: String = row.try_get("", "declared_type")?;
                    let (data_type, first, second) = parse_declared_type(&declared);
                    let is_numeric = matches!(data_type.as_str(), "decimal" | "numeric");
                    let not_null: i32 = row.try_get("", "not_null")?;
                    Ok(IntrospectedColumn {
                        name: row.try_get("", "column_name")?,
                        max_length: if is_numeric { None } else { first },
                        numeric_precision: if is_numeric { first } else { None },
                        numeric_scale: if is_numeric { second } else { None },
                        data_type,
                        nullable: not_null == 0,
                        default_value: row.try_get("", "column_default")?,
                    })
                })
                .collect();
        }

        let sql = if backend == DatabaseBackend::MySql {
            MYSQL_COLUMNS
        } else {
            PG_COLUMNS
        };
        self.query(sql, table)
            .await?
            .iter()
            .map(|row| -> Result<IntrospectedColumn> {
                let is_nullable: String = row.try_get("", "is_nullable")?;
                Ok(IntrospectedColumn {
                    name: row.try_get("", "column_name")?,
                    data_type: row.try_get("", "data_type")?,
                    max_length: dimension(row, "max_length")?,
                    numeric_precision: dimension(row, "numeric_precision")?,
                    numeric_scale: dimension(row, "numeric_scale")?,
                    nullable: is_nullable.eq_ignore_ascii_case("YES"),
                    default_value: row.try_get("", "column_default")?,
                })
            })
            .collect()
    }
}
