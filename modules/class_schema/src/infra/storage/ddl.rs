//! SeaORM DDL executor
//!
//! Column operations are built as sea-query statements. Primary key
//! constraints and table rebuilds have no portable builder and are issued as
//! backend-specific SQL.

use crate::domain::repository::DdlExecutor;
use crate::domain::types::{ColumnSpec, SqlType};
use anyhow::{bail, Result};
use async_trait::async_trait;
use sea_orm::sea_query::{
    Alias, ColumnDef, Expr, Index, SimpleExpr, Table, TableCreateStatement,
};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};
use sea_orm_migration::SchemaManager;
use std::sync::Arc;

pub struct SeaOrmDdlExecutor {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmDdlExecutor {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn backend(&self) -> DatabaseBackend {
        self.db.get_database_backend()
    }

    fn manager(&self) -> SchemaManager<'_> {
        SchemaManager::new(&*self.db)
    }

    async fn execute_raw(&self, sql: &str) -> Result<()> {
        tracing::debug!(sql, "executing DDL");
        self.db.execute_unprepared(sql).await?;
        Ok(())
    }

    async fn primary_key_name(&self, table: &str) -> Result<Option<String>> {
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                DatabaseBackend::Postgres,
                r#"SELECT constraint_name::text AS constraint_name
                   FROM information_schema.table_constraints
                   WHERE table_schema = current_schema()
                     AND table_name = $1
                     AND constraint_type = 'PRIMARY KEY'"#,
                [table.into()],
            ))
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get::<String>("", "constraint_name")?)),
            None => Ok(None),
        }
    }
}

/// Quote an identifier for raw SQL
pub(crate) fn quote(backend: DatabaseBackend, ident: &str) -> String {
    match backend {
        DatabaseBackend::MySql => format!("`{}`", ident.replace('`', "``")),
        _ => format!("\"{}\"", ident.replace('"', "\"\"")),
    }
}

/// Default literal typed after the column it belongs to
fn default_expr(sql_type: &SqlType, raw: &str) -> SimpleExpr {
    match sql_type {
        SqlType::Int | SqlType::BigInt | SqlType::Float | SqlType::Decimal { .. }
            if raw.trim().parse::<f64>().is_ok() =>
        {
            Expr::cust(raw.trim())
        }
        SqlType::Bit => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Expr::val(true).into(),
            "false" | "0" => Expr::val(false).into(),
            _ => Expr::val(raw.to_string()).into(),
        },
        _ => Expr::val(raw.to_string()).into(),
    }
}

/// Sea-query column definition of a physical column
pub(crate) fn column_def(column: &ColumnSpec) -> ColumnDef {
    let mut def = ColumnDef::new(Alias::new(&column.name));
    match &column.sql_type {
        SqlType::NVarChar(n) => def.string_len(*n),
        SqlType::NVarCharMax => def.text(),
        SqlType::Int => def.integer(),
        SqlType::BigInt => def.big_integer(),
        SqlType::Float => def.double(),
        SqlType::Decimal { precision, scale } => def.decimal_len(*precision, *scale),
        SqlType::Bit => def.boolean(),
        SqlType::DateTime2(_) => def.date_time(),
        SqlType::Date => def.date(),
        SqlType::Time(_) => def.time(),
        SqlType::UniqueIdentifier => def.uuid(),
        SqlType::VarBinaryMax => def.blob(),
    };
    if column.nullable {
        def.null();
    } else {
        def.not_null();
    }
    if let Some(value) = &column.default_value {
        def.default(default_expr(&column.sql_type, value));
    }
    if column.auto_increment {
        def.auto_increment();
    }
    def
}

/// `CREATE TABLE` holding only the key columns and their constraint
pub(crate) fn create_table_statement(
    backend: DatabaseBackend,
    table: &str,
    keys: &[ColumnSpec],
    constraint_name: &str,
) -> Result<TableCreateStatement> {
    let [first, ..] = keys else {
        bail!("table '{table}' needs at least one key column");
    };
    let mut statement = Table::create();
    statement.table(Alias::new(table));

    if keys.len() == 1 && first.auto_increment && backend == DatabaseBackend::Sqlite {
        // SQLite only allows AUTOINCREMENT on an inline INTEGER PRIMARY KEY
        let mut key_def = column_def(first);
        key_def.primary_key();
        statement.col(key_def);
        return Ok(statement.to_owned());
    }

    let mut constraint = Index::create();
    constraint.name(constraint_name);
    for key in keys {
        statement.col(column_def(key));
        constraint.col(Alias::new(&key.name));
    }
    statement.primary_key(&mut constraint);
    Ok(statement.to_owned())
}

#[async_trait]
impl DdlExecutor for SeaOrmDdlExecutor {
    async fn create_table(
        &self,
        table: &str,
        keys: &[ColumnSpec],
        constraint_name: &str,
    ) -> Result<()> {
        let statement = create_table_statement(self.backend(), table, keys, constraint_name)?;
        self.manager().create_table(statement).await?;
        Ok(())
    }

    fn replaces_primary_key(&self) -> bool {
        self.backend() != DatabaseBackend::Sqlite
    }

    async fn add_column(&self, table: &str, column: &ColumnSpec) -> Result<()> {
        self.manager()
            .alter_table(
                Table::alter()
                    .table(Alias::new(table))
                    .add_column(column_def(column))
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn alter_column(&self, table: &str, old_name: &str, column: &ColumnSpec) -> Result<()> {
        let backend = self.backend();
        if backend == DatabaseBackend::Sqlite {
            bail!("SQLite cannot alter column '{old_name}' of table '{table}' in place");
        }

        if old_name != column.name {
            self.manager()
                .alter_table(
                    Table::alter()
                        .table(Alias::new(table))
                        .rename_column(Alias::new(old_name), Alias::new(&column.name))
                        .to_owned(),
                )
                .await?;
        }

        self.manager()
            .alter_table(
                Table::alter()
                    .table(Alias::new(table))
                    .modify_column(column_def(column))
                    .to_owned(),
            )
            .await?;

        // MySQL redefines the whole column; Postgres keeps a stale default
        if column.default_value.is_none() && backend == DatabaseBackend::Postgres {
            self.execute_raw(&format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                quote(backend, table),
                quote(backend, &column.name)
            ))
            .await?;
        }
        Ok(())
    }

    async fn drop_column(&self, table: &str, column: &str) -> Result<()> {
        self.manager()
            .alter_table(
                Table::alter()
                    .table(Alias::new(table))
                    .drop_column(Alias::new(column))
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn drop_primary_key(&self, table: &str) -> Result<()> {
        let backend = self.backend();
        match backend {
            DatabaseBackend::Postgres => {
                let Some(name) = self.primary_key_name(table).await? else {
                    tracing::debug!(table, "no primary key to drop");
                    return Ok(());
                };
                self.execute_raw(&format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    quote(backend, table),
                    quote(backend, &name)
                ))
                .await
            }
            DatabaseBackend::MySql => {
                self.execute_raw(&format!(
                    "ALTER TABLE {} DROP PRIMARY KEY",
                    quote(backend, table)
                ))
                .await
            }
            DatabaseBackend::Sqlite => {
                bail!("SQLite cannot drop the primary key of table '{table}'")
            }
        }
    }

    async fn create_primary_key(
        &self,
        table: &str,
        constraint_name: &str,
        columns: &[String],
    ) -> Result<()> {
        let backend = self.backend();
        if backend == DatabaseBackend::Sqlite {
            bail!("SQLite cannot add a primary key to table '{table}'");
        }
        let columns = columns
            .iter()
            .map(|c| quote(backend, c))
            .collect::<Vec<_>>()
            .join(", ");
        self.execute_raw(&format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            quote(backend, table),
            quote(backend, constraint_name),
            columns
        ))
        .await
    }

    async fn rebuild_table(&self, table: &str) -> Result<()> {
        let backend = self.backend();
        let sql = match backend {
            DatabaseBackend::Postgres => format!("VACUUM FULL {}", quote(backend, table)),
            DatabaseBackend::MySql => format!("OPTIMIZE TABLE {}", quote(backend, table)),
            DatabaseBackend::Sqlite => "VACUUM".to_string(),
        };
        self.execute_raw(&sql).await
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        self.manager()
            .drop_table(Table::drop().table(Alias::new(table)).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
