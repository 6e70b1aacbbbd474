//! Repository and database traits
//!
//! These traits are the seams between the engine and the database.
//! Implementations are in infra/storage.

use super::types::ColumnSpec;
use crate::contract::DataClass;
use anyhow::Result;
use async_trait::async_trait;

/// Repository for stored data classes
#[async_trait]
pub trait ClassRepository: Send + Sync {
    /// Store a new class
    async fn create(&self, class: &DataClass) -> Result<DataClass>;

    /// Find a class by name (case-insensitive)
    async fn find_by_name(&self, class_name: &str) -> Result<Option<DataClass>>;

    /// List all classes
    async fn list_all(&self) -> Result<Vec<DataClass>>;

    /// Replace a stored class
    async fn update(&self, class: &DataClass) -> Result<DataClass>;

    /// Delete a class
    async fn delete(&self, class_name: &str) -> Result<()>;

    /// Check if a class exists
    async fn exists(&self, class_name: &str) -> Result<bool>;
}

/// Physical DDL primitives.
///
/// Each call is one logical schema operation; an implementation may need
/// several statements for it (e.g. rename followed by retype). Errors are
/// reported as-is and never retried.
#[async_trait]
pub trait DdlExecutor: Send + Sync {
    /// Create a table holding only its key columns, with a primary key
    /// constraint named `constraint_name` over them in the given order
    async fn create_table(
        &self,
        table: &str,
        keys: &[ColumnSpec],
        constraint_name: &str,
    ) -> Result<()>;

    /// Whether the primary key of an existing table can be dropped and
    /// recreated. When it cannot, composite keys are declared by
    /// `create_table` directly.
    fn replaces_primary_key(&self) -> bool {
        true
    }

    async fn add_column(&self, table: &str, column: &ColumnSpec) -> Result<()>;

    /// Rename, retype, change nullability and default of a column in one
    /// operation. Indexes on the column must survive a type change.
    async fn alter_column(&self, table: &str, old_name: &str, column: &ColumnSpec) -> Result<()>;

    async fn drop_column(&self, table: &str, column: &str) -> Result<()>;

    /// Drop the primary key constraint, whatever its name
    async fn drop_primary_key(&self, table: &str) -> Result<()>;

    async fn create_primary_key(
        &self,
        table: &str,
        constraint_name: &str,
        columns: &[String],
    ) -> Result<()>;

    /// Rebuild the table to reclaim space left by dropped variable-length columns
    async fn rebuild_table(&self, table: &str) -> Result<()>;

    async fn drop_table(&self, table: &str) -> Result<()>;
}

/// Column metadata reported by the live database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrospectedColumn {
    pub name: String,
    /// Physical type name as reported, e.g. "character varying"
    pub data_type: String,
    /// Character length of string columns
    pub max_length: Option<u32>,
    /// Total digits of numeric columns
    pub numeric_precision: Option<u32>,
    /// Fractional digits of numeric columns
    pub numeric_scale: Option<u32>,
    pub nullable: bool,
    /// Default expression as reported, before normalization
    pub default_value: Option<String>,
}

/// Live schema introspection
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Primary key column names of a table in constraint order; empty when
    /// the table has no primary key or does not exist
    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>>;

    /// Columns of a table in physical order
    async fn columns(&self, table: &str) -> Result<Vec<IntrospectedColumn>>;
}
