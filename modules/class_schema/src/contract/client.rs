//! Native client trait for inter-module communication
//!
//! Other modules (search indexing, page rendering, ...) ask for class tables
//! and structures through this trait. NO HTTP - direct function calls.

use super::{
    error::SchemaError,
    model::{ClassDefinition, ClassStructure, DataClass},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Class schema API for inter-module communication
#[async_trait]
pub trait ClassSchemaApi: Send + Sync {
    /// Register a class and create its table
    async fn create_class(
        &self,
        class_name: &str,
        table_name: &str,
        definition: ClassDefinition,
    ) -> Result<DataClass, SchemaError>;

    /// Replace the field definition of a class and migrate its table
    async fn update_definition(
        &self,
        class_name: &str,
        definition: ClassDefinition,
    ) -> Result<DataClass, SchemaError>;

    async fn get_class(&self, class_name: &str) -> Result<DataClass, SchemaError>;

    async fn list_classes(&self) -> Result<Vec<DataClass>, SchemaError>;

    /// Drop the class table and forget the class
    async fn delete_class(&self, class_name: &str) -> Result<(), SchemaError>;

    /// Reflected structure of a class, served from the structure cache
    async fn get_class_structure(
        &self,
        class_name: &str,
    ) -> Result<Option<Arc<ClassStructure>>, SchemaError>;

    /// Invalidate one cached structure
    fn invalidate_structure(&self, class_name: &str);

    /// Invalidate all cached structures
    fn clear_structures(&self);
}
