//! Native client implementation - wraps the domain service for in-process calls

use crate::contract::{ClassDefinition, ClassSchemaApi, ClassStructure, DataClass, SchemaError};
use crate::domain::ClassService;
use async_trait::async_trait;
use std::sync::Arc;

/// Native client that calls the domain service directly
#[derive(Clone)]
pub struct NativeClient {
    service: Arc<ClassService>,
}

impl NativeClient {
    pub fn new(service: Arc<ClassService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ClassSchemaApi for NativeClient {
    async fn create_class(
        &self,
        class_name: &str,
        table_name: &str,
        definition: ClassDefinition,
    ) -> Result<DataClass, SchemaError> {
        self.service
            .create_class(class_name, table_name, definition)
            .await
    }

    async fn update_definition(
        &self,
        class_name: &str,
        definition: ClassDefinition,
    ) -> Result<DataClass, SchemaError> {
        let (class, _report) = self.service.update_definition(class_name, definition).await?;
        Ok(class)
    }

    async fn get_class(&self, class_name: &str) -> Result<DataClass, SchemaError> {
        self.service.get_class(class_name).await
    }

    async fn list_classes(&self) -> Result<Vec<DataClass>, SchemaError> {
        self.service.list_classes().await
    }

    async fn delete_class(&self, class_name: &str) -> Result<(), SchemaError> {
        self.service.delete_class(class_name).await
    }

    async fn get_class_structure(
        &self,
        class_name: &str,
    ) -> Result<Option<Arc<ClassStructure>>, SchemaError> {
        self.service.get_class_structure(class_name).await
    }

    fn invalidate_structure(&self, class_name: &str) {
        self.service.invalidate_structure(class_name);
    }

    fn clear_structures(&self) {
        self.service.clear_structures();
    }
}
