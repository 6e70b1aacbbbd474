//! Domain service - owns class definitions and keeps their tables in sync

use super::context::SchemaContext;
use super::plan::MigrationOptions;
use super::reflection::schema_from_definition;
use super::repository::{ClassRepository, DdlExecutor, SchemaIntrospector};
use super::structure::StructureProvider;
use super::table_manager::{MigrationReport, TableManager};
use crate::contract::{ClassDefinition, ClassIdentity, ClassStructure, DataClass, SchemaError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Per-class edit lock
type ClassLock = Arc<tokio::sync::Mutex<()>>;

/// Domain service for data classes
pub struct ClassService {
    classes: Arc<dyn ClassRepository>,
    tables: TableManager,
    structures: StructureProvider,
    /// Lowercased class name -> lock serializing schema edits of that class
    locks: Mutex<HashMap<String, ClassLock>>,
}

impl ClassService {
    pub fn new(
        ctx: SchemaContext,
        classes: Arc<dyn ClassRepository>,
        executor: Arc<dyn DdlExecutor>,
        introspector: Arc<dyn SchemaIntrospector>,
        options: MigrationOptions,
    ) -> Self {
        let structures = StructureProvider::new(
            ctx.structures.clone(),
            classes.clone(),
            introspector.clone(),
            ctx.registry.clone(),
        );
        Self {
            classes,
            tables: TableManager::new(ctx, executor, introspector, options),
            structures,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &SchemaContext {
        self.tables.context()
    }

    pub fn table_manager(&self) -> &TableManager {
        &self.tables
    }

    fn class_lock(&self, class_name: &str) -> ClassLock {
        self.locks
            .lock()
            .entry(class_name.to_ascii_lowercase())
            .or_default()
            .clone()
    }

    /// Forget the lock of a class once no other task holds or waits on it
    fn release_class_lock(&self, class_name: &str, lock: ClassLock) {
        let key = class_name.to_ascii_lowercase();
        let mut locks = self.locks.lock();
        drop(lock);
        if locks.get(&key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&key);
        }
    }

    /// Number of per-class locks currently tracked
    pub fn lock_count(&self) -> usize {
        self.locks.lock().len()
    }

    // ===== Class Operations =====

    /// Create the table of a new class and store the class
    pub async fn create_class(
        &self,
        class_name: &str,
        table_name: &str,
        definition: ClassDefinition,
    ) -> Result<DataClass, SchemaError> {
        let lock = self.class_lock(class_name);
        let _guard = lock.lock().await;

        if self.classes.exists(class_name).await? {
            return Err(SchemaError::ClassExists {
                class_name: class_name.to_string(),
            });
        }

        let identity = ClassIdentity::new(class_name, table_name);
        // Validates types before the table is created
        let schema = schema_from_definition(table_name, &definition, &self.context().registry)?;
        self.tables
            .create_table_by_definition(&identity, &definition)
            .await?;

        let now = chrono::Utc::now();
        let class = DataClass {
            class_name: class_name.to_string(),
            table_name: table_name.to_string(),
            definition,
            structure: Some(schema),
            created_at: now,
            updated_at: now,
        };
        let stored = self.classes.create(&class).await?;
        self.invalidate_structure(class_name);

        info!(class = class_name, table = table_name, "class created");
        Ok(stored)
    }

    /// Replace the definition of a class and migrate its table
    pub async fn update_definition(
        &self,
        class_name: &str,
        definition: ClassDefinition,
    ) -> Result<(DataClass, MigrationReport), SchemaError> {
        let lock = self.class_lock(class_name);
        let _guard = lock.lock().await;

        let current = self.get_class(class_name).await?;
        let identity = current.identity();
        let report = self
            .tables
            .update_table_by_definition(&identity, &current.definition, &definition)
            .await?;
        self.store_definition(current, definition, &report).await
    }

    /// Migrate the live table of a class to its stored definition, using the
    /// database columns as the old side
    pub async fn sync_from_database(
        &self,
        class_name: &str,
    ) -> Result<(DataClass, MigrationReport), SchemaError> {
        let lock = self.class_lock(class_name);
        let _guard = lock.lock().await;

        let current = self.get_class(class_name).await?;
        let identity = current.identity();
        let definition = current.definition.clone();
        let report = self
            .tables
            .update_table_from_database(&identity, &definition)
            .await?;
        self.store_definition(current, definition, &report).await
    }

    async fn store_definition(
        &self,
        mut class: DataClass,
        definition: ClassDefinition,
        report: &MigrationReport,
    ) -> Result<(DataClass, MigrationReport), SchemaError> {
        class.structure = Some(schema_from_definition(
            &class.table_name,
            &definition,
            &self.context().registry,
        )?);
        class.definition = definition;
        class.updated_at = chrono::Utc::now();

        let stored = self.classes.update(&class).await?;
        self.invalidate_structure(&class.class_name);

        info!(
            class = %class.class_name,
            ddl = report.ddl_statements,
            "class definition stored"
        );
        Ok((stored, report.clone()))
    }

    pub async fn get_class(&self, class_name: &str) -> Result<DataClass, SchemaError> {
        self.classes
            .find_by_name(class_name)
            .await?
            .ok_or_else(|| SchemaError::ClassNotFound {
                class_name: class_name.to_string(),
            })
    }

    pub async fn list_classes(&self) -> Result<Vec<DataClass>, SchemaError> {
        Ok(self.classes.list_all().await?)
    }

    /// Drop the table of a class and forget the class
    pub async fn delete_class(&self, class_name: &str) -> Result<(), SchemaError> {
        let lock = self.class_lock(class_name);
        let guard = lock.lock().await;
        let result = self.drop_class(class_name).await;
        drop(guard);
        self.release_class_lock(class_name, lock);
        result
    }

    async fn drop_class(&self, class_name: &str) -> Result<(), SchemaError> {
        let class = self.get_class(class_name).await?;
        self.tables.drop_table(&class.identity()).await?;
        self.classes.delete(&class.class_name).await?;
        self.invalidate_structure(class_name);

        info!(class = class_name, "class deleted");
        Ok(())
    }

    // ===== Structures =====

    pub async fn get_class_structure(
        &self,
        class_name: &str,
    ) -> Result<Option<Arc<ClassStructure>>, SchemaError> {
        self.structures.get_class_info(class_name).await
    }

    pub fn invalidate_structure(&self, class_name: &str) {
        self.context().structures.remove(class_name);
    }

    pub fn clear_structures(&self) {
        self.context().structures.clear();
    }
}
