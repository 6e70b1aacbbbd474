//! Table manager - creates tables from definitions and migrates them
//!
//! Migration order for an update:
//! 1. drop the old primary key constraint (when the key set changes)
//! 2. deletion pass, old declaration order
//! 3. upsert pass, new declaration order
//! 4. one table rebuild when variable-length columns were dropped
//! 5. create the new primary key constraint
//!
//! Callers must serialize migrations of the same table. Nothing here is
//! transactional and failed DDL is never retried.

use super::context::SchemaContext;
use super::events::FieldChange;
use super::matching::validate_unique;
use super::plan::{
    column_spec, drops_variable_length, plan_update, MigrationOptions, MigrationPlan, UpsertStep,
};
use super::reflection::fields_from_columns;
use super::repository::{DdlExecutor, SchemaIntrospector};
use super::types::ColumnSpec;
use crate::contract::{ClassDefinition, ClassIdentity, FieldInfo, SchemaError};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a create or update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub class_name: String,
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
    /// Fields whose DDL an observer skipped
    pub skipped: Vec<String>,
    /// Number of executor calls issued
    pub ddl_statements: usize,
    pub primary_key_rebuilt: bool,
    pub space_reclaimed: bool,
}

impl MigrationReport {
    fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            ..Self::default()
        }
    }

    /// True when no field was touched and no DDL ran
    pub fn is_noop(&self) -> bool {
        self.ddl_statements == 0
            && self.added.is_empty()
            && self.changed.is_empty()
            && self.removed.is_empty()
            && self.skipped.is_empty()
    }
}

pub struct TableManager {
    ctx: SchemaContext,
    executor: Arc<dyn DdlExecutor>,
    introspector: Arc<dyn SchemaIntrospector>,
    options: MigrationOptions,
}

impl TableManager {
    pub fn new(
        ctx: SchemaContext,
        executor: Arc<dyn DdlExecutor>,
        introspector: Arc<dyn SchemaIntrospector>,
        options: MigrationOptions,
    ) -> Self {
        Self {
            ctx,
            executor,
            introspector,
            options,
        }
    }

    pub fn context(&self) -> &SchemaContext {
        &self.ctx
    }

    pub fn options(&self) -> &MigrationOptions {
        &self.options
    }

    /// Plan an update without touching the database
    pub fn plan(
        &self,
        class: &ClassIdentity,
        old: &ClassDefinition,
        new: &ClassDefinition,
    ) -> Result<MigrationPlan, SchemaError> {
        plan_update(&class.class_name, old, new, &self.ctx.registry, &self.options)
    }

    /// Create the physical table of a class.
    ///
    /// The table starts with the first primary key field as its key. All other
    /// fields raise an add event, virtual ones included, and materialized ones
    /// become columns. A composite key replaces the initial one at the end,
    /// or is declared with the table when the executor cannot replace keys.
    pub async fn create_table_by_definition(
        &self,
        class: &ClassIdentity,
        definition: &ClassDefinition,
    ) -> Result<MigrationReport, SchemaError> {
        let result = self.create_table(class, definition).await;
        self.ctx.structures.remove(&class.class_name);
        result
    }

    async fn create_table(
        &self,
        class: &ClassIdentity,
        definition: &ClassDefinition,
    ) -> Result<MigrationReport, SchemaError> {
        validate_unique(&definition.fields)?;
        let key_fields = definition.primary_key_fields();
        let Some(first_key) = key_fields.first().copied() else {
            return Err(SchemaError::NoPrimaryKey {
                class_name: class.class_name.clone(),
            });
        };

        // A backend that cannot replace a key gets the composite key inline
        let inline_keys = key_fields.len() > 1 && !self.executor.replaces_primary_key();
        let table_keys = if inline_keys {
            key_fields.clone()
        } else {
            vec![first_key]
        };

        // Resolve every column up front so type errors precede CREATE TABLE
        let mut key_columns = Vec::with_capacity(table_keys.len());
        for field in &table_keys {
            let mut column = column_spec(field, &self.ctx.registry)?;
            column.nullable = false;
            column.default_value = None;
            column.auto_increment = key_fields.len() == 1
                && self.options.identity_for_single_key
                && column.sql_type.is_integer();
            key_columns.push(column);
        }

        let mut columns: Vec<(&FieldInfo, Option<ColumnSpec>)> = Vec::new();
        for field in &definition.fields {
            if table_keys.iter().any(|key| std::ptr::eq(field, *key)) {
                continue;
            }
            let column = if field.is_materialized() {
                Some(column_spec(field, &self.ctx.registry)?)
            } else {
                None
            };
            columns.push((field, column));
        }

        let mut report = MigrationReport::new(&class.class_name);
        let constraint = self.options.constraint_name(&class.table_name);

        debug!(
            table = %class.table_name,
            keys = ?table_keys.iter().map(|k| k.name.as_str()).collect::<Vec<_>>(),
            "creating table"
        );
        self.executor
            .create_table(&class.table_name, &key_columns, &constraint)
            .await?;
        report.ddl_statements += 1;

        for (field, column) in columns {
            let scope = self
                .ctx
                .events
                .begin(class, FieldChange::Added(field.clone()))?;
            if !scope.should_apply() {
                report.skipped.push(field.name.clone());
                continue;
            }
            if let Some(column) = column {
                self.add_column(class, &column, &mut report).await?;
            }
            report.added.push(field.name.clone());
            scope.complete();
        }

        if key_fields.len() > 1 && !inline_keys {
            let names = definition.primary_key_names();
            self.rebuild_primary_key(class, &constraint, &names, true, &mut report)
                .await?;
        }

        info!(
            class = %class.class_name,
            table = %class.table_name,
            columns = report.added.len() + key_columns.len(),
            ddl = report.ddl_statements,
            "table created"
        );
        Ok(report)
    }

    /// Reconcile the table of a class with a new definition
    pub async fn update_table_by_definition(
        &self,
        class: &ClassIdentity,
        old: &ClassDefinition,
        new: &ClassDefinition,
    ) -> Result<MigrationReport, SchemaError> {
        let result = match self.plan(class, old, new) {
            Ok(plan) => self.apply(class, plan).await,
            Err(e) => Err(e),
        };
        self.ctx.structures.remove(&class.class_name);
        result
    }

    /// Reconcile the table with a new definition, using the live columns of
    /// the table as the old definition
    pub async fn update_table_from_database(
        &self,
        class: &ClassIdentity,
        new: &ClassDefinition,
    ) -> Result<MigrationReport, SchemaError> {
        let primary_key = self
            .introspector
            .primary_key_columns(&class.table_name)
            .await?;
        let columns = self.introspector.columns(&class.table_name).await?;
        let old = fields_from_columns(&columns, &primary_key, &self.ctx.registry);
        debug!(
            table = %class.table_name,
            columns = old.len(),
            "old definition read from database"
        );
        self.update_table_by_definition(class, &old, new).await
    }

    /// Drop the table of a class
    pub async fn drop_table(&self, class: &ClassIdentity) -> Result<(), SchemaError> {
        let result = self.executor.drop_table(&class.table_name).await;
        self.ctx.structures.remove(&class.class_name);
        result?;
        info!(class = %class.class_name, table = %class.table_name, "table dropped");
        Ok(())
    }

    /// Apply a plan produced by [`TableManager::plan`]
    pub async fn apply(
        &self,
        class: &ClassIdentity,
        plan: MigrationPlan,
    ) -> Result<MigrationReport, SchemaError> {
        let mut report = MigrationReport::new(&class.class_name);
        if plan.is_empty() {
            debug!(class = %class.class_name, "definition unchanged");
            return Ok(report);
        }

        let table = class.table_name.as_str();
        let mut reclaim = false;

        if let Some(key) = &plan.primary_key {
            if !key.old.is_empty() {
                debug!(table, old = ?key.old, "dropping primary key");
                self.executor.drop_primary_key(table).await?;
                report.ddl_statements += 1;
            }
        }

        for field in &plan.deletions {
            if self.remove_field(class, field, &mut report).await? == Some(true) {
                reclaim |= drops_variable_length(field, &self.ctx.registry);
            }
        }

        for step in plan.upserts {
            match step {
                UpsertStep::Add { field, column } => {
                    let scope = self
                        .ctx
                        .events
                        .begin(class, FieldChange::Added(field.clone()))?;
                    if !scope.should_apply() {
                        report.skipped.push(field.name);
                        continue;
                    }
                    if let Some(column) = column {
                        self.add_column(class, &column, &mut report).await?;
                    }
                    report.added.push(field.name);
                    scope.complete();
                }
                UpsertStep::Change { old, new, column } => {
                    let change = FieldChange::Changed {
                        old: old.clone(),
                        new: new.clone(),
                    };
                    let scope = self.ctx.events.begin(class, change)?;
                    if !scope.should_apply() {
                        report.skipped.push(new.name);
                        continue;
                    }
                    if let Some(column) = column {
                        debug!(
                            table,
                            from = %old.name,
                            column = %column.name,
                            sql_type = %column.sql_type,
                            "altering column"
                        );
                        self.executor.alter_column(table, &old.name, &column).await?;
                        report.ddl_statements += 1;
                    }
                    report.changed.push(new.name);
                    scope.complete();
                }
                UpsertStep::Rematerialize { old, new, column } => {
                    match self.remove_field(class, &old, &mut report).await? {
                        // old column still in place, adding would collide
                        None => continue,
                        Some(dropped) => {
                            reclaim |= dropped && drops_variable_length(&old, &self.ctx.registry)
                        }
                    }
                    let scope = self
                        .ctx
                        .events
                        .begin(class, FieldChange::Added(new.clone()))?;
                    if !scope.should_apply() {
                        report.skipped.push(new.name);
                        continue;
                    }
                    if let Some(column) = column {
                        self.add_column(class, &column, &mut report).await?;
                    }
                    report.added.push(new.name);
                    scope.complete();
                }
            }
        }

        if reclaim && self.options.reclaim_space_after_drop {
            debug!(table, "rebuilding table to reclaim space");
            self.executor.rebuild_table(table).await?;
            report.ddl_statements += 1;
            report.space_reclaimed = true;
        }

        if let Some(key) = &plan.primary_key {
            let constraint = self.options.constraint_name(table);
            self.rebuild_primary_key(class, &constraint, &key.new, false, &mut report)
                .await?;
        }

        info!(
            class = %class.class_name,
            added = report.added.len(),
            changed = report.changed.len(),
            removed = report.removed.len(),
            skipped = report.skipped.len(),
            ddl = report.ddl_statements,
            "table migrated"
        );
        Ok(report)
    }

    /// Raise the remove event and drop the column of a materialized field.
    /// Returns whether a column was dropped, `None` when an observer skipped.
    async fn remove_field(
        &self,
        class: &ClassIdentity,
        field: &FieldInfo,
        report: &mut MigrationReport,
    ) -> Result<Option<bool>, SchemaError> {
        let scope = self
            .ctx
            .events
            .begin(class, FieldChange::Removed(field.clone()))?;
        if !scope.should_apply() {
            report.skipped.push(field.name.clone());
            return Ok(None);
        }

        let dropped = field.is_materialized();
        if dropped {
            debug!(table = %class.table_name, column = %field.name, "dropping column");
            self.executor
                .drop_column(&class.table_name, &field.name)
                .await?;
            report.ddl_statements += 1;
        }
        report.removed.push(field.name.clone());
        scope.complete();
        Ok(Some(dropped))
    }

    async fn add_column(
        &self,
        class: &ClassIdentity,
        column: &ColumnSpec,
        report: &mut MigrationReport,
    ) -> Result<(), SchemaError> {
        debug!(
            table = %class.table_name,
            column = %column.name,
            sql_type = %column.sql_type,
            nullable = column.nullable,
            "adding column"
        );
        self.executor.add_column(&class.table_name, column).await?;
        report.ddl_statements += 1;
        Ok(())
    }

    async fn rebuild_primary_key(
        &self,
        class: &ClassIdentity,
        constraint: &str,
        columns: &[String],
        drop_existing: bool,
        report: &mut MigrationReport,
    ) -> Result<(), SchemaError> {
        if drop_existing {
            self.executor.drop_primary_key(&class.table_name).await?;
            report.ddl_statements += 1;
        }
        if !columns.is_empty() {
            debug!(table = %class.table_name, constraint, ?columns, "creating primary key");
            self.executor
                .create_primary_key(&class.table_name, constraint, columns)
                .await?;
            report.ddl_statements += 1;
        }
        report.primary_key_rebuilt = true;
        Ok(())
    }
}
