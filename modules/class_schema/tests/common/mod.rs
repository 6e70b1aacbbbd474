//! Common test utilities: recording mocks for the database seams and shared
//! class fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use class_schema::contract::*;
use class_schema::domain::{
    ClassRepository, ClassService, ColumnSpec, DataTypeRegistry, DdlExecutor, FieldChange,
    FieldObserver, IntrospectedColumn, MigrationOptions, ObserverDecision, SchemaContext,
    SchemaIntrospector, TableManager,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

/// Interleaved log of observer hooks and DDL calls
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

// ===== DDL executor =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlCall {
    CreateTable {
        table: String,
        keys: Vec<ColumnSpec>,
        constraint: String,
    },
    AddColumn {
        table: String,
        column: ColumnSpec,
    },
    AlterColumn {
        table: String,
        old_name: String,
        column: ColumnSpec,
    },
    DropColumn {
        table: String,
        column: String,
    },
    DropPrimaryKey {
        table: String,
    },
    CreatePrimaryKey {
        table: String,
        constraint: String,
        columns: Vec<String>,
    },
    RebuildTable {
        table: String,
    },
    DropTable {
        table: String,
    },
}

impl DdlCall {
    /// Short form used in the journal, e.g. `add_column:Title`
    pub fn label(&self) -> String {
        match self {
            Self::CreateTable { keys, .. } => {
                let names: Vec<&str> = keys.iter().map(|k| k.name.as_str()).collect();
                format!("create_table:{}", names.join(","))
            }
            Self::AddColumn { column, .. } => format!("add_column:{}", column.name),
            Self::AlterColumn {
                old_name, column, ..
            } => format!("alter_column:{}->{}", old_name, column.name),
            Self::DropColumn { column, .. } => format!("drop_column:{}", column),
            Self::DropPrimaryKey { .. } => "drop_primary_key".to_string(),
            Self::CreatePrimaryKey { columns, .. } => {
                format!("create_primary_key:{}", columns.join(","))
            }
            Self::RebuildTable { .. } => "rebuild_table".to_string(),
            Self::DropTable { table } => format!("drop_table:{}", table),
        }
    }
}

/// Records every call; optionally fails calls whose label starts with a prefix
pub struct RecordingDdlExecutor {
    calls: Mutex<Vec<DdlCall>>,
    journal: Journal,
    fail_on: Mutex<Option<String>>,
    fixed_primary_key: Mutex<bool>,
}

impl RecordingDdlExecutor {
    pub fn new(journal: Journal) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            journal,
            fail_on: Mutex::new(None),
            fixed_primary_key: Mutex::new(false),
        }
    }

    /// Behave like a backend that cannot replace an existing primary key
    pub fn fix_primary_key(&self) {
        *self.fixed_primary_key.lock() = true;
    }

    pub fn fail_on(&self, label_prefix: &str) {
        *self.fail_on.lock() = Some(label_prefix.to_string());
    }

    pub fn calls(&self) -> Vec<DdlCall> {
        self.calls.lock().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.calls.lock().iter().map(DdlCall::label).collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: DdlCall) -> anyhow::Result<()> {
        let label = call.label();
        if let Some(prefix) = self.fail_on.lock().as_deref() {
            if label.starts_with(prefix) {
                anyhow::bail!("simulated failure: {}", label);
            }
        }
        self.journal.lock().push(format!("ddl:{}", label));
        self.calls.lock().push(call);
        Ok(())
    }
}

#[async_trait]
impl DdlExecutor for RecordingDdlExecutor {
    async fn create_table(
        &self,
        table: &str,
        keys: &[ColumnSpec],
        constraint_name: &str,
    ) -> anyhow::Result<()> {
        self.record(DdlCall::CreateTable {
            table: table.to_string(),
            keys: keys.to_vec(),
            constraint: constraint_name.to_string(),
        })
    }

    fn replaces_primary_key(&self) -> bool {
        !*self.fixed_primary_key.lock()
    }

    async fn drop_primary_key(&self, table: &str) -> anyhow::Result<()> {
        if *self.fixed_primary_key.lock() {
            anyhow::bail!("cannot drop the primary key of table '{}'", table);
        }
        self.record(DdlCall::DropPrimaryKey {
            table: table.to_string(),
        })
    }

    async fn add_column(&self, table: &str, column: &ColumnSpec) -> anyhow::Result<()> {
        self.record(DdlCall::AddColumn {
            table: table.to_string(),
            column: column.clone(),
        })
    }

    async fn alter_column(
        &self,
        table: &str,
        old_name: &str,
        column: &ColumnSpec,
    ) -> anyhow::Result<()> {
        self.record(DdlCall::AlterColumn {
            table: table.to_string(),
            old_name: old_name.to_string(),
            column: column.clone(),
        })
    }

    async fn drop_column(&self, table: &str, column: &str) -> anyhow::Result<()> {
        self.record(DdlCall::DropColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
    }

    async fn create_primary_key(
        &self,
        table: &str,
        constraint_name: &str,
        columns: &[String],
    ) -> anyhow::Result<()> {
        self.record(DdlCall::CreatePrimaryKey {
            table: table.to_string(),
            constraint: constraint_name.to_string(),
            columns: columns.to_vec(),
        })
    }

    async fn rebuild_table(&self, table: &str) -> anyhow::Result<()> {
        self.record(DdlCall::RebuildTable {
            table: table.to_string(),
        })
    }

    async fn drop_table(&self, table: &str) -> anyhow::Result<()> {
        self.record(DdlCall::DropTable {
            table: table.to_string(),
        })
    }
}

// ===== Schema introspector =====

/// Serves fixed primary key and column metadata for every table
#[derive(Default)]
pub struct StaticIntrospector {
    primary_key: RwLock<Vec<String>>,
    columns: RwLock<Vec<IntrospectedColumn>>,
    primary_key_requests: Mutex<usize>,
    hold: Mutex<Option<Gate>>,
}

/// Pauses one primary key lookup: `entered` fires when the lookup starts and
/// the lookup resumes on `release`
#[derive(Clone, Default)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl StaticIntrospector {
    pub fn set_primary_key(&self, columns: &[&str]) {
        *self.primary_key.write() = columns.iter().map(|c| c.to_string()).collect();
    }

    pub fn set_columns(&self, columns: Vec<IntrospectedColumn>) {
        *self.columns.write() = columns;
    }

    pub fn primary_key_requests(&self) -> usize {
        *self.primary_key_requests.lock()
    }

    /// Hold the next primary key lookup until the gate is released
    pub fn hold_next_primary_key(&self) -> Gate {
        let gate = Gate::default();
        *self.hold.lock() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl SchemaIntrospector for StaticIntrospector {
    async fn primary_key_columns(&self, _table: &str) -> anyhow::Result<Vec<String>> {
        *self.primary_key_requests.lock() += 1;
        let gate = self.hold.lock().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        Ok(self.primary_key.read().clone())
    }

    async fn columns(&self, _table: &str) -> anyhow::Result<Vec<IntrospectedColumn>> {
        Ok(self.columns.read().clone())
    }
}

pub fn introspected(name: &str, data_type: &str, nullable: bool) -> IntrospectedColumn {
    IntrospectedColumn {
        name: name.to_string(),
        data_type: data_type.to_string(),
        max_length: None,
        numeric_precision: None,
        numeric_scale: None,
        nullable,
        default_value: None,
    }
}

// ===== Class repository =====

#[derive(Default)]
pub struct MockClassRepository {
    data: RwLock<HashMap<String, DataClass>>,
}

impl MockClassRepository {
    pub fn count(&self) -> usize {
        self.data.read().len()
    }
}

#[async_trait]
impl ClassRepository for MockClassRepository {
    async fn create(&self, class: &DataClass) -> anyhow::Result<DataClass> {
        self.data
            .write()
            .insert(class.class_name.to_lowercase(), class.clone());
        Ok(class.clone())
    }

    async fn find_by_name(&self, class_name: &str) -> anyhow::Result<Option<DataClass>> {
        Ok(self.data.read().get(&class_name.to_lowercase()).cloned())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<DataClass>> {
        let mut classes: Vec<DataClass> = self.data.read().values().cloned().collect();
        classes.sort_by(|a, b| a.class_name.cmp(&b.class_name));
        Ok(classes)
    }

    async fn update(&self, class: &DataClass) -> anyhow::Result<DataClass> {
        let key = class.class_name.to_lowercase();
        let mut data = self.data.write();
        if !data.contains_key(&key) {
            anyhow::bail!("class {} not stored", class.class_name);
        }
        data.insert(key, class.clone());
        Ok(class.clone())
    }

    async fn delete(&self, class_name: &str) -> anyhow::Result<()> {
        self.data.write().remove(&class_name.to_lowercase());
        Ok(())
    }

    async fn exists(&self, class_name: &str) -> anyhow::Result<bool> {
        Ok(self.data.read().contains_key(&class_name.to_lowercase()))
    }
}

// ===== Field observer =====

/// Journals every hook; returns configured decisions per field name
pub struct RecordingObserver {
    journal: Journal,
    decisions: Mutex<HashMap<String, ObserverDecision>>,
}

impl RecordingObserver {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            decisions: Mutex::new(HashMap::new()),
        }
    }

    pub fn decide(&self, field: &str, decision: ObserverDecision) {
        self.decisions.lock().insert(field.to_string(), decision);
    }

    fn decision(&self, field: &str) -> ObserverDecision {
        self.decisions
            .lock()
            .get(field)
            .cloned()
            .unwrap_or(ObserverDecision::Continue)
    }
}

impl FieldObserver for RecordingObserver {
    fn before_add(&self, _class: &ClassIdentity, field: &FieldInfo) -> ObserverDecision {
        self.journal.lock().push(format!("add:{}", field.name));
        self.decision(&field.name)
    }

    fn before_remove(&self, _class: &ClassIdentity, field: &FieldInfo) -> ObserverDecision {
        self.journal.lock().push(format!("remove:{}", field.name));
        self.decision(&field.name)
    }

    fn before_change(
        &self,
        _class: &ClassIdentity,
        old: &FieldInfo,
        new: &FieldInfo,
    ) -> ObserverDecision {
        self.journal
            .lock()
            .push(format!("change:{}->{}", old.name, new.name));
        self.decision(&new.name)
    }

    fn after_apply(&self, _class: &ClassIdentity, change: &FieldChange, applied: bool) {
        self.journal
            .lock()
            .push(format!("after:{}:{}", change.field_name(), applied));
    }
}

// ===== Harness =====

/// Engine wired to recording mocks
pub struct Harness {
    pub ctx: SchemaContext,
    pub journal: Journal,
    pub executor: Arc<RecordingDdlExecutor>,
    pub introspector: Arc<StaticIntrospector>,
    pub classes: Arc<MockClassRepository>,
    pub observer: Arc<RecordingObserver>,
}

impl Harness {
    pub fn new() -> Self {
        let journal = journal();
        let ctx = SchemaContext::new(DataTypeRegistry::with_defaults());
        let observer = Arc::new(RecordingObserver::new(journal.clone()));
        ctx.events.register(observer.clone());
        Self {
            ctx,
            executor: Arc::new(RecordingDdlExecutor::new(journal.clone())),
            introspector: Arc::new(StaticIntrospector::default()),
            classes: Arc::new(MockClassRepository::default()),
            observer,
            journal,
        }
    }

    pub fn table_manager(&self) -> TableManager {
        self.table_manager_with(MigrationOptions::default())
    }

    pub fn table_manager_with(&self, options: MigrationOptions) -> TableManager {
        TableManager::new(
            self.ctx.clone(),
            self.executor.clone(),
            self.introspector.clone(),
            options,
        )
    }

    pub fn service(&self) -> ClassService {
        ClassService::new(
            self.ctx.clone(),
            self.classes.clone(),
            self.executor.clone(),
            self.introspector.clone(),
            MigrationOptions::default(),
        )
    }

    /// Journal entries produced by observers only
    pub fn events(&self) -> Vec<String> {
        self.journal
            .lock()
            .iter()
            .filter(|e| !e.starts_with("ddl:"))
            .cloned()
            .collect()
    }

    pub fn timeline(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    pub fn reset(&self) {
        self.journal.lock().clear();
        self.executor.clear();
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

// ===== Fixtures =====

pub fn user_class() -> ClassIdentity {
    ClassIdentity::new("cms.user", "CMS_User")
}

pub fn guid(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

pub fn id_field() -> FieldInfo {
    FieldInfo::new("UserID", "integer")
        .with_guid(guid(1))
        .as_primary_key()
}

pub fn text_field(name: &str, n: u128, size: u32) -> FieldInfo {
    FieldInfo::new(name, "text").with_guid(guid(n)).with_size(size)
}

pub fn definition(fields: Vec<FieldInfo>) -> ClassDefinition {
    ClassDefinition::new(fields)
}

/// A user class with key, name, email and an external full name
pub fn user_definition() -> ClassDefinition {
    definition(vec![
        id_field(),
        text_field("UserName", 2, 100).with_allow_empty(false),
        text_field("Email", 3, 254),
        text_field("FullName", 4, 450).as_external(),
    ])
}
