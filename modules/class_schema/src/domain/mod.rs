//! Domain layer - the schema engine
//!
//! Pure pieces (type registry, defaults, comparison, matching, planning,
//! reflection) never touch the database. `TableManager` applies plans through
//! the `DdlExecutor` seam and `ClassService` owns the stored definitions.

pub mod comparison;
pub mod context;
pub mod defaults;
pub mod events;
pub mod matching;
pub mod plan;
pub mod reflection;
pub mod repository;
pub mod service;
pub mod structure;
pub mod table_manager;
pub mod types;

pub use context::SchemaContext;
pub use events::{
    FieldChange, FieldEventScope, FieldEvents, FieldObserver, NoOpFieldObserver, ObserverDecision,
};
pub use plan::{MigrationOptions, MigrationPlan, PrimaryKeyChange, UpsertStep};
pub use repository::{ClassRepository, DdlExecutor, IntrospectedColumn, SchemaIntrospector};
pub use service::ClassService;
pub use structure::{StructureCache, StructureProvider};
pub use table_manager::{MigrationReport, TableManager};
pub use types::{ColumnSpec, DataTypeRegistry, DataTypeSpec, SqlType};
