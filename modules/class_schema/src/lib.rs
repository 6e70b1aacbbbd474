//! Class Schema Module
//!
//! Class/field schema definitions and the table migration engine. A class
//! owns a declarative field list; the engine creates its physical table and
//! reconciles the table incrementally whenever the field list changes.

// Public exports
pub mod contract;
pub use contract::{
    client::ClassSchemaApi, error::SchemaError, ClassDefinition, ClassIdentity, ClassStructure,
    ColumnDefinition, ColumnType, DataClass, FieldInfo, FieldProperties, PropertyValue,
    ReferenceInfo, ReferenceType, StructureSchema,
};

pub mod config;
pub use config::Config;

// Internal modules (hidden from public API)
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
