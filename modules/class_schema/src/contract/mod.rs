//! Contract layer - public API for inter-module communication
//!
//! This layer contains transport-agnostic models and the native client trait.
//! NO serde derives on models - these are pure domain types.

pub mod client;
pub mod error;
pub mod model;

pub use client::ClassSchemaApi;
pub use error::SchemaError;
pub use model::{
    ClassDefinition, ClassIdentity, ClassStructure, ColumnDefinition, ColumnType, DataClass,
    FieldInfo, FieldProperties, PropertyValue, ReferenceInfo, ReferenceType, SchemaColumn,
    StructureSchema,
};
