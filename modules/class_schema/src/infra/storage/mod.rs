//! Storage layer - class repository, DDL executor and schema introspection

pub mod ddl;
pub mod entity;
pub mod introspection;
pub mod mapper;
pub mod migrations;
pub mod repositories;

pub use ddl::SeaOrmDdlExecutor;
pub use introspection::SeaOrmSchemaIntrospector;
pub use migrations::Migrator;
pub use repositories::SeaOrmClassRepository;
