//! SeaORM entities for database tables

use sea_orm::entity::prelude::*;

/// Data class table entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "cms_class")]
pub struct Model {
    /// Class name as registered; lookups ignore case
    #[sea_orm(primary_key, auto_increment = false)]
    pub class_name: String,

    /// Physical table the class is materialized in
    pub table_name: String,

    /// Field definition document
    pub definition: Json,

    /// Structured schema description, regenerated after each migration
    pub structure_schema: Option<Json>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
