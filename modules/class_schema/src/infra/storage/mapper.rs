//! Entity to model mappers
//!
//! Definitions and schema descriptions are stored in their document form.

use super::entity;
use crate::api::document::{
    definition_from_value, definition_to_value, structure_schema_from_value,
    structure_schema_to_value,
};
use crate::contract::DataClass;

impl TryFrom<entity::Model> for DataClass {
    type Error = anyhow::Error;

    fn try_from(entity: entity::Model) -> Result<Self, Self::Error> {
        let definition = definition_from_value(entity.definition)?;
        let structure = entity
            .structure_schema
            .map(structure_schema_from_value)
            .transpose()?;

        Ok(Self {
            class_name: entity.class_name,
            table_name: entity.table_name,
            definition,
            structure,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

impl TryFrom<&DataClass> for entity::ActiveModel {
    type Error = anyhow::Error;

    fn try_from(model: &DataClass) -> Result<Self, Self::Error> {
        use sea_orm::ActiveValue::Set;

        Ok(Self {
            class_name: Set(model.class_name.clone()),
            table_name: Set(model.table_name.clone()),
            definition: Set(definition_to_value(&model.definition)?),
            structure_schema: Set(model
                .structure
                .as_ref()
                .map(structure_schema_to_value)
                .transpose()?),
            created_at: Set(model.created_at),
            updated_at: Set(model.updated_at),
        })
    }
}
