//! SeaORM repository implementations

use crate::contract::DataClass;
use crate::domain::repository::ClassRepository;
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Select};
use std::sync::Arc;

use super::entity;

// ===== Class Repository =====

pub struct SeaOrmClassRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmClassRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

/// Case-insensitive lookup by class name
fn by_name(class_name: &str) -> Select<entity::Entity> {
    entity::Entity::find().filter(
        Expr::expr(Func::lower(Expr::col(entity::Column::ClassName)))
            .eq(class_name.to_lowercase()),
    )
}

#[async_trait]
impl ClassRepository for SeaOrmClassRepository {
    async fn create(&self, class: &DataClass) -> Result<DataClass> {
        let active_model = entity::ActiveModel::try_from(class)?;

        let result = entity::Entity::insert(active_model)
            .exec_with_returning(&*self.db)
            .await?;

        result.try_into()
    }

    async fn find_by_name(&self, class_name: &str) -> Result<Option<DataClass>> {
        let result = by_name(class_name).one(&*self.db).await?;

        match result {
            Some(entity) => Ok(Some(entity.try_into()?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<DataClass>> {
        let results = entity::Entity::find()
            .order_by_asc(entity::Column::ClassName)
            .all(&*self.db)
            .await?;

        results
            .into_iter()
            .map(|e| e.try_into())
            .collect::<Result<Vec<_>>>()
    }

    async fn update(&self, class: &DataClass) -> Result<DataClass> {
        let active_model = entity::ActiveModel::try_from(class)?;

        let result = entity::Entity::update(active_model)
            .exec(&*self.db)
            .await?;

        result.try_into()
    }

    async fn delete(&self, class_name: &str) -> Result<()> {
        entity::Entity::delete_by_id(class_name.to_string())
            .exec(&*self.db)
            .await?;

        Ok(())
    }

    async fn exists(&self, class_name: &str) -> Result<bool> {
        let count = by_name(class_name).count(&*self.db).await?;

        Ok(count > 0)
    }
}
