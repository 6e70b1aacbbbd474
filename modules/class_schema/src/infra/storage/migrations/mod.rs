//! Database migrations for the class schema engine

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250301_000001_create_cms_class::Migration)]
    }
}

mod m20250301_000001_create_cms_class {
    use super::*;

    #[derive(DeriveMigrationName)]
    pub struct Migration;

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CmsClass::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CmsClass::ClassName)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(CmsClass::TableName).string().not_null())
                        .col(ColumnDef::new(CmsClass::Definition).json().not_null())
                        .col(ColumnDef::new(CmsClass::StructureSchema).json())
                        .col(
                            ColumnDef::new(CmsClass::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(
                            ColumnDef::new(CmsClass::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_cms_class_table_name")
                        .table(CmsClass::Table)
                        .col(CmsClass::TableName)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CmsClass::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CmsClass {
        Table,
        ClassName,
        TableName,
        Definition,
        StructureSchema,
        CreatedAt,
        UpdatedAt,
    }
}
