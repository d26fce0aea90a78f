use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ForumAuthor::Table)
                    .col(string(ForumAuthor::Id).primary_key())
                    .col(string(ForumAuthor::DisplayName))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ForumAuthor::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ForumAuthor {
    Table,
    Id,
    DisplayName,
}
