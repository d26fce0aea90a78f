use sea_orm_migration::{prelude::*, schema::*};

use super::m20261018_000001_create_categories_table::ForumCategory;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ForumChannel::Table)
                    .col(pk_uuid(ForumChannel::Id))
                    .col(uuid(ForumChannel::CategoryId))
                    .col(string(ForumChannel::Name))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-channel-category_id")
                            .from(ForumChannel::Table, ForumChannel::CategoryId)
                            .to(ForumCategory::Table, ForumCategory::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_channels_category_id")
                    .table(ForumChannel::Table)
                    .col(ForumChannel::CategoryId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ForumChannel::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ForumChannel {
    Table,
    Id,
    CategoryId,
    Name,
}
