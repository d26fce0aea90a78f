use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // channel_id is checked against the channel directory, not a foreign key:
        // the directory may live outside this database.
        manager
            .create_table(
                Table::create()
                    .table(ForumPost::Table)
                    .col(pk_uuid(ForumPost::Id))
                    .col(string(ForumPost::AuthorId))
                    .col(uuid(ForumPost::ChannelId))
                    .col(string(ForumPost::Title))
                    .col(text(ForumPost::Body))
                    .col(string(ForumPost::CreatedAt))
                    .col(boolean(ForumPost::Edited))
                    .col(string_null(ForumPost::EditedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posts_channel_id")
                    .table(ForumPost::Table)
                    .col(ForumPost::ChannelId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posts_author_id")
                    .table(ForumPost::Table)
                    .col(ForumPost::AuthorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posts_created_at")
                    .table(ForumPost::Table)
                    .col(ForumPost::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ForumPost::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ForumPost {
    Table,
    Id,
    AuthorId,
    ChannelId,
    Title,
    Body,
    CreatedAt,
    Edited,
    EditedAt,
}
