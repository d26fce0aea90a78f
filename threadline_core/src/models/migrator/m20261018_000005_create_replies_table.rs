use sea_orm_migration::{prelude::*, schema::*};

use super::m20261018_000004_create_posts_table::ForumPost;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // No ON DELETE action on either key: subtrees are removed leaf-first by
        // the cascade deleter, so a parent row can never vanish under a child.
        manager
            .create_table(
                Table::create()
                    .table(ForumReply::Table)
                    .col(pk_uuid(ForumReply::Id))
                    .col(string(ForumReply::AuthorId))
                    .col(uuid(ForumReply::PostId))
                    .col(uuid_null(ForumReply::ParentReplyId))
                    .col(integer(ForumReply::Depth))
                    .col(text(ForumReply::Body))
                    .col(string(ForumReply::CreatedAt))
                    .col(boolean(ForumReply::Edited))
                    .col(string_null(ForumReply::EditedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reply-post_id")
                            .from(ForumReply::Table, ForumReply::PostId)
                            .to(ForumPost::Table, ForumPost::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reply-parent_reply_id")
                            .from(ForumReply::Table, ForumReply::ParentReplyId)
                            .to(ForumReply::Table, ForumReply::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_replies_post_id")
                    .table(ForumReply::Table)
                    .col(ForumReply::PostId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_replies_parent_reply_id")
                    .table(ForumReply::Table)
                    .col(ForumReply::ParentReplyId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ForumReply::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ForumReply {
    Table,
    Id,
    AuthorId,
    PostId,
    ParentReplyId,
    Depth,
    Body,
    CreatedAt,
    Edited,
    EditedAt,
}
