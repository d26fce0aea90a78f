use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ForumReaction::Table)
                    .col(pk_uuid(ForumReaction::Id))
                    .col(string(ForumReaction::ActorId))
                    .col(string(ForumReaction::TargetKind))
                    .col(uuid(ForumReaction::TargetId))
                    .col(string(ForumReaction::Kind))
                    .col(string(ForumReaction::ReactedAt))
                    .to_owned(),
            )
            .await?;

        // At most one reaction per (actor, target)
        manager
            .create_index(
                Index::create()
                    .name("idx_reactions_actor_target")
                    .table(ForumReaction::Table)
                    .col(ForumReaction::ActorId)
                    .col(ForumReaction::TargetKind)
                    .col(ForumReaction::TargetId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reactions_target")
                    .table(ForumReaction::Table)
                    .col(ForumReaction::TargetKind)
                    .col(ForumReaction::TargetId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ForumReaction::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ForumReaction {
    Table,
    Id,
    ActorId,
    TargetKind,
    TargetId,
    Kind,
    ReactedAt,
}
