use sea_orm_migration::prelude::*;

mod m20261018_000001_create_categories_table;
mod m20261018_000002_create_channels_table;
mod m20261018_000003_create_authors_table;
mod m20261018_000004_create_posts_table;
mod m20261018_000005_create_replies_table;
mod m20261018_000006_create_reactions_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261018_000001_create_categories_table::Migration),
            Box::new(m20261018_000002_create_channels_table::Migration),
            Box::new(m20261018_000003_create_authors_table::Migration),
            Box::new(m20261018_000004_create_posts_table::Migration),
            Box::new(m20261018_000005_create_replies_table::Migration),
            Box::new(m20261018_000006_create_reactions_table::Migration),
        ]
    }
}

#[cfg(test)]
use sea_orm::{Database, DbErr};

#[tokio::test]
async fn test_migrations_okay() -> Result<(), DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    let schema_manager = SchemaManager::new(&db);

    Migrator::refresh(&db).await?;

    assert!(schema_manager.has_table("forum_category").await?);
    assert!(schema_manager.has_table("forum_channel").await?);
    assert!(schema_manager.has_table("forum_author").await?);
    assert!(schema_manager.has_table("forum_post").await?);
    assert!(schema_manager.has_table("forum_reply").await?);
    assert!(schema_manager.has_table("forum_reaction").await?);

    Ok(())
}
