use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::ids::ChannelId;
use crate::models::migrator::Migrator;
use crate::service::channels::ChannelsService;

/// Create a new in-memory SQLite database with migrations already applied.
/// Each call creates a fresh, isolated database instance.
pub async fn migrated_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Create a migrated SQLite database backed by a fresh temp file.
///
/// `sqlite::memory:` pins the pool to a single connection, which serializes
/// every transaction. A file lets several pooled connections run at once, so
/// tests that race writers against each other get a real interleaving.
pub async fn file_db() -> DatabaseConnection {
    let path = std::env::temp_dir().join(format!("threadline-test-{}.db", uuid::Uuid::now_v7()));
    let db = Database::connect(format!("sqlite://{}?mode=rwc", path.display()))
        .await
        .expect("Failed to create file database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Seed the default category and channel and hand back the channel id.
pub async fn seed_channel(db: &DatabaseConnection) -> ChannelId {
    ChannelsService::new(db.clone())
        ._ensure_default_channel()
        .await
        .expect("Failed to seed channel")
        .expect("Fresh database already had a channel")
        .id
}
