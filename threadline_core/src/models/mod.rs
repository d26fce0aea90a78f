use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::config::ThreadConfig;

pub mod migrator;

pub async fn open_or_create_db(config: &ThreadConfig) -> Result<DatabaseConnection, DbErr> {
    // sqlx enables SQLite foreign keys on every pooled connection, which the
    // reply tree relies on to reject children of deleted parents.
    let connection_string = format!("sqlite://{}?mode=rwc", config.database_path().display());
    debug!(%connection_string, "opening database");

    Database::connect(&connection_string).await
}

pub async fn migrate_up(db: &DatabaseConnection) -> Result<(), DbErr> {
    migrator::Migrator::up(db, None).await?;
    info!("database migrations applied");
    Ok(())
}
