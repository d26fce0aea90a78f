use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing::info;
use zel_core::prelude::*;

use crate::{
    entity::prelude::*,
    error::ThreadError,
    ids::{CategoryId, ChannelId},
};

/// Where channel references are validated before a post is created.
///
/// The thread store only ever asks whether a channel exists; listing and
/// administering channels belongs to whoever implements this.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    async fn channel_exists(&self, id: ChannelId) -> Result<bool, ThreadError>;
}

/// [`ChannelDirectory`] backed by the local `forum_channel` table.
#[derive(Clone)]
pub struct StoredChannels {
    db: DatabaseConnection,
}

impl StoredChannels {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn shared(db: DatabaseConnection) -> Arc<dyn ChannelDirectory> {
        Arc::new(Self::new(db))
    }
}

#[async_trait]
impl ChannelDirectory for StoredChannels {
    async fn channel_exists(&self, id: ChannelId) -> Result<bool, ThreadError> {
        let count = ForumChannel::find_by_id(id).count(&self.db).await?;
        Ok(count > 0)
    }
}

#[derive(Clone)]
pub struct ChannelsService {
    db: DatabaseConnection,
}

impl ChannelsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a new category
    pub async fn _create_category(&self, name: String) -> Result<ForumCategoryModel, ThreadError> {
        let category = ForumCategoryActiveModel {
            id: Set(CategoryId::new()),
            name: Set(name),
        };

        let result = ForumCategory::insert(category)
            .exec_with_returning(&self.db)
            .await?;

        info!(category = %result.id, name = %result.name, "category created");
        Ok(result)
    }

    /// List all categories by name
    pub async fn _list_categories(&self) -> Result<Vec<ForumCategoryModel>, ThreadError> {
        let categories = ForumCategory::find()
            .order_by_asc(ForumCategoryColumn::Name)
            .all(&self.db)
            .await?;

        Ok(categories)
    }

    /// Create a channel inside a category
    pub async fn _create_channel(
        &self,
        category_id: CategoryId,
        name: String,
    ) -> Result<ForumChannelModel, ThreadError> {
        let category_exists = ForumCategory::find_by_id(category_id)
            .one(&self.db)
            .await?
            .is_some();

        if !category_exists {
            return Err(ThreadError::CategoryNotFound(category_id));
        }

        let channel = ForumChannelActiveModel {
            id: Set(ChannelId::new()),
            category_id: Set(category_id),
            name: Set(name),
        };

        let result = ForumChannel::insert(channel)
            .exec_with_returning(&self.db)
            .await?;

        info!(channel = %result.id, category = %category_id, name = %result.name, "channel created");
        Ok(result)
    }

    /// Get a specific channel by ID
    pub async fn _get_channel(&self, channel_id: ChannelId) -> Result<ForumChannelModel, ThreadError> {
        ForumChannel::find_by_id(channel_id)
            .one(&self.db)
            .await?
            .ok_or(ThreadError::ChannelNotFound(channel_id))
    }

    /// List the channels of a category by name
    pub async fn _list_channels(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<ForumChannelModel>, ThreadError> {
        let channels = ForumChannel::find()
            .filter(ForumChannelColumn::CategoryId.eq(category_id))
            .order_by_asc(ForumChannelColumn::Name)
            .all(&self.db)
            .await?;

        Ok(channels)
    }

    /// Seed a "General" category and channel on an empty directory
    pub async fn _ensure_default_channel(&self) -> Result<Option<ForumChannelModel>, ThreadError> {
        if ForumChannel::find().count(&self.db).await? > 0 {
            return Ok(None);
        }

        let category = self._create_category("General".to_string()).await?;
        let channel = self
            ._create_channel(category.id, "general".to_string())
            .await?;

        Ok(Some(channel))
    }
}

#[zel_service(name = "channels")]
trait Channels {
    #[doc = "Create a new category"]
    #[method(name = "create_category")]
    async fn create_category(&self, name: String) -> Result<ForumCategoryModel, ResourceError>;

    #[doc = "List all categories"]
    #[method(name = "list_categories")]
    async fn list_categories(&self) -> Result<Vec<ForumCategoryModel>, ResourceError>;

    #[doc = "Create a channel inside a category"]
    #[method(name = "create_channel")]
    async fn create_channel(
        &self,
        category_id: CategoryId,
        name: String,
    ) -> Result<ForumChannelModel, ResourceError>;

    #[doc = "Get a specific channel by ID"]
    #[method(name = "get_channel")]
    async fn get_channel(&self, channel_id: ChannelId) -> Result<ForumChannelModel, ResourceError>;

    #[doc = "List the channels of a category"]
    #[method(name = "list_channels")]
    async fn list_channels(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<ForumChannelModel>, ResourceError>;
}

#[async_trait]
impl ChannelsServer for ChannelsService {
    async fn create_category(
        &self,
        _ctx: RequestContext,
        name: String,
    ) -> Result<ForumCategoryModel, ResourceError> {
        Ok(self._create_category(name).await?)
    }

    async fn list_categories(
        &self,
        _ctx: RequestContext,
    ) -> Result<Vec<ForumCategoryModel>, ResourceError> {
        Ok(self._list_categories().await?)
    }

    async fn create_channel(
        &self,
        _ctx: RequestContext,
        category_id: CategoryId,
        name: String,
    ) -> Result<ForumChannelModel, ResourceError> {
        Ok(self._create_channel(category_id, name).await?)
    }

    async fn get_channel(
        &self,
        _ctx: RequestContext,
        channel_id: ChannelId,
    ) -> Result<ForumChannelModel, ResourceError> {
        Ok(self._get_channel(channel_id).await?)
    }

    async fn list_channels(
        &self,
        _ctx: RequestContext,
        category_id: CategoryId,
    ) -> Result<Vec<ForumChannelModel>, ResourceError> {
        Ok(self._list_channels(category_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::migrator::Migrator;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    async fn setup_test_service() -> ChannelsService {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        ChannelsService::new(db)
    }

    #[tokio::test]
    async fn test_create_channel_in_category() {
        let service = setup_test_service().await;

        let category = service._create_category("Games".to_string()).await.unwrap();
        let channel = service
            ._create_channel(category.id, "chess".to_string())
            .await
            .unwrap();

        assert_eq!(channel.category_id, category.id);
        assert_eq!(service._get_channel(channel.id).await.unwrap(), channel);

        let channels = service._list_channels(category.id).await.unwrap();
        assert_eq!(channels, vec![channel]);
    }

    #[tokio::test]
    async fn test_create_channel_in_missing_category_fails() {
        let service = setup_test_service().await;

        let err = service
            ._create_channel(CategoryId::new(), "orphan".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_stored_directory_reports_existence() {
        let service = setup_test_service().await;
        let directory = StoredChannels::new(service.db.clone());

        let category = service._create_category("Games".to_string()).await.unwrap();
        let channel = service
            ._create_channel(category.id, "go".to_string())
            .await
            .unwrap();

        assert!(directory.channel_exists(channel.id).await.unwrap());
        assert!(!directory.channel_exists(ChannelId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_default_channel_is_seeded_once() {
        let service = setup_test_service().await;

        let seeded = service._ensure_default_channel().await.unwrap();
        assert!(seeded.is_some());
        assert!(service._ensure_default_channel().await.unwrap().is_none());

        let categories = service._list_categories().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "General");
    }
}
