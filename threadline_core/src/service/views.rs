use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use tracing::debug;
use zel_core::prelude::*;

use crate::{
    entity::prelude::*,
    error::ThreadError,
    ids::{ActorId, ChannelId, PostId},
    service::{
        authors,
        channels::{ChannelDirectory, StoredChannels},
        reactions,
    },
    thread::{
        deadline::{self, DEFAULT_DEADLINE},
        view::ViewContext,
        NodeRef, PostView, ReplyArena,
    },
};

/// Viewer-personalized nested views of posts and their reply trees.
///
/// Everything a render needs is fetched in a handful of batched queries per
/// call; assembly then walks the in-memory arena.
#[derive(Clone)]
pub struct ViewsService {
    db: DatabaseConnection,
    channels: Arc<dyn ChannelDirectory>,
    deadline: Duration,
}

impl ViewsService {
    pub fn new(db: DatabaseConnection) -> Self {
        let channels = StoredChannels::shared(db.clone());
        Self::with_channels(db, channels)
    }

    pub fn with_channels(db: DatabaseConnection, channels: Arc<dyn ChannelDirectory>) -> Self {
        Self {
            db,
            channels,
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    async fn render(
        &self,
        posts: Vec<ForumPostModel>,
        viewer: Option<ActorId>,
    ) -> Result<Vec<PostView>, ThreadError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<PostId> = posts.iter().map(|post| post.id).collect();
        let arena = ReplyArena::load(&self.db, &post_ids).await?;

        let targets: Vec<NodeRef> = post_ids
            .iter()
            .copied()
            .map(NodeRef::Post)
            .chain(arena.ids().map(NodeRef::Reply))
            .collect();

        let likes = reactions::like_counts(&self.db, &targets).await?;
        let liked = match &viewer {
            Some(viewer) => reactions::liked_by(&self.db, viewer, &targets).await?,
            None => HashSet::new(),
        };

        let author_ids = posts.iter().map(|post| post.author_id.clone()).chain(
            arena
                .ids()
                .filter_map(|id| arena.get(id))
                .map(|reply| reply.author_id.clone()),
        );
        let authors = authors::summaries(&self.db, author_ids).await?;

        let ctx = ViewContext {
            arena: &arena,
            likes: &likes,
            liked: &liked,
            authors: &authors,
        };

        debug!(posts = posts.len(), replies = arena.len(), viewer = ?viewer, "rendering threads");
        Ok(posts.iter().map(|post| ctx.post(post)).collect())
    }

    /// Render one post with its whole reply tree
    pub async fn _render_post(
        &self,
        post_id: PostId,
        viewer: Option<ActorId>,
    ) -> Result<PostView, ThreadError> {
        let post = ForumPost::find_by_id(post_id)
            .one(&self.db)
            .await?
            .ok_or(ThreadError::PostNotFound(post_id))?;

        self.render(vec![post], viewer)
            .await?
            .pop()
            .ok_or(ThreadError::PostNotFound(post_id))
    }

    /// Render every post in a channel, oldest first
    pub async fn _render_channel_posts(
        &self,
        channel_id: ChannelId,
        viewer: Option<ActorId>,
    ) -> Result<Vec<PostView>, ThreadError> {
        if !self.channels.channel_exists(channel_id).await? {
            return Err(ThreadError::ChannelNotFound(channel_id));
        }

        let posts = ForumPost::find()
            .filter(ForumPostColumn::ChannelId.eq(channel_id))
            .order_by_asc(ForumPostColumn::CreatedAt)
            .order_by_asc(ForumPostColumn::Id)
            .all(&self.db)
            .await?;

        self.render(posts, viewer).await
    }
}

#[zel_service(name = "views")]
trait Views {
    #[doc = "Render a post and its reply tree for an optional viewer"]
    #[method(name = "render_post")]
    async fn render_post(
        &self,
        post_id: PostId,
        viewer: Option<ActorId>,
    ) -> Result<PostView, ResourceError>;

    #[doc = "Render every post in a channel for an optional viewer"]
    #[method(name = "render_channel_posts")]
    async fn render_channel_posts(
        &self,
        channel_id: ChannelId,
        viewer: Option<ActorId>,
    ) -> Result<Vec<PostView>, ResourceError>;
}

#[async_trait]
impl ViewsServer for ViewsService {
    async fn render_post(
        &self,
        _ctx: RequestContext,
        post_id: PostId,
        viewer: Option<ActorId>,
    ) -> Result<PostView, ResourceError> {
        Ok(deadline::within(self.deadline, self._render_post(post_id, viewer)).await?)
    }

    async fn render_channel_posts(
        &self,
        _ctx: RequestContext,
        channel_id: ChannelId,
        viewer: Option<ActorId>,
    ) -> Result<Vec<PostView>, ResourceError> {
        let views = deadline::within(
            self.deadline,
            self._render_channel_posts(channel_id, viewer),
        )
        .await?;
        Ok(views)
    }
}
