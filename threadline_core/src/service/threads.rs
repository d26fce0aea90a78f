use std::sync::Arc;
use std::time::Duration;

use sea_orm::{prelude::Uuid, DatabaseConnection};
use tracing::{debug, info};
use zel_core::prelude::*;

use crate::{
    entity::prelude::*,
    error::ThreadError,
    ids::{ActorId, ChannelId, PostId, ReplyId},
    service::channels::{ChannelDirectory, StoredChannels},
    thread::{
        cascade,
        deadline::{self, DEFAULT_DEADLINE},
        depth::child_depth,
        timestamp, DeleteReport, NodeRef,
    },
};

/// Only the creator may touch a node.
fn ensure_author(actor: &ActorId, author: &ActorId) -> Result<(), ThreadError> {
    if actor != author {
        return Err(ThreadError::Forbidden {
            actor: actor.clone(),
        });
    }
    Ok(())
}

/// An update that matched no row means the node was deleted after it was
/// read; report that as `not_found` rather than a storage failure.
fn vanished_as(err: DbErr, not_found: ThreadError) -> ThreadError {
    match err {
        DbErr::RecordNotUpdated => not_found,
        err => err.into(),
    }
}

/// Posts and their reply trees.
#[derive(Clone)]
pub struct ThreadsService {
    db: DatabaseConnection,
    channels: Arc<dyn ChannelDirectory>,
    deadline: Duration,
}

impl ThreadsService {
    pub fn new(db: DatabaseConnection) -> Self {
        let channels = StoredChannels::shared(db.clone());
        Self::with_channels(db, channels)
    }

    /// Validate channel references against another directory.
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

    /// Create a new post in a channel
    pub async fn _create_post(
        &self,
        actor: ActorId,
        channel_id: ChannelId,
        title: String,
        body: String,
    ) -> Result<ForumPostModel, ThreadError> {
        if !self.channels.channel_exists(channel_id).await? {
            return Err(ThreadError::ChannelNotFound(channel_id));
        }

        let post = ForumPostActiveModel {
            id: Set(PostId::new()),
            author_id: Set(actor),
            channel_id: Set(channel_id),
            title: Set(title),
            body: Set(body),
            created_at: Set(timestamp()),
            edited: Set(false),
            edited_at: Set(None),
        };

        let result = ForumPost::insert(post)
            .exec_with_returning(&self.db)
            .await?;

        info!(post = %result.id, channel = %channel_id, author = %result.author_id, "post created");
        Ok(result)
    }

    /// Get a specific post by ID
    pub async fn _get_post(&self, post_id: PostId) -> Result<ForumPostModel, ThreadError> {
        ForumPost::find_by_id(post_id)
            .one(&self.db)
            .await?
            .ok_or(ThreadError::PostNotFound(post_id))
    }

    /// Replace a post's title and body (only by author)
    pub async fn _update_post_content(
        &self,
        actor: ActorId,
        post_id: PostId,
        title: String,
        body: String,
    ) -> Result<ForumPostModel, ThreadError> {
        let txn = self.db.begin().await?;

        let post = ForumPost::find_by_id(post_id)
            .one(&txn)
            .await?
            .ok_or(ThreadError::PostNotFound(post_id))?;
        ensure_author(&actor, &post.author_id)?;

        let mut post_active: ForumPostActiveModel = post.into();
        post_active.title = Set(title);
        post_active.body = Set(body);
        post_active.edited = Set(true);
        post_active.edited_at = Set(Some(timestamp()));

        let updated = post_active
            .update(&txn)
            .await
            .map_err(|err| vanished_as(err, ThreadError::PostNotFound(post_id)))?;
        txn.commit().await?;

        debug!(post = %post_id, "post edited");
        Ok(updated)
    }

    /// List posts in a channel, oldest first
    pub async fn _list_channel_posts(
        &self,
        channel_id: ChannelId,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<ForumPostModel>, ThreadError> {
        if !self.channels.channel_exists(channel_id).await? {
            return Err(ThreadError::ChannelNotFound(channel_id));
        }

        let posts = ForumPost::find()
            .filter(ForumPostColumn::ChannelId.eq(channel_id))
            .order_by_asc(ForumPostColumn::CreatedAt)
            .order_by_asc(ForumPostColumn::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;

        Ok(posts)
    }

    /// Reply to a post, or to another reply under the same post.
    ///
    /// The parent lookup and the insert share one transaction; the
    /// `parent_reply_id` foreign key rejects the insert if a concurrent
    /// cascade removed the parent in between.
    pub async fn _create_reply(
        &self,
        actor: ActorId,
        post_id: PostId,
        parent_reply_id: Option<ReplyId>,
        body: String,
    ) -> Result<ForumReplyModel, ThreadError> {
        let txn = self.db.begin().await?;

        if ForumPost::find_by_id(post_id).one(&txn).await?.is_none() {
            return Err(ThreadError::PostNotFound(post_id));
        }

        let parent_depth = match parent_reply_id {
            None => None,
            Some(parent_id) => {
                let parent = ForumReply::find_by_id(parent_id)
                    .one(&txn)
                    .await?
                    .filter(|parent| parent.post_id == post_id)
                    .ok_or(ThreadError::ReplyNotFound(parent_id))?;
                Some(parent.depth)
            }
        };
        let depth = child_depth(parent_depth)?;

        let reply = ForumReplyActiveModel {
            id: Set(ReplyId::new()),
            author_id: Set(actor),
            post_id: Set(post_id),
            parent_reply_id: Set(parent_reply_id),
            depth: Set(depth),
            body: Set(body),
            created_at: Set(timestamp()),
            edited: Set(false),
            edited_at: Set(None),
        };

        let result = ForumReply::insert(reply)
            .exec_with_returning(&txn)
            .await
            .map_err(|err| {
                let err = ThreadError::from(err);
                if !err.is_foreign_key_violation() {
                    return err;
                }
                match parent_reply_id {
                    Some(parent_id) => ThreadError::ReplyNotFound(parent_id),
                    None => ThreadError::PostNotFound(post_id),
                }
            })?;

        txn.commit().await?;

        info!(reply = %result.id, post = %post_id, depth, "reply created");
        Ok(result)
    }

    /// Get a specific reply by ID
    pub async fn _get_reply(&self, reply_id: ReplyId) -> Result<ForumReplyModel, ThreadError> {
        ForumReply::find_by_id(reply_id)
            .one(&self.db)
            .await?
            .ok_or(ThreadError::ReplyNotFound(reply_id))
    }

    /// Replace a reply's body (only by author)
    pub async fn _update_reply_content(
        &self,
        actor: ActorId,
        reply_id: ReplyId,
        body: String,
    ) -> Result<ForumReplyModel, ThreadError> {
        let txn = self.db.begin().await?;

        let reply = ForumReply::find_by_id(reply_id)
            .one(&txn)
            .await?
            .ok_or(ThreadError::ReplyNotFound(reply_id))?;
        ensure_author(&actor, &reply.author_id)?;

        let mut reply_active: ForumReplyActiveModel = reply.into();
        reply_active.body = Set(body);
        reply_active.edited = Set(true);
        reply_active.edited_at = Set(Some(timestamp()));

        let updated = reply_active
            .update(&txn)
            .await
            .map_err(|err| vanished_as(err, ThreadError::ReplyNotFound(reply_id)))?;
        txn.commit().await?;

        debug!(reply = %reply_id, "reply edited");
        Ok(updated)
    }

    /// Every reply under a post at any depth, in creation order
    pub async fn _list_post_replies(
        &self,
        post_id: PostId,
    ) -> Result<Vec<ForumReplyModel>, ThreadError> {
        self._get_post(post_id).await?;

        let replies = ForumReply::find()
            .filter(ForumReplyColumn::PostId.eq(post_id))
            .order_by_asc(ForumReplyColumn::CreatedAt)
            .order_by_asc(ForumReplyColumn::Id)
            .all(&self.db)
            .await?;

        Ok(replies)
    }

    /// Direct children of a reply, in creation order
    pub async fn _list_child_replies(
        &self,
        reply_id: ReplyId,
    ) -> Result<Vec<ForumReplyModel>, ThreadError> {
        self._get_reply(reply_id).await?;

        let replies = ForumReply::find()
            .filter(ForumReplyColumn::ParentReplyId.eq(reply_id))
            .order_by_asc(ForumReplyColumn::CreatedAt)
            .order_by_asc(ForumReplyColumn::Id)
            .all(&self.db)
            .await?;

        Ok(replies)
    }

    /// Count every reply under a post
    pub async fn _count_replies(&self, post_id: PostId) -> Result<u64, ThreadError> {
        let count = ForumReply::find()
            .filter(ForumReplyColumn::PostId.eq(post_id))
            .count(&self.db)
            .await?;

        Ok(count)
    }

    /// Delete a post or reply with everything beneath it (only by author of the root)
    pub async fn _delete_subtree(
        &self,
        root: NodeRef,
        actor: ActorId,
    ) -> Result<DeleteReport, ThreadError> {
        let txn = self.db.begin().await?;

        let report = match root {
            NodeRef::Post(post_id) => {
                let post = ForumPost::find_by_id(post_id)
                    .one(&txn)
                    .await?
                    .ok_or(ThreadError::PostNotFound(post_id))?;
                ensure_author(&actor, &post.author_id)?;
                cascade::delete_post_tree(&txn, post_id).await?
            }
            NodeRef::Reply(reply_id) => {
                let reply = ForumReply::find_by_id(reply_id)
                    .one(&txn)
                    .await?
                    .ok_or(ThreadError::ReplyNotFound(reply_id))?;
                ensure_author(&actor, &reply.author_id)?;
                cascade::delete_reply_tree(&txn, &reply).await?
            }
        };

        txn.commit().await?;

        info!(
            %root,
            posts = report.posts,
            replies = report.replies,
            reactions = report.reactions,
            "subtree deleted"
        );
        Ok(report)
    }
}

#[zel_service(name = "threads")]
trait Threads {
    #[doc = "Create a new post in a channel"]
    #[method(name = "create_post")]
    async fn create_post(
        &self,
        actor: ActorId,
        channel_id: ChannelId,
        title: String,
        body: String,
    ) -> Result<ForumPostModel, ResourceError>;

    #[doc = "Get a specific post by ID"]
    #[method(name = "get_post")]
    async fn get_post(&self, post_id: PostId) -> Result<ForumPostModel, ResourceError>;

    #[doc = "Replace a post's title and body (only by author)"]
    #[method(name = "update_post_content")]
    async fn update_post_content(
        &self,
        actor: ActorId,
        post_id: PostId,
        title: String,
        body: String,
    ) -> Result<ForumPostModel, ResourceError>;

    #[doc = "List posts in a channel with pagination"]
    #[method(name = "list_channel_posts")]
    async fn list_channel_posts(
        &self,
        channel_id: ChannelId,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<ForumPostModel>, ResourceError>;

    #[doc = "Reply to a post or to another reply"]
    #[method(name = "create_reply")]
    async fn create_reply(
        &self,
        actor: ActorId,
        post_id: PostId,
        parent_reply_id: Option<ReplyId>,
        body: String,
    ) -> Result<ForumReplyModel, ResourceError>;

    #[doc = "Get a specific reply by ID"]
    #[method(name = "get_reply")]
    async fn get_reply(&self, reply_id: ReplyId) -> Result<ForumReplyModel, ResourceError>;

    #[doc = "Replace a reply's body (only by author)"]
    #[method(name = "update_reply_content")]
    async fn update_reply_content(
        &self,
        actor: ActorId,
        reply_id: ReplyId,
        body: String,
    ) -> Result<ForumReplyModel, ResourceError>;

    #[doc = "List every reply under a post"]
    #[method(name = "list_post_replies")]
    async fn list_post_replies(&self, post_id: PostId)
        -> Result<Vec<ForumReplyModel>, ResourceError>;

    #[doc = "List the direct children of a reply"]
    #[method(name = "list_child_replies")]
    async fn list_child_replies(
        &self,
        reply_id: ReplyId,
    ) -> Result<Vec<ForumReplyModel>, ResourceError>;

    #[doc = "Count every reply under a post"]
    #[method(name = "count_replies")]
    async fn count_replies(&self, post_id: PostId) -> Result<u64, ResourceError>;

    #[doc = "Delete a post or reply and everything beneath it (only by author)"]
    #[method(name = "delete_subtree")]
    async fn delete_subtree(
        &self,
        root_kind: String,
        root_id: Uuid,
        actor: ActorId,
    ) -> Result<DeleteReport, ResourceError>;
}

#[async_trait]
impl ThreadsServer for ThreadsService {
    async fn create_post(
        &self,
        _ctx: RequestContext,
        actor: ActorId,
        channel_id: ChannelId,
        title: String,
        body: String,
    ) -> Result<ForumPostModel, ResourceError> {
        let post = deadline::within(
            self.deadline,
            self._create_post(actor, channel_id, title, body),
        )
        .await?;
        Ok(post)
    }

    async fn get_post(
        &self,
        _ctx: RequestContext,
        post_id: PostId,
    ) -> Result<ForumPostModel, ResourceError> {
        Ok(deadline::within(self.deadline, self._get_post(post_id)).await?)
    }

    async fn update_post_content(
        &self,
        _ctx: RequestContext,
        actor: ActorId,
        post_id: PostId,
        title: String,
        body: String,
    ) -> Result<ForumPostModel, ResourceError> {
        let post = deadline::within(
            self.deadline,
            self._update_post_content(actor, post_id, title, body),
        )
        .await?;
        Ok(post)
    }

    async fn list_channel_posts(
        &self,
        _ctx: RequestContext,
        channel_id: ChannelId,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<ForumPostModel>, ResourceError> {
        let posts = deadline::within(
            self.deadline,
            self._list_channel_posts(channel_id, limit, offset),
        )
        .await?;
        Ok(posts)
    }

    async fn create_reply(
        &self,
        _ctx: RequestContext,
        actor: ActorId,
        post_id: PostId,
        parent_reply_id: Option<ReplyId>,
        body: String,
    ) -> Result<ForumReplyModel, ResourceError> {
        let reply = deadline::within(
            self.deadline,
            self._create_reply(actor, post_id, parent_reply_id, body),
        )
        .await?;
        Ok(reply)
    }

    async fn get_reply(
        &self,
        _ctx: RequestContext,
        reply_id: ReplyId,
    ) -> Result<ForumReplyModel, ResourceError> {
        Ok(deadline::within(self.deadline, self._get_reply(reply_id)).await?)
    }

    async fn update_reply_content(
        &self,
        _ctx: RequestContext,
        actor: ActorId,
        reply_id: ReplyId,
        body: String,
    ) -> Result<ForumReplyModel, ResourceError> {
        let reply = deadline::within(
            self.deadline,
            self._update_reply_content(actor, reply_id, body),
        )
        .await?;
        Ok(reply)
    }

    async fn list_post_replies(
        &self,
        _ctx: RequestContext,
        post_id: PostId,
    ) -> Result<Vec<ForumReplyModel>, ResourceError> {
        Ok(deadline::within(self.deadline, self._list_post_replies(post_id)).await?)
    }

    async fn list_child_replies(
        &self,
        _ctx: RequestContext,
        reply_id: ReplyId,
    ) -> Result<Vec<ForumReplyModel>, ResourceError> {
        Ok(deadline::within(self.deadline, self._list_child_replies(reply_id)).await?)
    }

    async fn count_replies(
        &self,
        _ctx: RequestContext,
        post_id: PostId,
    ) -> Result<u64, ResourceError> {
        Ok(deadline::within(self.deadline, self._count_replies(post_id)).await?)
    }

    async fn delete_subtree(
        &self,
        _ctx: RequestContext,
        root_kind: String,
        root_id: Uuid,
        actor: ActorId,
    ) -> Result<DeleteReport, ResourceError> {
        let root = NodeRef::parse(&root_kind, root_id)?;
        Ok(deadline::within(self.deadline, self._delete_subtree(root, actor)).await?)
    }
}
