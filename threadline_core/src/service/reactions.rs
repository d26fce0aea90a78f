use std::collections::{HashMap, HashSet};
use std::time::Duration;

use sea_orm::{prelude::Uuid, DatabaseConnection};
use tracing::{debug, warn};
use zel_core::prelude::*;

use crate::{
    entity::prelude::*,
    error::ThreadError,
    ids::{ActorId, ReactionId},
    thread::{
        deadline::{self, DEFAULT_DEADLINE},
        ledger::toggle,
        timestamp, NodeRef, ReactionKind, MAX_BOUND_IDS,
    },
};

/// A toggle that loses a race, either on the unique index or on SQLite's
/// write lock, is re-run this many times in total before the error is
/// reported.
const MAX_TOGGLE_ATTEMPTS: usize = 5;

async fn ensure_target<C: ConnectionTrait>(conn: &C, target: NodeRef) -> Result<(), ThreadError> {
    match target {
        NodeRef::Post(id) => {
            if ForumPost::find_by_id(id).one(conn).await?.is_none() {
                return Err(ThreadError::PostNotFound(id));
            }
        }
        NodeRef::Reply(id) => {
            if ForumReply::find_by_id(id).one(conn).await?.is_none() {
                return Err(ThreadError::ReplyNotFound(id));
            }
        }
    }
    Ok(())
}

async fn find_reaction<C: ConnectionTrait>(
    conn: &C,
    actor: &ActorId,
    target: NodeRef,
) -> Result<Option<ForumReactionModel>, DbErr> {
    ForumReaction::find()
        .filter(ForumReactionColumn::ActorId.eq(actor.clone()))
        .filter(ForumReactionColumn::TargetKind.eq(target.kind().as_str()))
        .filter(ForumReactionColumn::TargetId.eq(target.uuid()))
        .one(conn)
        .await
}

/// Resolves a stored (kind, id) pair against the targets a caller asked
/// about. Rows whose kind no longer parses are logged and skipped.
fn wanted_target(
    wanted: &HashSet<NodeRef>,
    target_kind: &str,
    target_id: Uuid,
) -> Option<NodeRef> {
    match NodeRef::parse(target_kind, target_id) {
        Ok(target) if wanted.contains(&target) => Some(target),
        Ok(_) => None,
        Err(err) => {
            warn!(%target_id, %err, "skipping reaction with corrupt target");
            None
        }
    }
}

/// Like counts for every target in `targets`; targets with no likes are absent.
///
/// Counting happens in the database, one grouped query per chunk of targets.
pub(crate) async fn like_counts<C: ConnectionTrait>(
    conn: &C,
    targets: &[NodeRef],
) -> Result<HashMap<NodeRef, u64>, DbErr> {
    let mut counts = HashMap::new();

    for chunk in targets.chunks(MAX_BOUND_IDS) {
        let wanted: HashSet<NodeRef> = chunk.iter().copied().collect();
        let rows: Vec<(String, Uuid, i64)> = ForumReaction::find()
            .select_only()
            .column(ForumReactionColumn::TargetKind)
            .column(ForumReactionColumn::TargetId)
            .column_as(ForumReactionColumn::Id.count(), "likes")
            .filter(ForumReactionColumn::Kind.eq(ReactionKind::Like.as_str()))
            .filter(ForumReactionColumn::TargetId.is_in(chunk.iter().map(NodeRef::uuid)))
            .group_by(ForumReactionColumn::TargetKind)
            .group_by(ForumReactionColumn::TargetId)
            .into_tuple()
            .all(conn)
            .await?;

        for (target_kind, target_id, likes) in rows {
            if let Some(target) = wanted_target(&wanted, &target_kind, target_id) {
                *counts.entry(target).or_insert(0) += likes.max(0) as u64;
            }
        }
    }

    Ok(counts)
}

/// The subset of `targets` that `viewer` currently likes.
pub(crate) async fn liked_by<C: ConnectionTrait>(
    conn: &C,
    viewer: &ActorId,
    targets: &[NodeRef],
) -> Result<HashSet<NodeRef>, DbErr> {
    let mut liked = HashSet::new();

    for chunk in targets.chunks(MAX_BOUND_IDS) {
        let wanted: HashSet<NodeRef> = chunk.iter().copied().collect();
        let rows = ForumReaction::find()
            .filter(ForumReactionColumn::ActorId.eq(viewer.clone()))
            .filter(ForumReactionColumn::Kind.eq(ReactionKind::Like.as_str()))
            .filter(ForumReactionColumn::TargetId.is_in(chunk.iter().map(NodeRef::uuid)))
            .all(conn)
            .await?;

        liked.extend(
            rows.iter()
                .filter_map(|row| wanted_target(&wanted, &row.target_kind, row.target_id)),
        );
    }

    Ok(liked)
}

/// The like/dislike ledger.
#[derive(Clone)]
pub struct ReactionsService {
    db: DatabaseConnection,
    deadline: Duration,
}

impl ReactionsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// One read-modify-write of the (actor, target) entry in a single
    /// transaction. Flips update the existing row in place, so the pair never
    /// has two rows; a concurrent first insert loses on the unique index.
    async fn apply_toggle(
        &self,
        actor: &ActorId,
        target: NodeRef,
        pressed: ReactionKind,
    ) -> Result<Option<ReactionKind>, ThreadError> {
        let txn = self.db.begin().await?;

        ensure_target(&txn, target).await?;

        let existing = find_reaction(&txn, actor, target).await?;
        let current = match &existing {
            Some(row) => Some(row.kind.parse::<ReactionKind>()?),
            None => None,
        };
        let next = toggle(current, pressed);

        match (existing, next) {
            (Some(row), None) => {
                row.delete(&txn).await?;
            }
            (Some(row), Some(kind)) => {
                let mut reaction: ForumReactionActiveModel = row.into();
                reaction.kind = Set(kind.as_str().to_string());
                reaction.reacted_at = Set(timestamp());
                reaction.update(&txn).await?;
            }
            (None, Some(kind)) => {
                let reaction = ForumReactionActiveModel {
                    id: Set(ReactionId::new()),
                    actor_id: Set(actor.clone()),
                    target_kind: Set(target.kind().as_str().to_string()),
                    target_id: Set(target.uuid()),
                    kind: Set(kind.as_str().to_string()),
                    reacted_at: Set(timestamp()),
                };
                ForumReaction::insert(reaction).exec(&txn).await?;
            }
            (None, None) => {}
        }

        txn.commit().await?;

        debug!(%actor, %target, ?current, ?next, "reaction toggled");
        Ok(next)
    }

    async fn toggle_with_retry(
        &self,
        actor: ActorId,
        target: NodeRef,
        pressed: ReactionKind,
    ) -> Result<Option<ReactionKind>, ThreadError> {
        let mut attempt = 1;
        loop {
            match self.apply_toggle(&actor, target, pressed).await {
                Err(err)
                    if (err.is_unique_violation() || err.is_busy())
                        && attempt < MAX_TOGGLE_ATTEMPTS =>
                {
                    debug!(%actor, %target, attempt, %err, "reaction toggle raced, retrying");
                    attempt += 1;
                    let backoff = rand::random_range(5..25 * attempt as u64);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                result => return result,
            }
        }
    }

    /// Like `target`, or take the like back if it is already there.
    /// Returns the new state.
    pub async fn _like(
        &self,
        actor: ActorId,
        target: NodeRef,
    ) -> Result<Option<ReactionKind>, ThreadError> {
        self.toggle_with_retry(actor, target, ReactionKind::Like).await
    }

    /// Dislike `target`, or take the dislike back if it is already there.
    pub async fn _dislike(
        &self,
        actor: ActorId,
        target: NodeRef,
    ) -> Result<Option<ReactionKind>, ThreadError> {
        self.toggle_with_retry(actor, target, ReactionKind::Dislike).await
    }

    pub async fn _reaction_of(
        &self,
        actor: ActorId,
        target: NodeRef,
    ) -> Result<Option<ReactionKind>, ThreadError> {
        match find_reaction(&self.db, &actor, target).await? {
            Some(row) => Ok(Some(row.kind.parse()?)),
            None => Ok(None),
        }
    }

    async fn count(&self, target: NodeRef, kind: ReactionKind) -> Result<u64, ThreadError> {
        let count = ForumReaction::find()
            .filter(ForumReactionColumn::TargetKind.eq(target.kind().as_str()))
            .filter(ForumReactionColumn::TargetId.eq(target.uuid()))
            .filter(ForumReactionColumn::Kind.eq(kind.as_str()))
            .count(&self.db)
            .await?;

        Ok(count)
    }

    pub async fn _count_likes(&self, target: NodeRef) -> Result<u64, ThreadError> {
        self.count(target, ReactionKind::Like).await
    }

    pub async fn _count_dislikes(&self, target: NodeRef) -> Result<u64, ThreadError> {
        self.count(target, ReactionKind::Dislike).await
    }
}

#[zel_service(name = "reactions")]
trait Reactions {
    #[doc = "Toggle a like on a post or reply"]
    #[method(name = "like")]
    async fn like(
        &self,
        actor: ActorId,
        target_kind: String,
        target_id: Uuid,
    ) -> Result<Option<ReactionKind>, ResourceError>;

    #[doc = "Toggle a dislike on a post or reply"]
    #[method(name = "dislike")]
    async fn dislike(
        &self,
        actor: ActorId,
        target_kind: String,
        target_id: Uuid,
    ) -> Result<Option<ReactionKind>, ResourceError>;

    #[doc = "Current reaction of an actor on a post or reply"]
    #[method(name = "reaction_of")]
    async fn reaction_of(
        &self,
        actor: ActorId,
        target_kind: String,
        target_id: Uuid,
    ) -> Result<Option<ReactionKind>, ResourceError>;

    #[doc = "Count likes on a post or reply"]
    #[method(name = "count_likes")]
    async fn count_likes(&self, target_kind: String, target_id: Uuid)
        -> Result<u64, ResourceError>;

    #[doc = "Count dislikes on a post or reply"]
    #[method(name = "count_dislikes")]
    async fn count_dislikes(
        &self,
        target_kind: String,
        target_id: Uuid,
    ) -> Result<u64, ResourceError>;
}

#[async_trait]
impl ReactionsServer for ReactionsService {
    async fn like(
        &self,
        _ctx: RequestContext,
        actor: ActorId,
        target_kind: String,
        target_id: Uuid,
    ) -> Result<Option<ReactionKind>, ResourceError> {
        let target = NodeRef::parse(&target_kind, target_id)?;
        Ok(deadline::within(self.deadline, self._like(actor, target)).await?)
    }

    async fn dislike(
        &self,
        _ctx: RequestContext,
        actor: ActorId,
        target_kind: String,
        target_id: Uuid,
    ) -> Result<Option<ReactionKind>, ResourceError> {
        let target = NodeRef::parse(&target_kind, target_id)?;
        Ok(deadline::within(self.deadline, self._dislike(actor, target)).await?)
    }

    async fn reaction_of(
        &self,
        _ctx: RequestContext,
        actor: ActorId,
        target_kind: String,
        target_id: Uuid,
    ) -> Result<Option<ReactionKind>, ResourceError> {
        let target = NodeRef::parse(&target_kind, target_id)?;
        Ok(deadline::within(self.deadline, self._reaction_of(actor, target)).await?)
    }

    async fn count_likes(
        &self,
        _ctx: RequestContext,
        target_kind: String,
        target_id: Uuid,
    ) -> Result<u64, ResourceError> {
        let target = NodeRef::parse(&target_kind, target_id)?;
        Ok(deadline::within(self.deadline, self._count_likes(target)).await?)
    }

    async fn count_dislikes(
        &self,
        _ctx: RequestContext,
        target_kind: String,
        target_id: Uuid,
    ) -> Result<u64, ResourceError> {
        let target = NodeRef::parse(&target_kind, target_id)?;
        Ok(deadline::within(self.deadline, self._count_dislikes(target)).await?)
    }
}
