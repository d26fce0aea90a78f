use serde::{Deserialize, Serialize};

use crate::entity::prelude::*;
use crate::ids::{PostId, ReplyId};
use crate::thread::arena::ReplyArena;
use crate::thread::node::NodeRef;

/// What a subtree deletion removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub posts: u64,
    pub replies: u64,
    pub reactions: u64,
}

async fn delete_reactions<C: ConnectionTrait>(conn: &C, target: NodeRef) -> Result<u64, DbErr> {
    let result = ForumReaction::delete_many()
        .filter(ForumReactionColumn::TargetKind.eq(target.kind().as_str()))
        .filter(ForumReactionColumn::TargetId.eq(target.uuid()))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}

/// Deletes `order` front to back; callers pass a post-order so every reply
/// goes after its descendants and no row ever points at a deleted parent.
async fn delete_replies<C: ConnectionTrait>(
    conn: &C,
    order: &[ReplyId],
    report: &mut DeleteReport,
) -> Result<(), DbErr> {
    for id in order {
        report.reactions += delete_reactions(conn, NodeRef::Reply(*id)).await?;
        report.replies += ForumReply::delete_by_id(*id).exec(conn).await?.rows_affected;
    }
    Ok(())
}

/// Removes `post`, every reply under it, and every reaction on any of them.
///
/// Run it inside a transaction: a failure part-way leaves rows the caller
/// must roll back.
pub async fn delete_post_tree<C: ConnectionTrait>(
    conn: &C,
    post: PostId,
) -> Result<DeleteReport, DbErr> {
    let arena = ReplyArena::load(conn, &[post]).await?;
    let mut report = DeleteReport::default();

    delete_replies(conn, &arena.post_order_for_post(post), &mut report).await?;

    report.reactions += delete_reactions(conn, NodeRef::Post(post)).await?;
    report.posts += ForumPost::delete_by_id(post).exec(conn).await?.rows_affected;

    Ok(report)
}

/// Removes `reply`, every reply beneath it, and their reactions.
pub async fn delete_reply_tree<C: ConnectionTrait>(
    conn: &C,
    reply: &ForumReplyModel,
) -> Result<DeleteReport, DbErr> {
    let arena = ReplyArena::load_subtree(conn, reply).await?;
    let mut report = DeleteReport::default();

    delete_replies(conn, &arena.post_order(reply.id), &mut report).await?;

    Ok(report)
}
