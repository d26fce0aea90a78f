use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entity::prelude::{ForumPostModel, ForumReplyModel};
use crate::ids::{ActorId, PostId, ReplyId};
use crate::thread::arena::ReplyArena;
use crate::thread::node::NodeRef;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn is_false(flag: &bool) -> bool {
    !*flag
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: ActorId,
    pub display_name: String,
}

impl AuthorSummary {
    /// Summary for an actor with no registered display details.
    pub fn anonymous(id: ActorId) -> Self {
        let display_name = id.to_string();
        Self { id, display_name }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub author: AuthorSummary,
    pub date: String,
    pub likes: u64,
    pub liked: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub edited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
    /// Depth-0 replies only; absent when the post has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<ReplyView>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyView {
    pub id: ReplyId,
    pub content: String,
    pub author: AuthorSummary,
    pub date: String,
    pub depth: i32,
    pub likes: u64,
    pub liked: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub edited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_reply: Option<ReplyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<ReplyView>>,
}

/// Stored RFC 3339 timestamp as `YYYY-MM-DD HH:MM:SS` UTC.
pub fn format_date(stored: &str) -> String {
    match DateTime::parse_from_rfc3339(stored) {
        Ok(date) => date.with_timezone(&Utc).format(DATE_FORMAT).to_string(),
        Err(err) => {
            warn!(stored, %err, "unparseable timestamp, rendering as stored");
            stored.to_string()
        }
    }
}

/// Everything the renderer needs, fetched up front so assembly is pure.
pub struct ViewContext<'a> {
    pub arena: &'a ReplyArena,
    pub likes: &'a HashMap<NodeRef, u64>,
    /// Targets the viewer currently likes; empty for anonymous viewers.
    pub liked: &'a HashSet<NodeRef>,
    pub authors: &'a HashMap<ActorId, AuthorSummary>,
}

impl ViewContext<'_> {
    fn author(&self, id: &ActorId) -> AuthorSummary {
        self.authors
            .get(id)
            .cloned()
            .unwrap_or_else(|| AuthorSummary::anonymous(id.clone()))
    }

    fn likes_of(&self, target: NodeRef) -> u64 {
        self.likes.get(&target).copied().unwrap_or(0)
    }

    fn replies_of(&self, ids: &[ReplyId]) -> Option<Vec<ReplyView>> {
        if ids.is_empty() {
            return None;
        }
        Some(ids.iter().filter_map(|id| self.reply(*id)).collect())
    }

    pub fn post(&self, post: &ForumPostModel) -> PostView {
        let target = NodeRef::Post(post.id);

        PostView {
            id: post.id,
            title: post.title.clone(),
            content: post.body.clone(),
            author: self.author(&post.author_id),
            date: format_date(&post.created_at),
            likes: self.likes_of(target),
            liked: self.liked.contains(&target),
            edited: post.edited,
            edited_at: post.edited_at.as_deref().map(format_date),
            replies: self.replies_of(self.arena.roots(post.id)),
        }
    }

    /// Renders `id` and, recursively, all of its direct children. Recursion
    /// depth is bounded by the reply depth limit.
    pub fn reply(&self, id: ReplyId) -> Option<ReplyView> {
        let reply: &ForumReplyModel = self.arena.get(id)?;
        let target = NodeRef::Reply(reply.id);

        Some(ReplyView {
            id: reply.id,
            content: reply.body.clone(),
            author: self.author(&reply.author_id),
            date: format_date(&reply.created_at),
            depth: reply.depth,
            likes: self.likes_of(target),
            liked: self.liked.contains(&target),
            edited: reply.edited,
            edited_at: reply.edited_at.as_deref().map(format_date),
            parent_reply: reply.parent_reply_id,
            replies: self.replies_of(self.arena.children(reply.id)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ChannelId;
    use crate::thread::arena::tests::reply;

    fn post() -> ForumPostModel {
        ForumPostModel {
            id: PostId::new(),
            author_id: ActorId::from("alice"),
            channel_id: ChannelId::new(),
            title: "Title".to_string(),
            body: "Body".to_string(),
            created_at: "2024-03-05T07:08:09.123+00:00".to_string(),
            edited: false,
            edited_at: None,
        }
    }

    fn collect_ids(views: &[ReplyView], out: &mut Vec<ReplyId>) {
        for view in views {
            out.push(view.id);
            if let Some(children) = &view.replies {
                collect_ids(children, out);
            }
        }
    }

    #[test]
    fn formats_dates_like_the_wire_format() {
        assert_eq!(format_date("2024-03-05T07:08:09.123+00:00"), "2024-03-05 07:08:09");
        assert_eq!(format_date("2024-03-05T09:08:09+02:00"), "2024-03-05 07:08:09");
        assert_eq!(format_date("yesterday"), "yesterday");
    }

    #[test]
    fn post_without_replies_omits_the_list() {
        let post = post();
        let arena = ReplyArena::default();
        let (likes, liked, authors) = (HashMap::new(), HashSet::new(), HashMap::new());
        let ctx = ViewContext {
            arena: &arena,
            likes: &likes,
            liked: &liked,
            authors: &authors,
        };

        let view = ctx.post(&post);
        assert!(view.replies.is_none());
        assert_eq!(view.author.display_name, "alice");
        assert_eq!(view.date, "2024-03-05 07:08:09");

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("replies").is_none());
        assert!(json.get("edited").is_none());
    }

    #[test]
    fn nests_each_reply_under_its_parent_exactly_once() {
        let post = post();
        let r1 = reply(post.id, None);
        let r2 = reply(post.id, Some(&r1));
        let r3 = reply(post.id, Some(&r2));
        let r4 = reply(post.id, None);
        let arena = ReplyArena::new(vec![r1.clone(), r2.clone(), r3.clone(), r4.clone()]);

        let likes = HashMap::from([(NodeRef::Reply(r2.id), 3), (NodeRef::Post(post.id), 1)]);
        let liked = HashSet::from([NodeRef::Reply(r2.id)]);
        let authors = HashMap::from([(
            ActorId::from("alice"),
            AuthorSummary {
                id: ActorId::from("alice"),
                display_name: "Alice".to_string(),
            },
        )]);
        let ctx = ViewContext {
            arena: &arena,
            likes: &likes,
            liked: &liked,
            authors: &authors,
        };

        let view = ctx.post(&post);
        assert_eq!(view.likes, 1);
        assert!(!view.liked);

        let top = view.replies.as_ref().unwrap();
        assert_eq!(top.iter().map(|r| r.id).collect::<Vec<_>>(), vec![r1.id, r4.id]);
        assert_eq!(top[0].parent_reply, None);
        assert!(top[1].replies.is_none());

        let nested = &top[0].replies.as_ref().unwrap()[0];
        assert_eq!(nested.id, r2.id);
        assert_eq!(nested.parent_reply, Some(r1.id));
        assert_eq!(nested.depth, 1);
        assert_eq!(nested.likes, 3);
        assert!(nested.liked);
        assert_eq!(nested.author.display_name, "Alice");
        assert_eq!(nested.replies.as_ref().unwrap()[0].id, r3.id);

        let mut seen = Vec::new();
        collect_ids(top, &mut seen);
        seen.sort();
        let mut stored = vec![r1.id, r2.id, r3.id, r4.id];
        stored.sort();
        assert_eq!(seen, stored);
    }
}
