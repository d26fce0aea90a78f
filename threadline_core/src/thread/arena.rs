use std::collections::{HashMap, HashSet};

use crate::entity::prelude::*;
use crate::ids::{PostId, ReplyId};
use crate::thread::MAX_BOUND_IDS;

/// Flat reply rows indexed by id, with parent links resolved to child lists.
///
/// Child lists keep the order the rows were handed in, so loading rows in
/// creation order yields creation-ordered children.
#[derive(Debug, Default)]
pub struct ReplyArena {
    replies: HashMap<ReplyId, ForumReplyModel>,
    roots: HashMap<PostId, Vec<ReplyId>>,
    children: HashMap<ReplyId, Vec<ReplyId>>,
}

impl ReplyArena {
    pub fn new(rows: impl IntoIterator<Item = ForumReplyModel>) -> Self {
        let mut arena = ReplyArena::default();

        for reply in rows {
            match reply.parent_reply_id {
                Some(parent) => arena.children.entry(parent).or_default().push(reply.id),
                None => arena.roots.entry(reply.post_id).or_default().push(reply.id),
            }
            arena.replies.insert(reply.id, reply);
        }

        arena
    }

    /// Loads every reply under `posts` in creation order.
    ///
    /// Posts are queried a chunk at a time; a reply always lives in the same
    /// chunk as its post, so per-post ordering survives the split.
    pub async fn load<C: ConnectionTrait>(conn: &C, posts: &[PostId]) -> Result<Self, DbErr> {
        let mut rows = Vec::new();

        for chunk in posts.chunks(MAX_BOUND_IDS) {
            let batch = ForumReply::find()
                .filter(ForumReplyColumn::PostId.is_in(chunk.iter().copied()))
                .order_by_asc(ForumReplyColumn::CreatedAt)
                .order_by_asc(ForumReplyColumn::Id)
                .all(conn)
                .await?;
            rows.extend(batch);
        }

        Ok(ReplyArena::new(rows))
    }

    /// Loads `root` and the replies beneath it, walking down one level per
    /// round by `parent_reply_id`. Siblings of `root` and the rest of its post
    /// are never read.
    pub async fn load_subtree<C: ConnectionTrait>(
        conn: &C,
        root: &ForumReplyModel,
    ) -> Result<Self, DbErr> {
        let mut seen = HashSet::from([root.id]);
        let mut rows = vec![root.clone()];
        let mut frontier = vec![root.id];

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for chunk in frontier.chunks(MAX_BOUND_IDS) {
                let batch = ForumReply::find()
                    .filter(ForumReplyColumn::ParentReplyId.is_in(chunk.iter().copied()))
                    .order_by_asc(ForumReplyColumn::CreatedAt)
                    .order_by_asc(ForumReplyColumn::Id)
                    .all(conn)
                    .await?;
                for reply in batch {
                    if seen.insert(reply.id) {
                        next.push(reply.id);
                        rows.push(reply);
                    }
                }
            }
            frontier = next;
        }

        Ok(ReplyArena::new(rows))
    }

    pub fn get(&self, id: ReplyId) -> Option<&ForumReplyModel> {
        self.replies.get(&id)
    }

    /// Depth-0 replies of `post`.
    pub fn roots(&self, post: PostId) -> &[ReplyId] {
        self.roots.get(&post).map(Vec::as_slice).unwrap_or_default()
    }

    /// Direct children of `id`, whatever their depth.
    pub fn children(&self, id: ReplyId) -> &[ReplyId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_replies(&self, post: PostId) -> bool {
        !self.roots(post).is_empty()
    }

    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ReplyId> + '_ {
        self.replies.keys().copied()
    }

    /// `root` and every reply beneath it, each node listed after all of its
    /// descendants.
    pub fn post_order(&self, root: ReplyId) -> Vec<ReplyId> {
        let mut order = Vec::new();
        let mut stack = vec![(root, false)];

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for child in self.children(id).iter().rev() {
                stack.push((*child, false));
            }
        }

        order
    }

    /// Every reply under `post` in post-order, tree by tree.
    pub fn post_order_for_post(&self, post: PostId) -> Vec<ReplyId> {
        self.roots(post)
            .iter()
            .flat_map(|root| self.post_order(*root))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ids::ActorId;
    use crate::service::threads::ThreadsService;
    use crate::test_utils::{migrated_db, seed_channel};

    pub(crate) fn reply(post_id: PostId, parent: Option<&ForumReplyModel>) -> ForumReplyModel {
        ForumReplyModel {
            id: ReplyId::new(),
            author_id: ActorId::from("alice"),
            post_id,
            parent_reply_id: parent.map(|p| p.id),
            depth: parent.map(|p| p.depth + 1).unwrap_or(0),
            body: "body".to_string(),
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
            edited: false,
            edited_at: None,
        }
    }

    #[test]
    fn splits_roots_and_children() {
        let post = PostId::new();
        let r1 = reply(post, None);
        let r2 = reply(post, Some(&r1));
        let r3 = reply(post, None);

        let arena = ReplyArena::new(vec![r1.clone(), r2.clone(), r3.clone()]);

        assert_eq!(arena.len(), 3);
        assert_eq!(arena.roots(post), &[r1.id, r3.id]);
        assert_eq!(arena.children(r1.id), &[r2.id]);
        assert!(arena.children(r3.id).is_empty());
        assert!(arena.has_replies(post));
        assert!(!arena.has_replies(PostId::new()));
    }

    #[test]
    fn post_order_lists_descendants_before_ancestors() {
        let post = PostId::new();
        let a = reply(post, None);
        let b = reply(post, Some(&a));
        let c = reply(post, Some(&b));
        let d = reply(post, Some(&a));
        let other = reply(post, None);

        let arena = ReplyArena::new(vec![
            a.clone(),
            b.clone(),
            c.clone(),
            d.clone(),
            other.clone(),
        ]);

        assert_eq!(arena.post_order(a.id), vec![c.id, b.id, d.id, a.id]);
        assert_eq!(arena.post_order(b.id), vec![c.id, b.id]);
        assert_eq!(
            arena.post_order_for_post(post),
            vec![c.id, b.id, d.id, a.id, other.id]
        );
    }

    #[test]
    fn post_order_never_precedes_a_child() {
        let post = PostId::new();
        let mut rows = vec![reply(post, None)];
        for i in 0..5 {
            let parent = rows[i].clone();
            rows.push(reply(post, Some(&parent)));
            rows.push(reply(post, Some(&parent)));
        }
        let arena = ReplyArena::new(rows.clone());

        let order = arena.post_order_for_post(post);
        assert_eq!(order.len(), rows.len());
        for (pos, id) in order.iter().enumerate() {
            for child in arena.children(*id) {
                let child_pos = order.iter().position(|x| x == child).unwrap();
                assert!(child_pos < pos);
            }
        }
    }

    #[tokio::test]
    async fn load_subtree_reads_only_descendants() {
        let db = migrated_db().await;
        let channel = seed_channel(&db).await;
        let threads = ThreadsService::new(db.clone());

        let post = threads
            ._create_post("alice".into(), channel, "P".into(), "body".into())
            .await
            .unwrap();
        let other = threads
            ._create_post("alice".into(), channel, "Q".into(), "body".into())
            .await
            .unwrap();

        let reply = |post: PostId, parent: Option<ReplyId>| {
            let threads = threads.clone();
            async move {
                threads
                    ._create_reply("bob".into(), post, parent, "r".into())
                    .await
                    .unwrap()
            }
        };

        let top = reply(post.id, None).await;
        let root = reply(post.id, Some(top.id)).await;
        let child = reply(post.id, Some(root.id)).await;
        let grandchild = reply(post.id, Some(child.id)).await;
        let second_child = reply(post.id, Some(root.id)).await;
        let sibling = reply(post.id, Some(top.id)).await;
        let elsewhere = reply(other.id, None).await;

        let arena = ReplyArena::load_subtree(&db, &root).await.unwrap();

        assert_eq!(arena.len(), 4);
        assert!(arena.get(top.id).is_none());
        assert!(arena.get(sibling.id).is_none());
        assert!(arena.get(elsewhere.id).is_none());
        assert_eq!(arena.children(root.id), &[child.id, second_child.id]);
        assert_eq!(
            arena.post_order(root.id),
            vec![grandchild.id, child.id, second_child.id, root.id]
        );

        let whole = ReplyArena::load(&db, &[post.id, other.id]).await.unwrap();
        assert_eq!(whole.len(), 7);
        assert_eq!(whole.roots(post.id), &[top.id]);
        assert_eq!(whole.roots(other.id), &[elsewhere.id]);
    }

    #[tokio::test]
    async fn load_splits_long_post_lists() {
        let db = migrated_db().await;
        let channel = seed_channel(&db).await;
        let threads = ThreadsService::new(db.clone());

        let post = threads
            ._create_post("alice".into(), channel, "P".into(), "body".into())
            .await
            .unwrap();
        let first = threads
            ._create_reply("bob".into(), post.id, None, "r".into())
            .await
            .unwrap();

        let mut posts: Vec<PostId> = (0..MAX_BOUND_IDS * 2).map(|_| PostId::new()).collect();
        posts.push(post.id);

        let arena = ReplyArena::load(&db, &posts).await.unwrap();
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.roots(post.id), &[first.id]);
        assert!(ReplyArena::load(&db, &[]).await.unwrap().is_empty());
    }
}
