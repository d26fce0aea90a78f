use crate::ids::{ActorId, ReactionId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One actor's like or dislike on a post or reply.
///
/// The target is a single `(target_kind, target_id)` pair, never two
/// nullable foreign keys; `(actor_id, target_kind, target_id)` is unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "forum_reaction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: ReactionId,
    pub actor_id: ActorId,
    pub target_kind: String,
    pub target_id: Uuid,
    pub kind: String,
    pub reacted_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
