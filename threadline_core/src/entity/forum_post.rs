use crate::ids::{ActorId, ChannelId, PostId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "forum_post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: PostId,
    pub author_id: ActorId,
    pub channel_id: ChannelId,
    pub title: String,
    pub body: String,
    pub created_at: String,
    pub edited: bool,
    pub edited_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::forum_reply::Entity")]
    ForumReply,
}

impl Related<super::forum_reply::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ForumReply.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
