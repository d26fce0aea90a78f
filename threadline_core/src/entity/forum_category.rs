use crate::ids::CategoryId;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "forum_category")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: CategoryId,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::forum_channel::Entity")]
    ForumChannel,
}

impl Related<super::forum_channel::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ForumChannel.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
