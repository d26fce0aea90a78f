use crate::ids::ActorId;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Display details for an actor, registered by the authentication layer.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "forum_author")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: ActorId,
    pub display_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
