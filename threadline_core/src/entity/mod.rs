// SeaORM entities backing the thread store and the channel directory.

pub mod forum_author;
pub mod forum_category;
pub mod forum_channel;
pub mod forum_post;
pub mod forum_reaction;
pub mod forum_reply;


pub mod prelude {
    pub use super::forum_author::{
        ActiveModel as ForumAuthorActiveModel, Column as ForumAuthorColumn, Entity as ForumAuthor,
        Model as ForumAuthorModel,
    };
    pub use super::forum_category::{
        ActiveModel as ForumCategoryActiveModel, Column as ForumCategoryColumn, Entity as ForumCategory,
        Model as ForumCategoryModel,
    };
    pub use super::forum_channel::{
        ActiveModel as ForumChannelActiveModel, Column as ForumChannelColumn, Entity as ForumChannel,
        Model as ForumChannelModel,
    };
    pub use super::forum_post::{
        ActiveModel as ForumPostActiveModel, Column as ForumPostColumn, Entity as ForumPost, Model as ForumPostModel,
    };
    pub use super::forum_reaction::{
        ActiveModel as ForumReactionActiveModel, Column as ForumReactionColumn, Entity as ForumReaction,
        Model as ForumReactionModel,
    };
    pub use super::forum_reply::{
        ActiveModel as ForumReplyActiveModel, Column as ForumReplyColumn, Entity as ForumReply,
        Model as ForumReplyModel,
    };

    // Re-export commonly used SeaORM types and traits
    pub use sea_orm::{
        ActiveModelTrait,
        ActiveValue,

        ColumnTrait,
        ConnectionTrait,

        // Database and connection types
        Database,
        DatabaseConnection,
        DatabaseTransaction,
        DbConn,
        DbErr,

        // Core traits
        EntityTrait,
        ModelTrait,
        NotSet,
        PaginatorTrait,
        QueryFilter,
        QueryOrder,
        QuerySelect,
        Related,
        RelationTrait,

        // Active model helpers
        Set,
        TransactionTrait,
        Unchanged,
    };
}
