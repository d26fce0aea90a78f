use std::time::Duration;

use sea_orm::{sqlx, DbErr, RuntimeErr, SqlErr};
use thiserror::Error;
use zel_core::prelude::ResourceError;

use crate::ids::{ActorId, CategoryId, ChannelId, PostId, ReplyId};

/// Coarse classification of a [`ThreadError`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    DepthExceeded,
    InvalidTarget,
    Storage,
    Timeout,
}

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("post {0} not found")]
    PostNotFound(PostId),

    #[error("reply {0} not found")]
    ReplyNotFound(ReplyId),

    #[error("channel {0} not found")]
    ChannelNotFound(ChannelId),

    #[error("category {0} not found")]
    CategoryNotFound(CategoryId),

    #[error("forbidden: {actor} is not the author")]
    Forbidden { actor: ActorId },

    #[error("reply depth {depth} exceeds the maximum of {max}")]
    DepthExceeded { depth: i32, max: i32 },

    #[error("invalid reaction target kind `{0}`")]
    InvalidTarget(String),

    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl ThreadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ThreadError::PostNotFound(_)
            | ThreadError::ReplyNotFound(_)
            | ThreadError::ChannelNotFound(_)
            | ThreadError::CategoryNotFound(_) => ErrorKind::NotFound,
            ThreadError::Forbidden { .. } => ErrorKind::Forbidden,
            ThreadError::DepthExceeded { .. } => ErrorKind::DepthExceeded,
            ThreadError::InvalidTarget(_) => ErrorKind::InvalidTarget,
            ThreadError::CorruptRecord(_) | ThreadError::DbError(_) => ErrorKind::Storage,
            ThreadError::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// True when the backend rejected a write against the unique index.
    pub(crate) fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            ThreadError::DbError(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        )
    }

    /// True when SQLite turned the statement away because another connection
    /// held the write lock (`SQLITE_BUSY`/`SQLITE_LOCKED`, extended codes
    /// included). Re-running the whole transaction can succeed.
    pub(crate) fn is_busy(&self) -> bool {
        let ThreadError::DbError(
            DbErr::Conn(RuntimeErr::SqlxError(sqlx::Error::Database(err)))
            | DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(err)))
            | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(err))),
        ) = self
        else {
            return false;
        };

        err.code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, 5 | 6))
    }

    pub(crate) fn is_foreign_key_violation(&self) -> bool {
        matches!(
            self,
            ThreadError::DbError(err) if matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
        )
    }
}

impl From<ThreadError> for ResourceError {
    fn from(error: ThreadError) -> Self {
        match error.kind() {
            ErrorKind::Storage | ErrorKind::Timeout => ResourceError::infra(error),
            _ => ResourceError::app(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_kinds() {
        assert_eq!(ThreadError::PostNotFound(PostId::new()).kind(), ErrorKind::NotFound);
        assert_eq!(ThreadError::ReplyNotFound(ReplyId::new()).kind(), ErrorKind::NotFound);
        assert_eq!(
            ThreadError::Forbidden { actor: "bob".into() }.kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            ThreadError::DepthExceeded { depth: 6, max: 5 }.kind(),
            ErrorKind::DepthExceeded
        );
        assert_eq!(
            ThreadError::InvalidTarget("channel".into()).kind(),
            ErrorKind::InvalidTarget
        );
        assert_eq!(
            ThreadError::DbError(DbErr::Custom("boom".into())).kind(),
            ErrorKind::Storage
        );
        assert_eq!(
            ThreadError::Timeout(Duration::from_millis(5)).kind(),
            ErrorKind::Timeout
        );
    }

    #[test]
    fn custom_db_errors_are_not_constraint_violations() {
        let error = ThreadError::DbError(DbErr::Custom("boom".into()));
        assert!(!error.is_unique_violation());
        assert!(!error.is_foreign_key_violation());
        assert!(!error.is_busy());
        assert!(!ThreadError::PostNotFound(PostId::new()).is_busy());
    }
}
