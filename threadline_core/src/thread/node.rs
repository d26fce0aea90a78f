use std::fmt;
use std::str::FromStr;

use sea_orm::prelude::Uuid;
use serde::{Deserialize, Serialize};

use crate::error::ThreadError;
use crate::ids::{PostId, ReplyId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Post,
    Reply,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Post => "post",
            TargetKind::Reply => "reply",
        }
    }
}

impl FromStr for TargetKind {
    type Err = ThreadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "post" => Ok(TargetKind::Post),
            "reply" => Ok(TargetKind::Reply),
            _ => Err(ThreadError::InvalidTarget(s.to_string())),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A post or a reply, addressed by id.
///
/// Used both as a reaction target and as the root of a subtree deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeRef {
    Post(PostId),
    Reply(ReplyId),
}

impl NodeRef {
    /// Resolves a raw `(kind, id)` pair, failing with `InvalidTarget` for an
    /// unknown kind.
    pub fn parse(kind: &str, id: Uuid) -> Result<Self, ThreadError> {
        Ok(Self::from_parts(kind.parse()?, id))
    }

    pub fn from_parts(kind: TargetKind, id: Uuid) -> Self {
        match kind {
            TargetKind::Post => NodeRef::Post(PostId::from_uuid(id)),
            TargetKind::Reply => NodeRef::Reply(ReplyId::from_uuid(id)),
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            NodeRef::Post(_) => TargetKind::Post,
            NodeRef::Reply(_) => TargetKind::Reply,
        }
    }

    pub fn uuid(&self) -> Uuid {
        match self {
            NodeRef::Post(id) => id.into_uuid(),
            NodeRef::Reply(id) => id.into_uuid(),
        }
    }
}

impl From<PostId> for NodeRef {
    fn from(id: PostId) -> Self {
        NodeRef::Post(id)
    }
}

impl From<ReplyId> for NodeRef {
    fn from(id: ReplyId) -> Self {
        NodeRef::Reply(id)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.uuid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parses_known_kinds() {
        let id = Uuid::now_v7();
        assert_eq!(
            NodeRef::parse("post", id).unwrap(),
            NodeRef::Post(PostId::from_uuid(id))
        );
        assert_eq!(
            NodeRef::parse(" Reply ", id).unwrap(),
            NodeRef::Reply(ReplyId::from_uuid(id))
        );
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = NodeRef::parse("channel", Uuid::now_v7()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTarget);
    }

    #[test]
    fn serializes_as_tagged_variant() {
        let id = ReplyId::new();
        let json = serde_json::to_value(NodeRef::Reply(id)).unwrap();
        assert_eq!(json["kind"], "reply");
        assert_eq!(json["id"], id.to_string());
    }
}
