//! Reply-tree and reaction logic that does not depend on a particular service:
//! node addressing, the depth rule, the id-indexed reply arena, leaf-first
//! subtree deletion, the like/dislike state machine and view assembly.

pub mod arena;
pub mod cascade;
pub mod deadline;
pub mod depth;
pub mod ledger;
pub mod node;
pub mod view;

pub use arena::ReplyArena;
pub use cascade::DeleteReport;
pub use depth::MAX_REPLY_DEPTH;
pub use ledger::ReactionKind;
pub use node::{NodeRef, TargetKind};
pub use view::{AuthorSummary, PostView, ReplyView};

/// Most ids bound into a single `IN (...)` list. SQLite caps the number of
/// bound parameters per statement, so batched lookups split their keys into
/// chunks of this size.
pub(crate) const MAX_BOUND_IDS: usize = 500;

/// Current time as a fixed-width RFC 3339 string, so stored timestamps sort
/// chronologically as text.
pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
