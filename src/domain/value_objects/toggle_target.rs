use super::{CommentId, DiscussionId, EntityId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 閲覧者ごとに ON/OFF できる関係の種類。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToggleKind {
    DiscussionLike,
    DiscussionBookmark,
    CommentLike,
}

impl ToggleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleKind::DiscussionLike => "discussion_like",
            ToggleKind::DiscussionBookmark => "discussion_bookmark",
            ToggleKind::CommentLike => "comment_like",
        }
    }

    /// 件数表示を伴うかどうか（ブックマークは件数を持たない）
    pub fn has_counter(&self) -> bool {
        !matches!(self, ToggleKind::DiscussionBookmark)
    }
}

impl fmt::Display for ToggleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToggleTarget {
    pub kind: ToggleKind,
    pub entity_id: EntityId,
}

impl ToggleTarget {
    pub fn new(kind: ToggleKind, entity_id: EntityId) -> Self {
        Self { kind, entity_id }
    }

    pub fn discussion_like(discussion_id: &DiscussionId) -> Self {
        Self::new(ToggleKind::DiscussionLike, discussion_id.into())
    }

    pub fn discussion_bookmark(discussion_id: &DiscussionId) -> Self {
        Self::new(ToggleKind::DiscussionBookmark, discussion_id.into())
    }

    pub fn comment_like(comment_id: &CommentId) -> Self {
        Self::new(ToggleKind::CommentLike, comment_id.into())
    }
}

impl fmt::Display for ToggleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.entity_id)
    }
}
