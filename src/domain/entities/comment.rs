use crate::domain::value_objects::{CommentId, DiscussionId, ViewerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_DISPLAY_NAME: &str = "Anonymous";

/// コメント投稿者の表示用情報。プロフィールが取得できない場合は
/// プレースホルダー名で埋める。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorSummary {
    pub id: Option<String>,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl AuthorSummary {
    pub fn placeholder(id: Option<String>) -> Self {
        Self {
            id,
            display_name: PLACEHOLDER_DISPLAY_NAME.to_string(),
            avatar_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub discussion_id: DiscussionId,
    pub parent_id: Option<CommentId>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
    pub liked_by_viewer: bool,
    pub author: AuthorSummary,
    pub attachments: Vec<Attachment>,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// 新規コメント投稿の入力
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewComment {
    pub discussion_id: DiscussionId,
    pub author_id: ViewerId,
    pub parent_id: Option<CommentId>,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), String> {
        if self.body.trim().is_empty() && self.attachments.is_empty() {
            return Err("Comment body cannot be empty".to_string());
        }
        Ok(())
    }
}
