use crate::domain::entities::{Attachment, AuthorSummary, Comment};
use crate::domain::value_objects::{CommentId, DiscussionId};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// 埋め込み結合は単一オブジェクトでも配列でも返ってくる
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::One(value) => Some(value),
            OneOrMany::Many(values) => values.into_iter().next(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AttachmentRow {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        mime_type: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentRow {
    pub id: String,
    pub discussion_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub like_count: Option<i64>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub attachments: Option<Vec<AttachmentRow>>,
    #[serde(default)]
    pub profiles: Option<OneOrMany<ProfileRow>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentLikeRow {
    pub comment_id: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ProfileRow {
    fn into_author(self, fallback_id: Option<String>) -> AuthorSummary {
        let id = non_empty(self.id).or(fallback_id);
        match non_empty(self.display_name).or_else(|| non_empty(self.username)) {
            Some(display_name) => AuthorSummary {
                id,
                display_name,
                avatar_url: non_empty(self.avatar_url),
            },
            None => AuthorSummary {
                avatar_url: non_empty(self.avatar_url),
                ..AuthorSummary::placeholder(id)
            },
        }
    }
}

impl From<AttachmentRow> for Attachment {
    fn from(row: AttachmentRow) -> Self {
        match row {
            AttachmentRow::Url(url) => Attachment {
                url,
                mime_type: None,
            },
            AttachmentRow::Detailed { url, mime_type } => Attachment { url, mime_type },
        }
    }
}

impl CommentRow {
    /// 取り込み境界でオプション項目を既定値へ解決する
    pub fn into_comment(self) -> Result<Comment, AppError> {
        let id = CommentId::new(self.id).map_err(AppError::DeserializationError)?;
        let discussion_id =
            DiscussionId::new(self.discussion_id).map_err(AppError::DeserializationError)?;
        let parent_id = non_empty(self.parent_id)
            .map(CommentId::new)
            .transpose()
            .map_err(AppError::DeserializationError)?;
        let user_id = non_empty(self.user_id);
        let author = match self.profiles.and_then(OneOrMany::into_first) {
            Some(profile) => profile.into_author(user_id),
            None => AuthorSummary::placeholder(user_id),
        };

        Ok(Comment {
            id,
            discussion_id,
            parent_id,
            body: self.body.unwrap_or_default(),
            created_at: self.created_at,
            like_count: self.like_count.unwrap_or(0).max(0),
            liked_by_viewer: false,
            author,
            attachments: self
                .attachments
                .unwrap_or_default()
                .into_iter()
                .map(Attachment::from)
                .collect(),
        })
    }
}

/// `Content-Range: 0-9/25` の総件数部分を読む。`*` は不明扱い。
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse::<u64>().ok()
}
