use serde::{Deserialize, Serialize};
use std::fmt;

/// いいね・ブックマーク対象（ディスカッション/コメント）の識別子。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        Self::validate(&value)?;
        Ok(Self(value.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err("Entity ID cannot be empty".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.0
    }
}

impl From<&super::DiscussionId> for EntityId {
    fn from(value: &super::DiscussionId) -> Self {
        Self(value.as_str().to_string())
    }
}

impl From<&super::CommentId> for EntityId {
    fn from(value: &super::CommentId) -> Self {
        Self(value.as_str().to_string())
    }
}
