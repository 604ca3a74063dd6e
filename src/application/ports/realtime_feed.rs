use crate::domain::entities::Comment;
use crate::domain::value_objects::DiscussionId;
use crate::shared::error::AppError;
use async_trait::async_trait;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    CommentInserted(Comment),
}

/// リアルタイム配信（新規コメント）の購読ポート
#[async_trait]
pub trait RealtimeFeed: Send + Sync {
    async fn subscribe_comments(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<mpsc::Receiver<RealtimeEvent>, AppError>;
}
