use crate::domain::entities::{Comment, NewComment, PageRequest};
use crate::domain::value_objects::{CommentId, DiscussionId, ViewerId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::collections::HashSet;

/// 作成日時昇順で取得したコメント 1 ページ分
#[derive(Debug, Clone, Default)]
pub struct CommentPage {
    pub items: Vec<Comment>,
    /// バックエンドが返した場合のみ設定される総件数
    pub total_count: Option<u64>,
}

#[async_trait]
pub trait CommentGateway: Send + Sync {
    async fn fetch_page(
        &self,
        discussion_id: &DiscussionId,
        request: PageRequest,
    ) -> Result<CommentPage, AppError>;

    /// 指定コメントのうち閲覧者がいいね済みの ID 集合
    async fn fetch_viewer_likes(
        &self,
        comment_ids: &[CommentId],
        viewer: &ViewerId,
    ) -> Result<HashSet<CommentId>, AppError>;

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, AppError>;
}
