use crate::domain::value_objects::{CommentId, DiscussionId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::collections::HashSet;

/// 展開中スレッド ID をディスカッション単位で保存するサイドキャッシュ。
/// 内容は正とはみなさない。
#[async_trait]
pub trait ThreadStateStore: Send + Sync {
    async fn load_expanded(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Option<HashSet<CommentId>>, AppError>;

    async fn save_expanded(
        &self,
        discussion_id: &DiscussionId,
        expanded: &HashSet<CommentId>,
    ) -> Result<(), AppError>;
}
