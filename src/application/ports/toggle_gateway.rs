use crate::domain::value_objects::{ToggleTarget, ViewerId};
use crate::shared::error::AppError;
use async_trait::async_trait;

/// いいね/ブックマーク行の存在確認と追加・削除を行うポート。
///
/// `insert_record` / `delete_record` は目的の状態が既に成立していても
/// 呼び出してよい。重複は `AppError::Conflict`、未存在は
/// `AppError::NotFound` として返してよく、呼び出し側が成功扱いにする。
#[async_trait]
pub trait ToggleGateway: Send + Sync {
    async fn fetch_presence(&self, target: &ToggleTarget, viewer: &ViewerId)
    -> Result<bool, AppError>;

    async fn insert_record(&self, target: &ToggleTarget, viewer: &ViewerId)
    -> Result<(), AppError>;

    async fn delete_record(&self, target: &ToggleTarget, viewer: &ViewerId)
    -> Result<(), AppError>;
}
