use crate::domain::value_objects::ToggleTarget;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// トグルの保存失敗時にリトライするかをユーザーへ確認するポート。
#[async_trait]
pub trait RetryPrompt: Send + Sync {
    /// `true` を返すと直ちに再送する
    async fn confirm_retry(&self, target: &ToggleTarget, error: &AppError) -> bool;
}

/// 確認を出さず常にリトライしない
pub struct DeclineRetry;

#[async_trait]
impl RetryPrompt for DeclineRetry {
    async fn confirm_retry(&self, _target: &ToggleTarget, _error: &AppError) -> bool {
        false
    }
}
