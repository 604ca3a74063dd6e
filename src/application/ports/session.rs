use crate::domain::value_objects::ViewerId;

/// 現在のログインセッションを参照するポート
pub trait ViewerSession: Send + Sync {
    fn current_viewer(&self) -> Option<ViewerId>;

    fn access_token(&self) -> Option<String>;
}
