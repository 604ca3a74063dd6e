use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("Unauthenticated: sign in to continue")]
    Unauthenticated,

    #[error("Failed to persist change: {0}")]
    TransientWriteFailure(String),

    #[error("Failed to load comments: {0}")]
    PageLoadFailure(String),

    #[error("Failed to resolve viewer state: {0}")]
    SecondaryLookupFailure(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn network(message: impl Into<String>) -> Self {
        AppError::Network(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        AppError::InvalidInput(message.into())
    }

    /// 書き込み失敗をトグル用の分類に寄せる
    pub fn into_write_failure(self) -> Self {
        match self {
            AppError::Unauthenticated => AppError::Unauthenticated,
            AppError::TransientWriteFailure(msg) => AppError::TransientWriteFailure(msg),
            other => AppError::TransientWriteFailure(other.to_string()),
        }
    }

    pub fn into_page_load_failure(self) -> Self {
        match self {
            AppError::PageLoadFailure(msg) => AppError::PageLoadFailure(msg),
            other => AppError::PageLoadFailure(other.to_string()),
        }
    }

    /// 挿入時の重複・削除時の未存在は目的の状態が既に成立しているとみなす
    pub fn is_already_applied(&self, inserting: bool) -> bool {
        matches!(
            (self, inserting),
            (AppError::Conflict(_), true) | (AppError::NotFound(_), false)
        )
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
