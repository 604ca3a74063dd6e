use super::connection_pool::ConnectionPool;
use crate::application::ports::ThreadStateStore;
use crate::domain::value_objects::{CommentId, DiscussionId};
use crate::shared::config::StorageConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// 展開スレッド集合を SQLite に JSON 配列で保存する
#[derive(Clone)]
pub struct SqliteThreadStateStore {
    pool: ConnectionPool,
}

impl SqliteThreadStateStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// 設定の DB を開いてマイグレーションまで済ませる。
    /// ファイル DB の場合は親ディレクトリも作成する。
    pub async fn open(config: &StorageConfig) -> Result<Self, AppError> {
        if let Some(parent) = database_file(&config.database_url).and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|err| AppError::Storage(err.to_string()))?;
            }
        }

        let pool = ConnectionPool::new(&config.database_url).await?;
        pool.migrate().await?;
        info!(database_url = %config.database_url, "thread state store opened");
        Ok(Self::new(pool))
    }

    fn pool(&self) -> &SqlitePool {
        self.pool.get_pool()
    }
}

/// `sqlite:` URL からファイルパス部分を取り出す。メモリ DB は `None`。
fn database_file(url: &str) -> Option<&Path> {
    let rest = url.strip_prefix("sqlite:")?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(Path::new(path))
}

#[async_trait]
impl ThreadStateStore for SqliteThreadStateStore {
    async fn load_expanded(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Option<HashSet<CommentId>>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT expanded_json
            FROM thread_state
            WHERE discussion_id = ?1
            "#,
        )
        .bind(discussion_id.as_str())
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("expanded_json")?;
        let ids: Vec<String> = serde_json::from_str(&raw)
            .map_err(|err| AppError::DeserializationError(err.to_string()))?;
        // 空文字など壊れた ID は読み飛ばす
        Ok(Some(
            ids.into_iter()
                .filter_map(|id| CommentId::new(id).ok())
                .collect(),
        ))
    }

    async fn save_expanded(
        &self,
        discussion_id: &DiscussionId,
        expanded: &HashSet<CommentId>,
    ) -> Result<(), AppError> {
        let mut ids: Vec<&str> = expanded.iter().map(CommentId::as_str).collect();
        ids.sort_unstable();
        let json = serde_json::to_string(&ids)?;

        sqlx::query(
            r#"
            INSERT INTO thread_state (discussion_id, expanded_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(discussion_id) DO UPDATE SET
                expanded_json = excluded.expanded_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(discussion_id.as_str())
        .bind(json)
        .bind(Utc::now().timestamp_millis())
        .execute(self.pool())
        .await?;

        debug!(discussion_id = %discussion_id, count = ids.len(), "expanded threads saved");
        Ok(())
    }
}
