use super::rows::{CommentLikeRow, CommentRow, parse_content_range_total};
use crate::application::ports::{CommentGateway, CommentPage, ToggleGateway, ViewerSession};
use crate::domain::entities::{Attachment, Comment, NewComment, PageRequest};
use crate::domain::value_objects::{CommentId, DiscussionId, ToggleKind, ToggleTarget, ViewerId};
use crate::shared::config::GatewayConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

const COMMENTS_TABLE: &str = "discussion_comments";
const VIEWER_COLUMN: &str = "user_id";
const COMMENT_SELECT: &str = "id,discussion_id,parent_id,body,created_at,like_count,user_id,attachments,profiles(id,display_name,username,avatar_url)";

/// PostgREST 互換の REST エンドポイントに対するゲートウェイ実装。
pub struct RestGateway {
    client: Client,
    rest_url: String,
    anon_key: String,
    session: Arc<dyn ViewerSession>,
}

#[derive(Serialize)]
struct CommentInsertBody<'a> {
    discussion_id: &'a str,
    user_id: &'a str,
    parent_id: Option<&'a str>,
    body: &'a str,
    attachments: &'a [Attachment],
}

fn toggle_table(kind: ToggleKind) -> (&'static str, &'static str) {
    match kind {
        ToggleKind::DiscussionLike => ("discussion_likes", "discussion_id"),
        ToggleKind::DiscussionBookmark => ("discussion_bookmarks", "discussion_id"),
        ToggleKind::CommentLike => ("comment_likes", "comment_id"),
    }
}

fn eq_filter(value: &str) -> String {
    format!("eq.{value}")
}

fn in_filter<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = values
        .map(|value| format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

impl RestGateway {
    pub fn new(config: &GatewayConfig, session: Arc<dyn ViewerSession>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;
        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", config.base_url.trim_end_matches('/')),
            anon_key: config.anon_key.clone(),
            session,
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let token = self
            .session
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone());
        let builder = self
            .client
            .request(method, format!("{}/{table}", self.rest_url))
            .header("apikey", &self.anon_key);
        if token.is_empty() {
            builder
        } else {
            builder.bearer_auth(token)
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response, AppError> {
        let response = builder
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthenticated,
            StatusCode::CONFLICT => AppError::Conflict(body),
            StatusCode::NOT_FOUND => AppError::NotFound(body),
            _ => AppError::Network(format!("Gateway error ({status}): {body}")),
        })
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
        let body = response
            .text()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;
        serde_json::from_str(&body).map_err(|err| AppError::DeserializationError(err.to_string()))
    }

    fn toggle_filters(target: &ToggleTarget, viewer: &ViewerId) -> Vec<(&'static str, String)> {
        let (_, column) = toggle_table(target.kind);
        vec![
            (column, eq_filter(target.entity_id.as_str())),
            (VIEWER_COLUMN, eq_filter(viewer.as_str())),
        ]
    }
}

#[async_trait]
impl ToggleGateway for RestGateway {
    async fn fetch_presence(
        &self,
        target: &ToggleTarget,
        viewer: &ViewerId,
    ) -> Result<bool, AppError> {
        let (table, _) = toggle_table(target.kind);
        let builder = self
            .request(Method::GET, table)
            .query(&Self::toggle_filters(target, viewer))
            .query(&[("select", VIEWER_COLUMN), ("limit", "1")]);
        let rows: Vec<Value> = Self::read_json(Self::send(builder).await?).await?;
        Ok(!rows.is_empty())
    }

    async fn insert_record(
        &self,
        target: &ToggleTarget,
        viewer: &ViewerId,
    ) -> Result<(), AppError> {
        let (table, column) = toggle_table(target.kind);
        let mut body = serde_json::Map::new();
        body.insert(column.to_string(), json!(target.entity_id.as_str()));
        body.insert(VIEWER_COLUMN.to_string(), json!(viewer.as_str()));

        let builder = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(&Value::Object(body));
        Self::send(builder).await?;
        debug!(toggle = %target, "toggle record inserted");
        Ok(())
    }

    async fn delete_record(
        &self,
        target: &ToggleTarget,
        viewer: &ViewerId,
    ) -> Result<(), AppError> {
        let (table, _) = toggle_table(target.kind);
        let builder = self
            .request(Method::DELETE, table)
            .header("Prefer", "return=representation")
            .query(&Self::toggle_filters(target, viewer));
        let deleted: Vec<Value> = Self::read_json(Self::send(builder).await?).await?;
        if deleted.is_empty() {
            return Err(AppError::NotFound(format!("no {} record for {target}", target.kind)));
        }
        debug!(toggle = %target, "toggle record deleted");
        Ok(())
    }
}

#[async_trait]
impl CommentGateway for RestGateway {
    async fn fetch_page(
        &self,
        discussion_id: &DiscussionId,
        request: PageRequest,
    ) -> Result<CommentPage, AppError> {
        let builder = self
            .request(Method::GET, COMMENTS_TABLE)
            .header("Prefer", "count=exact")
            .query(&[
                ("discussion_id", eq_filter(discussion_id.as_str())),
                ("select", COMMENT_SELECT.to_string()),
                ("order", "created_at.asc".to_string()),
                ("offset", request.offset().to_string()),
                ("limit", request.limit().to_string()),
            ]);
        let response = Self::send(builder).await?;
        let total_count = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total);
        let rows: Vec<CommentRow> = Self::read_json(response).await?;
        let items = rows
            .into_iter()
            .map(CommentRow::into_comment)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CommentPage { items, total_count })
    }

    async fn fetch_viewer_likes(
        &self,
        comment_ids: &[CommentId],
        viewer: &ViewerId,
    ) -> Result<HashSet<CommentId>, AppError> {
        if comment_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let (table, column) = toggle_table(ToggleKind::CommentLike);
        let builder = self.request(Method::GET, table).query(&[
            (column, in_filter(comment_ids.iter().map(CommentId::as_str))),
            (VIEWER_COLUMN, eq_filter(viewer.as_str())),
            ("select", column.to_string()),
        ]);
        let rows: Vec<CommentLikeRow> = Self::read_json(Self::send(builder).await?).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| CommentId::new(row.comment_id).ok())
            .collect())
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, AppError> {
        let body = CommentInsertBody {
            discussion_id: comment.discussion_id.as_str(),
            user_id: comment.author_id.as_str(),
            parent_id: comment.parent_id.as_ref().map(CommentId::as_str),
            body: &comment.body,
            attachments: &comment.attachments,
        };
        let builder = self
            .request(Method::POST, COMMENTS_TABLE)
            .header("Prefer", "return=representation")
            .query(&[("select", COMMENT_SELECT)])
            .json(&body);
        let rows: Vec<CommentRow> = Self::read_json(Self::send(builder).await?).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::DeserializationError("insert returned no rows".to_string()))?
            .into_comment()
    }
}
