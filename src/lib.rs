use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

use application::ports::ViewerSession;
use application::services::{ExpandedThreads, PageLoadOutcome, ReplyTree, ThreadLoader};
use domain::entities::Comment;
use domain::value_objects::{DiscussionId, ViewerId};
use infrastructure::{RestGateway, SessionStore, SqliteThreadStateStore};
use shared::AppConfig;

/// ログ設定の初期化。`RUST_LOG` があればそちらを優先する。
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// ディスカッションのコメントを全件読み込み、返信ツリーを出力する。
///
/// 展開状態はローカルに保存されたものを使い、保存がなければ全展開する。
pub async fn run() -> Result<()> {
    init_logging();

    let config = AppConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;

    let discussion_id = std::env::var("AGORA_DISCUSSION_ID")
        .context("AGORA_DISCUSSION_ID is not set")
        .and_then(|value| DiscussionId::new(value).map_err(anyhow::Error::msg))?;

    let session = Arc::new(SessionStore::new());
    if let Ok(viewer) = std::env::var("AGORA_VIEWER_ID") {
        let viewer = ViewerId::new(viewer).map_err(anyhow::Error::msg)?;
        session.sign_in(viewer, std::env::var("AGORA_ACCESS_TOKEN").ok());
    }
    let session: Arc<dyn ViewerSession> = session;

    info!(%discussion_id, base_url = %config.gateway.base_url, "loading discussion");

    let store = SqliteThreadStateStore::open(&config.storage).await?;
    let saved = ExpandedThreads::load_saved(&store, &discussion_id).await;

    let gateway = Arc::new(RestGateway::new(&config.gateway, Arc::clone(&session))?);
    let loader = ThreadLoader::new(discussion_id, gateway, session, config.thread.page_size);

    loader.load_first_page().await?;
    while let PageLoadOutcome::Loaded(_) = loader.load_next_page().await? {}

    let snapshot = loader.snapshot().await;
    let tree = ReplyTree::build(&snapshot.comments);
    let expanded = initial_expanded(saved, &snapshot.comments);
    let rows = tree.visible_rows(&expanded);

    for row in &rows {
        let liked = if row.comment.liked_by_viewer { "*" } else { " " };
        println!(
            "{}{} {} [{}{}] {}",
            "  ".repeat(row.indent),
            row.comment.author.display_name,
            row.comment.created_at.format("%Y-%m-%d %H:%M"),
            liked,
            row.comment.like_count,
            row.comment.body
        );
    }
    info!(
        comments = snapshot.comments.len(),
        rendered = rows.len(),
        "discussion rendered"
    );
    Ok(())
}

/// 保存がなければ全スレッドを開いて表示する。全部閉じた状態の保存はそのまま使う。
fn initial_expanded(saved: Option<ExpandedThreads>, comments: &[Comment]) -> ExpandedThreads {
    saved.unwrap_or_else(|| {
        let all: HashSet<_> = comments.iter().map(|c| c.id.clone()).collect();
        ExpandedThreads::from_ids(all)
    })
}
