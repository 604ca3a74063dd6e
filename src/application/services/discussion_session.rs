use super::reply_tree::{ExpandedThreads, ReplyTree, ThreadRow};
use super::thread_loader::{PageLoadOutcome, ThreadLoader, ThreadSnapshot};
use super::toggle_controller::{ToggleController, ToggleDeps};
use crate::application::ports::{
    CommentGateway, RealtimeFeed, RetryPrompt, ThreadStateStore, ToggleGateway, ViewerSession,
};
use crate::domain::entities::{Attachment, Comment, ToggleSnapshot};
use crate::domain::value_objects::{CommentId, DiscussionId, ToggleTarget};
use crate::shared::config::{ThreadConfig, ToggleConfig};
use crate::shared::error::AppError;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct DiscussionDeps {
    pub toggle_gateway: Arc<dyn ToggleGateway>,
    pub comment_gateway: Arc<dyn CommentGateway>,
    pub session: Arc<dyn ViewerSession>,
    pub retry_prompt: Arc<dyn RetryPrompt>,
    pub thread_store: Arc<dyn ThreadStateStore>,
    pub realtime: Option<Arc<dyn RealtimeFeed>>,
}

impl DiscussionDeps {
    fn toggle_deps(&self) -> ToggleDeps {
        ToggleDeps {
            gateway: Arc::clone(&self.toggle_gateway),
            session: Arc::clone(&self.session),
            retry_prompt: Arc::clone(&self.retry_prompt),
        }
    }
}

/// コメントいいねのコントローラーと、その表示を一覧へ反映し続けるタスク
struct CommentLike {
    controller: ToggleController,
    mirror: JoinHandle<()>,
}

/// 画面を開いた時点でわかっているディスカッションの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscussionState {
    pub like: ToggleSnapshot,
    pub bookmarked: bool,
}

/// ディスカッション詳細画面 1 つ分の状態。
///
/// いいね・ブックマーク・コメントいいねのコントローラー、コメントローダー、
/// 展開スレッド集合を所有し、`close()` で未送信の操作を送り切る。
pub struct DiscussionSession {
    discussion_id: DiscussionId,
    deps: DiscussionDeps,
    toggle_config: ToggleConfig,
    like: ToggleController,
    bookmark: ToggleController,
    comment_likes: Mutex<HashMap<CommentId, CommentLike>>,
    loader: Arc<ThreadLoader>,
    expanded: Mutex<ExpandedThreads>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DiscussionSession {
    pub async fn open(
        discussion_id: DiscussionId,
        initial: DiscussionState,
        deps: DiscussionDeps,
        toggle_config: ToggleConfig,
        thread_config: ThreadConfig,
    ) -> Self {
        let like = ToggleController::new(
            ToggleTarget::discussion_like(&discussion_id),
            initial.like,
            deps.toggle_deps(),
            toggle_config,
        );
        let bookmark = ToggleController::new(
            ToggleTarget::discussion_bookmark(&discussion_id),
            ToggleSnapshot::flag(initial.bookmarked),
            deps.toggle_deps(),
            toggle_config,
        );
        let loader = Arc::new(ThreadLoader::new(
            discussion_id.clone(),
            Arc::clone(&deps.comment_gateway),
            Arc::clone(&deps.session),
            thread_config.page_size,
        ));
        let expanded = ExpandedThreads::load(deps.thread_store.as_ref(), &discussion_id).await;

        let session = Self {
            discussion_id,
            deps,
            toggle_config,
            like,
            bookmark,
            comment_likes: Mutex::new(HashMap::new()),
            loader,
            expanded: Mutex::new(expanded),
            tasks: Mutex::new(Vec::new()),
        };

        if let Err(err) = session.loader.load_first_page().await {
            // エラーはスナップショットに残る。画面は開いたままにする
            debug!(discussion_id = %session.discussion_id, error = %err, "first page failed on open");
        }

        if let Some(feed) = session.deps.realtime.clone() {
            match session.loader.spawn_realtime_merge(feed).await {
                Ok(handle) => session.tasks.lock().await.push(handle),
                Err(err) => {
                    warn!(discussion_id = %session.discussion_id, error = %err, "realtime subscription failed")
                }
            }
        }

        info!(discussion_id = %session.discussion_id, "discussion session opened");
        session
    }

    pub fn discussion_id(&self) -> &DiscussionId {
        &self.discussion_id
    }

    pub fn like(&self) -> &ToggleController {
        &self.like
    }

    pub fn bookmark(&self) -> &ToggleController {
        &self.bookmark
    }

    pub fn loader(&self) -> &Arc<ThreadLoader> {
        &self.loader
    }

    pub async fn toggle_like(&self) -> Result<ToggleSnapshot, AppError> {
        self.like.toggle().await
    }

    pub async fn toggle_bookmark(&self) -> Result<ToggleSnapshot, AppError> {
        self.bookmark.toggle().await
    }

    /// コメントのいいねを切り替える。コントローラーは初回操作時に生成する。
    pub async fn toggle_comment_like(
        &self,
        comment_id: &CommentId,
    ) -> Result<ToggleSnapshot, AppError> {
        let controller = self.comment_like_controller(comment_id).await?;
        let display = controller.toggle().await?;
        self.loader
            .apply_like_display(comment_id, display.active, display.count)
            .await;
        Ok(display)
    }

    async fn comment_like_controller(
        &self,
        comment_id: &CommentId,
    ) -> Result<ToggleController, AppError> {
        let mut controllers = self.comment_likes.lock().await;
        if let Some(entry) = controllers.get(comment_id) {
            return Ok(entry.controller.clone());
        }

        let comment = self
            .loader
            .comment(comment_id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("comment {comment_id} is not loaded")))?;
        let controller = ToggleController::new(
            ToggleTarget::comment_like(comment_id),
            ToggleSnapshot::new(comment.liked_by_viewer, Some(comment.like_count)),
            self.deps.toggle_deps(),
            self.toggle_config,
        );
        let mirror = self.spawn_like_mirror(comment_id.clone(), &controller);
        controllers.insert(
            comment_id.clone(),
            CommentLike {
                controller: controller.clone(),
                mirror,
            },
        );
        Ok(controller)
    }

    /// 巻き戻しや確定件数の変化を一覧側に反映し続ける
    fn spawn_like_mirror(
        &self,
        comment_id: CommentId,
        controller: &ToggleController,
    ) -> JoinHandle<()> {
        let mut receiver = controller.subscribe();
        let loader = Arc::clone(&self.loader);
        tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let display = *receiver.borrow_and_update();
                loader
                    .apply_like_display(&comment_id, display.active, display.count)
                    .await;
            }
        })
    }

    /// 先頭ページから読み直し、コメントいいねのコントローラーを一覧に合わせる。
    ///
    /// 未同期の操作があるコントローラーはその表示を一覧へ戻す。同期済みのものは
    /// 読み直したサーバー状態を採用し、一覧から外れたコメントの分は破棄する。
    pub async fn refresh(&self) -> Result<PageLoadOutcome, AppError> {
        let outcome = self.loader.load_first_page().await?;

        let mut controllers = self.comment_likes.lock().await;
        let mut released = Vec::new();
        for (comment_id, entry) in controllers.iter() {
            let reloaded = self.loader.comment(comment_id).await;
            let adopted = match &reloaded {
                Some(comment) => {
                    entry
                        .controller
                        .adopt_if_settled(ToggleSnapshot::new(
                            comment.liked_by_viewer,
                            Some(comment.like_count),
                        ))
                        .await
                }
                None => {
                    if entry.controller.is_settled().await {
                        released.push(comment_id.clone());
                    }
                    continue;
                }
            };
            if !adopted {
                let display = entry.controller.display();
                self.loader
                    .apply_like_display(comment_id, display.active, display.count)
                    .await;
            }
        }
        for comment_id in &released {
            if let Some(entry) = controllers.remove(comment_id) {
                entry.mirror.abort();
            }
        }
        if !released.is_empty() {
            debug!(
                discussion_id = %self.discussion_id,
                released = released.len(),
                "released comment like controllers outside the reloaded page"
            );
        }
        Ok(outcome)
    }

    pub async fn load_more(&self) -> Result<PageLoadOutcome, AppError> {
        self.loader.load_next_page().await
    }

    pub async fn post_comment(
        &self,
        body: String,
        parent_id: Option<CommentId>,
        attachments: Vec<Attachment>,
    ) -> Result<Comment, AppError> {
        let parent = parent_id.clone();
        let created = self.loader.post_comment(body, parent_id, attachments).await?;
        if let Some(parent) = parent {
            // 返信先のスレッドは開いておく
            let mut expanded = self.expanded.lock().await;
            if !expanded.is_expanded(&parent) {
                expanded.toggle(&parent);
            }
        }
        Ok(created)
    }

    pub async fn toggle_thread(&self, comment_id: &CommentId) -> bool {
        self.expanded.lock().await.toggle(comment_id)
    }

    pub async fn thread(&self) -> ThreadSnapshot {
        self.loader.snapshot().await
    }

    pub async fn rows(&self) -> Vec<ThreadRow> {
        let snapshot = self.loader.snapshot().await;
        let expanded = self.expanded.lock().await;
        ReplyTree::build(&snapshot.comments).visible_rows(&expanded)
    }

    /// 未送信のトグルを送り切り、展開状態を保存してバックグラウンド処理を止める。
    pub async fn close(&self) {
        let mut controllers = vec![self.like.clone(), self.bookmark.clone()];
        controllers.extend(
            self.comment_likes
                .lock()
                .await
                .values()
                .map(|entry| entry.controller.clone()),
        );
        join_all(controllers.iter().map(|controller| controller.flush())).await;

        let expanded = self.expanded.lock().await.clone();
        expanded
            .save(self.deps.thread_store.as_ref(), &self.discussion_id)
            .await;

        for handle in self.tasks.lock().await.drain(..) {
            handle.abort();
        }
        for (_, entry) in self.comment_likes.lock().await.drain() {
            entry.mirror.abort();
        }
        info!(discussion_id = %self.discussion_id, "discussion session closed");
    }
}
