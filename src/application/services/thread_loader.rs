use crate::application::ports::{
    CommentGateway, CommentPage, RealtimeEvent, RealtimeFeed, ViewerSession,
};
use crate::domain::entities::{Attachment, Comment, NewComment, PageCursor, PageRequest};
use crate::domain::value_objects::{CommentId, DiscussionId};
use crate::shared::error::AppError;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// `load_next_page` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoadOutcome {
    /// 取得して反映した件数
    Loaded(usize),
    /// 読み込み中、または続きがないため何もしなかった
    Skipped,
    /// 取得中に再読み込みが入ったため結果を破棄した
    Superseded,
}

#[derive(Debug, Clone)]
pub struct ThreadSnapshot {
    pub comments: Vec<Comment>,
    pub cursor: PageCursor,
    pub loading: bool,
    pub last_error: Option<AppError>,
}

impl ThreadSnapshot {
    pub fn has_more(&self) -> bool {
        self.cursor.has_more()
    }
}

struct ThreadState {
    comments: Vec<Comment>,
    ids: HashSet<CommentId>,
    cursor: PageCursor,
    loading: bool,
    // load_first_page ごとに進む。古いレスポンスの反映を防ぐ
    epoch: u64,
    last_error: Option<AppError>,
}

impl ThreadState {
    fn reset(&mut self) {
        self.comments.clear();
        self.ids.clear();
        self.cursor.reset();
        self.last_error = None;
    }

    /// ID 重複を除いて作成日時順を保ったまま追加する。追加件数を返す。
    fn merge(&mut self, incoming: Vec<Comment>) -> usize {
        let mut added = 0;
        let mut out_of_order = false;
        for comment in incoming {
            if !self.ids.insert(comment.id.clone()) {
                continue;
            }
            if let Some(last) = self.comments.last() {
                out_of_order |= comment.created_at < last.created_at;
            }
            self.comments.push(comment);
            added += 1;
        }
        if out_of_order {
            // 安定ソートなので同時刻のコメントは取得順のまま
            self.comments.sort_by_key(|comment| comment.created_at);
        }
        added
    }
}

/// ディスカッションのコメントをページ単位で読み込むローダー。
pub struct ThreadLoader {
    discussion_id: DiscussionId,
    gateway: Arc<dyn CommentGateway>,
    session: Arc<dyn ViewerSession>,
    state: Mutex<ThreadState>,
}

impl ThreadLoader {
    pub fn new(
        discussion_id: DiscussionId,
        gateway: Arc<dyn CommentGateway>,
        session: Arc<dyn ViewerSession>,
        page_size: usize,
    ) -> Self {
        Self {
            discussion_id,
            gateway,
            session,
            state: Mutex::new(ThreadState {
                comments: Vec::new(),
                ids: HashSet::new(),
                cursor: PageCursor::new(page_size),
                loading: false,
                epoch: 0,
                last_error: None,
            }),
        }
    }

    pub fn discussion_id(&self) -> &DiscussionId {
        &self.discussion_id
    }

    pub async fn snapshot(&self) -> ThreadSnapshot {
        let state = self.state.lock().await;
        ThreadSnapshot {
            comments: state.comments.clone(),
            cursor: state.cursor.clone(),
            loading: state.loading,
            last_error: state.last_error.clone(),
        }
    }

    pub async fn comment(&self, comment_id: &CommentId) -> Option<Comment> {
        let state = self.state.lock().await;
        state
            .comments
            .iter()
            .find(|comment| &comment.id == comment_id)
            .cloned()
    }

    /// 一覧とカーソルを破棄して先頭ページを読み直す。
    pub async fn load_first_page(&self) -> Result<PageLoadOutcome, AppError> {
        let (epoch, request) = {
            let mut state = self.state.lock().await;
            state.reset();
            state.epoch += 1;
            state.loading = true;
            let request = PageRequest {
                page_index: 0,
                page_size: state.cursor.page_size(),
            };
            (state.epoch, request)
        };

        self.fetch_and_apply(epoch, request).await
    }

    /// 次のページを読み込んで末尾に追加する。
    ///
    /// 読み込み中、または続きがない場合はネットワークに触れずに
    /// `PageLoadOutcome::Skipped` を返す。
    pub async fn load_next_page(&self) -> Result<PageLoadOutcome, AppError> {
        let (epoch, request) = {
            let mut state = self.state.lock().await;
            if state.loading {
                return Ok(PageLoadOutcome::Skipped);
            }
            let Some(request) = state.cursor.next_request() else {
                return Ok(PageLoadOutcome::Skipped);
            };
            state.loading = true;
            (state.epoch, request)
        };

        self.fetch_and_apply(epoch, request).await
    }

    async fn fetch_and_apply(
        &self,
        epoch: u64,
        request: PageRequest,
    ) -> Result<PageLoadOutcome, AppError> {
        let fetched = self.fetch_page(request).await;

        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            debug!(
                discussion_id = %self.discussion_id,
                page = request.page_index,
                "discarding superseded page"
            );
            return Ok(PageLoadOutcome::Superseded);
        }
        state.loading = false;

        match fetched {
            Ok(page) => {
                let fetched_len = page.items.len();
                state.cursor.advance(fetched_len, page.total_count);
                state.last_error = None;
                let added = state.merge(page.items);
                info!(
                    discussion_id = %self.discussion_id,
                    page = request.page_index,
                    fetched = fetched_len,
                    added,
                    has_more = state.cursor.has_more(),
                    "comment page loaded"
                );
                Ok(PageLoadOutcome::Loaded(added))
            }
            Err(err) => {
                let err = err.into_page_load_failure();
                warn!(
                    discussion_id = %self.discussion_id,
                    page = request.page_index,
                    error = %err,
                    "comment page load failed"
                );
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<CommentPage, AppError> {
        let mut page = self
            .gateway
            .fetch_page(&self.discussion_id, request)
            .await?;
        self.resolve_viewer_likes(&mut page.items).await;
        Ok(page)
    }

    /// 閲覧者のいいね状態を付与する。失敗時は未いいねのまま表示する。
    async fn resolve_viewer_likes(&self, comments: &mut [Comment]) {
        for comment in comments.iter_mut() {
            comment.liked_by_viewer = false;
        }
        let Some(viewer) = self.session.current_viewer() else {
            return;
        };
        if comments.is_empty() {
            return;
        }

        let ids: Vec<CommentId> = comments.iter().map(|comment| comment.id.clone()).collect();
        match self.gateway.fetch_viewer_likes(&ids, &viewer).await {
            Ok(liked) => {
                for comment in comments.iter_mut() {
                    comment.liked_by_viewer = liked.contains(&comment.id);
                }
            }
            Err(err) => {
                let err = AppError::SecondaryLookupFailure(err.to_string());
                warn!(
                    discussion_id = %self.discussion_id,
                    error = %err,
                    "viewer like lookup failed; showing comments as not liked"
                );
            }
        }
    }

    /// リアルタイム配信されたコメントを反映する。既にあれば `false`。
    pub async fn merge_realtime(&self, comment: Comment) -> bool {
        if comment.discussion_id != self.discussion_id {
            return false;
        }
        let mut state = self.state.lock().await;
        state.merge(vec![comment]) == 1
    }

    /// フィードを購読し、閉じられるまでバックグラウンドで反映し続ける。
    pub async fn spawn_realtime_merge(
        self: &Arc<Self>,
        feed: Arc<dyn RealtimeFeed>,
    ) -> Result<JoinHandle<()>, AppError> {
        let mut receiver = feed.subscribe_comments(&self.discussion_id).await?;
        let loader = Arc::clone(self);
        Ok(tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                match event {
                    RealtimeEvent::CommentInserted(comment) => {
                        let comment_id = comment.id.clone();
                        if loader.merge_realtime(comment).await {
                            debug!(%comment_id, "realtime comment merged");
                        }
                    }
                }
            }
            debug!(discussion_id = %loader.discussion_id, "realtime feed closed");
        }))
    }

    /// コメントを投稿する。トップレベルなら先頭ページから読み直し、
    /// 返信ならその場で一覧に反映する。
    pub async fn post_comment(
        &self,
        body: String,
        parent_id: Option<CommentId>,
        attachments: Vec<Attachment>,
    ) -> Result<Comment, AppError> {
        let author_id = self
            .session
            .current_viewer()
            .ok_or(AppError::Unauthenticated)?;
        let new_comment = NewComment {
            discussion_id: self.discussion_id.clone(),
            author_id,
            parent_id,
            body,
            attachments,
        };
        new_comment.validate().map_err(AppError::invalid_input)?;

        let created = self.gateway.insert_comment(&new_comment).await?;
        if created.is_root() {
            if let Err(err) = self.load_first_page().await {
                warn!(error = %err, "reload after posting failed");
            }
        } else {
            let mut state = self.state.lock().await;
            state.merge(vec![created.clone()]);
        }
        Ok(created)
    }

    /// いいねコントローラーの表示状態を一覧側へ反映する
    pub async fn apply_like_display(&self, comment_id: &CommentId, liked: bool, count: Option<i64>) {
        let mut state = self.state.lock().await;
        if let Some(comment) = state
            .comments
            .iter_mut()
            .find(|comment| &comment.id == comment_id)
        {
            comment.liked_by_viewer = liked;
            if let Some(count) = count {
                comment.like_count = count;
            }
        }
    }
}
