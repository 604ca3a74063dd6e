use agora_lib::application::ports::{CommentGateway, CommentPage};
use agora_lib::domain::entities::{AuthorSummary, Comment, NewComment, PageRequest};
use agora_lib::domain::value_objects::{CommentId, DiscussionId, ViewerId};
use agora_lib::shared::error::AppError;
use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// メモリ上のコメント一覧をページングして返すゲートウェイ
pub struct InMemoryCommentGateway {
    comments: Mutex<Vec<Comment>>,
    liked: Mutex<HashSet<CommentId>>,
    report_total: bool,
    failing_pages: Mutex<HashSet<u32>>,
    fail_likes: AtomicBool,
    page_fetches: AtomicUsize,
    like_lookups: AtomicUsize,
    requests: Mutex<Vec<PageRequest>>,
}

impl InMemoryCommentGateway {
    pub fn new(comments: Vec<Comment>) -> Self {
        Self {
            comments: Mutex::new(comments),
            liked: Mutex::new(HashSet::new()),
            report_total: true,
            failing_pages: Mutex::new(HashSet::new()),
            fail_likes: AtomicBool::new(false),
            page_fetches: AtomicUsize::new(0),
            like_lookups: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 総件数を返さないバックエンドを模す
    pub fn without_total(mut self) -> Self {
        self.report_total = false;
        self
    }

    pub fn with_liked(self, ids: &[&str]) -> Self {
        {
            let mut liked = self.liked.lock().unwrap();
            for id in ids {
                liked.insert(CommentId::new(*id).unwrap());
            }
        }
        self
    }

    pub fn fail_page(&self, page_index: u32) {
        self.failing_pages.lock().unwrap().insert(page_index);
    }

    pub fn heal_page(&self, page_index: u32) {
        self.failing_pages.lock().unwrap().remove(&page_index);
    }

    pub fn fail_like_lookups(&self) {
        self.fail_likes.store(true, Ordering::SeqCst);
    }

    pub fn push(&self, comment: Comment) {
        self.comments.lock().unwrap().push(comment);
    }

    /// 別端末での操作などでサーバー側のいいね状態が変わったことを模す
    pub fn set_viewer_like(&self, id: &str, liked: bool, like_count: i64) {
        let id = CommentId::new(id).unwrap();
        if let Some(comment) = self
            .comments
            .lock()
            .unwrap()
            .iter_mut()
            .find(|comment| comment.id == id)
        {
            comment.like_count = like_count;
        }
        let mut viewer_likes = self.liked.lock().unwrap();
        if liked {
            viewer_likes.insert(id);
        } else {
            viewer_likes.remove(&id);
        }
    }

    pub fn page_fetches(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }

    pub fn like_lookups(&self) -> usize {
        self.like_lookups.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommentGateway for InMemoryCommentGateway {
    async fn fetch_page(
        &self,
        discussion_id: &DiscussionId,
        request: PageRequest,
    ) -> Result<CommentPage, AppError> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        if self
            .failing_pages
            .lock()
            .unwrap()
            .contains(&request.page_index)
        {
            return Err(AppError::network("connection reset"));
        }

        let mut matching: Vec<Comment> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|comment| &comment.discussion_id == discussion_id)
            .cloned()
            .collect();
        matching.sort_by_key(|comment| comment.created_at);
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(request.offset())
            .take(request.limit())
            .collect();

        Ok(CommentPage {
            items,
            total_count: self.report_total.then_some(total),
        })
    }

    async fn fetch_viewer_likes(
        &self,
        comment_ids: &[CommentId],
        _viewer: &ViewerId,
    ) -> Result<HashSet<CommentId>, AppError> {
        self.like_lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_likes.load(Ordering::SeqCst) {
            return Err(AppError::network("likes lookup timed out"));
        }
        let liked = self.liked.lock().unwrap();
        Ok(comment_ids
            .iter()
            .filter(|id| liked.contains(*id))
            .cloned()
            .collect())
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, AppError> {
        let mut comments = self.comments.lock().unwrap();
        let latest = comments.iter().map(|c| c.created_at).max();
        let created = Comment {
            id: CommentId::new(format!("new-{}", comments.len())).unwrap(),
            discussion_id: comment.discussion_id.clone(),
            parent_id: comment.parent_id.clone(),
            body: comment.body.clone(),
            created_at: latest
                .map(|at| at + Duration::minutes(1))
                .unwrap_or_else(chrono::Utc::now),
            like_count: 0,
            liked_by_viewer: false,
            author: AuthorSummary::placeholder(Some(comment.author_id.to_string())),
            attachments: comment.attachments.clone(),
        };
        comments.push(created.clone());
        Ok(created)
    }
}
