use agora_lib::application::ports::ViewerSession;
use agora_lib::domain::entities::{AuthorSummary, Comment};
use agora_lib::domain::value_objects::{CommentId, DiscussionId, ViewerId};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Mutex;

pub const DISCUSSION: &str = "discussion-1";
pub const VIEWER: &str = "viewer-1";

pub fn discussion_id() -> DiscussionId {
    DiscussionId::new(DISCUSSION).expect("discussion id")
}

pub fn viewer_id() -> ViewerId {
    ViewerId::new(VIEWER).expect("viewer id")
}

pub fn comment_id(id: &str) -> CommentId {
    CommentId::new(id).expect("comment id")
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

/// `minute` 分後に作成されたコメント
pub fn comment(id: &str, parent: Option<&str>, minute: i64) -> Comment {
    Comment {
        id: comment_id(id),
        discussion_id: discussion_id(),
        parent_id: parent.map(comment_id),
        body: format!("body of {id}"),
        created_at: base_time() + Duration::minutes(minute),
        like_count: 0,
        liked_by_viewer: false,
        author: AuthorSummary::placeholder(None),
        attachments: Vec::new(),
    }
}

/// `c000`, `c001`, ... の順に 1 分刻みで作成されたルートコメント
pub fn root_comments(count: usize) -> Vec<Comment> {
    (0..count)
        .map(|i| comment(&format!("c{i:03}"), None, i as i64))
        .collect()
}

/// 差し替え可能な閲覧者セッション
pub struct TestSession {
    viewer: Mutex<Option<ViewerId>>,
}

impl TestSession {
    pub fn signed_in() -> Self {
        Self {
            viewer: Mutex::new(Some(viewer_id())),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            viewer: Mutex::new(None),
        }
    }

    pub fn sign_out(&self) {
        *self.viewer.lock().unwrap() = None;
    }
}

impl ViewerSession for TestSession {
    fn current_viewer(&self) -> Option<ViewerId> {
        self.viewer.lock().unwrap().clone()
    }

    fn access_token(&self) -> Option<String> {
        None
    }
}
