use crate::application::ports::ThreadStateStore;
use crate::domain::entities::Comment;
use crate::domain::value_objects::{CommentId, DiscussionId};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// 表示上のインデント上限。データ上の返信の深さには制限を設けない。
pub const MAX_INDENT_DEPTH: usize = 4;

/// 展開中スレッドの集合（画面セッション内で有効）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedThreads {
    ids: HashSet<CommentId>,
}

impl ExpandedThreads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: HashSet<CommentId>) -> Self {
        Self { ids }
    }

    pub fn is_expanded(&self, comment_id: &CommentId) -> bool {
        self.ids.contains(comment_id)
    }

    /// 展開状態を反転し、反転後に展開されているかを返す
    pub fn toggle(&mut self, comment_id: &CommentId) -> bool {
        if self.ids.remove(comment_id) {
            false
        } else {
            self.ids.insert(comment_id.clone());
            true
        }
    }

    pub fn ids(&self) -> &HashSet<CommentId> {
        &self.ids
    }

    /// サイドキャッシュから読み込む。読めない場合は空集合から始める。
    pub async fn load(store: &dyn ThreadStateStore, discussion_id: &DiscussionId) -> Self {
        Self::load_saved(store, discussion_id)
            .await
            .unwrap_or_default()
    }

    /// 保存済みの集合を返す。空集合でも保存されていれば `Some`。
    /// 保存がない場合と読めない場合は `None`。
    pub async fn load_saved(
        store: &dyn ThreadStateStore,
        discussion_id: &DiscussionId,
    ) -> Option<Self> {
        match store.load_expanded(discussion_id).await {
            Ok(saved) => saved.map(Self::from_ids),
            Err(err) => {
                warn!(%discussion_id, error = %err, "expanded thread cache unreadable; starting empty");
                None
            }
        }
    }

    pub async fn save(&self, store: &dyn ThreadStateStore, discussion_id: &DiscussionId) {
        if let Err(err) = store.save_expanded(discussion_id, &self.ids).await {
            warn!(%discussion_id, error = %err, "failed to save expanded thread cache");
        }
    }
}

/// 描画用の 1 行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRow {
    pub comment: Comment,
    pub depth: usize,
    pub indent: usize,
    /// 直下の返信数
    pub reply_count: usize,
    pub expanded: bool,
}

/// フラットなコメント列から組み立てた親子関係。
#[derive(Debug, Clone, Default)]
pub struct ReplyTree {
    roots: Vec<CommentId>,
    children: HashMap<CommentId, Vec<CommentId>>,
    comments: HashMap<CommentId, Comment>,
}

impl ReplyTree {
    /// `parent_id` でグループ化する。ルートも子も入力順を保つ。
    pub fn build(comments: &[Comment]) -> Self {
        let mut tree = Self::default();
        for comment in comments {
            if tree.comments.contains_key(&comment.id) {
                continue;
            }
            match &comment.parent_id {
                None => tree.roots.push(comment.id.clone()),
                Some(parent_id) => tree
                    .children
                    .entry(parent_id.clone())
                    .or_default()
                    .push(comment.id.clone()),
            }
            tree.comments.insert(comment.id.clone(), comment.clone());
        }
        tree
    }

    pub fn roots(&self) -> impl Iterator<Item = &Comment> {
        self.roots.iter().filter_map(|id| self.comments.get(id))
    }

    pub fn children(&self, comment_id: &CommentId) -> impl Iterator<Item = &Comment> {
        self.children
            .get(comment_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.comments.get(id))
    }

    pub fn reply_count(&self, comment_id: &CommentId) -> usize {
        self.children.get(comment_id).map_or(0, Vec::len)
    }

    /// 配下の返信総数（孫以降を含む）
    pub fn descendant_count(&self, comment_id: &CommentId) -> usize {
        let mut visited = HashSet::new();
        let mut stack = vec![comment_id.clone()];
        let mut count = 0;
        while let Some(id) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            for child in self.children.get(&id).into_iter().flatten() {
                if !visited.contains(child) {
                    count += 1;
                    stack.push(child.clone());
                }
            }
        }
        count
    }

    /// 展開状態に従って深さ優先で描画行に展開する。
    ///
    /// 親が読み込まれていない返信は親が届くまで表示しない。
    pub fn visible_rows(&self, expanded: &ExpandedThreads) -> Vec<ThreadRow> {
        let mut rows = Vec::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<(&CommentId, usize)> =
            self.roots.iter().rev().map(|id| (id, 0)).collect();

        while let Some((id, depth)) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            let Some(comment) = self.comments.get(id) else {
                continue;
            };
            let reply_count = self.reply_count(id);
            let is_expanded = reply_count > 0 && expanded.is_expanded(id);
            rows.push(ThreadRow {
                comment: comment.clone(),
                depth,
                indent: depth.min(MAX_INDENT_DEPTH),
                reply_count,
                expanded: is_expanded,
            });

            if is_expanded {
                if let Some(children) = self.children.get(id) {
                    for child in children.iter().rev() {
                        stack.push((child, depth + 1));
                    }
                }
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::AuthorSummary;
    use chrono::{TimeZone, Utc};

    fn comment(id: &str, parent: Option<&str>, minute: u32) -> Comment {
        Comment {
            id: CommentId::new(id).unwrap(),
            discussion_id: DiscussionId::new("d-1").unwrap(),
            parent_id: parent.map(|p| CommentId::new(p).unwrap()),
            body: format!("body {id}"),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
            like_count: 0,
            liked_by_viewer: false,
            author: AuthorSummary::placeholder(None),
            attachments: Vec::new(),
        }
    }

    fn id(value: &str) -> CommentId {
        CommentId::new(value).unwrap()
    }

    fn row_ids(rows: &[ThreadRow]) -> Vec<&str> {
        rows.iter().map(|row| row.comment.id.as_str()).collect()
    }

    fn sample() -> Vec<Comment> {
        vec![
            comment("a", None, 0),
            comment("b", None, 1),
            comment("a1", Some("a"), 2),
            comment("a2", Some("a"), 3),
            comment("a1x", Some("a1"), 4),
        ]
    }

    #[test]
    fn roots_keep_fetch_order() {
        let tree = ReplyTree::build(&sample());
        let roots: Vec<&str> = tree.roots().map(|c| c.id.as_str()).collect();
        assert_eq!(roots, vec!["a", "b"]);
        assert_eq!(tree.reply_count(&id("a")), 2);
        assert_eq!(tree.reply_count(&id("b")), 0);
        assert_eq!(tree.descendant_count(&id("a")), 3);
    }

    #[test]
    fn collapsed_threads_show_only_roots() {
        let tree = ReplyTree::build(&sample());
        let rows = tree.visible_rows(&ExpandedThreads::new());
        assert_eq!(row_ids(&rows), vec!["a", "b"]);
        assert_eq!(rows[0].reply_count, 2);
        assert!(!rows[0].expanded);
    }

    #[test]
    fn expanding_descends_depth_first() {
        let tree = ReplyTree::build(&sample());
        let mut expanded = ExpandedThreads::new();
        assert!(expanded.toggle(&id("a")));
        expanded.toggle(&id("a1"));

        let rows = tree.visible_rows(&expanded);
        assert_eq!(row_ids(&rows), vec!["a", "a1", "a1x", "a2", "b"]);
        let depths: Vec<usize> = rows.iter().map(|row| row.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 1, 0]);

        assert!(!expanded.toggle(&id("a")));
        assert_eq!(row_ids(&tree.visible_rows(&expanded)), vec!["a", "b"]);
    }

    #[test]
    fn indent_is_capped_but_depth_is_not() {
        let mut comments = vec![comment("c0", None, 0)];
        let mut expanded = ExpandedThreads::new();
        for level in 1..=6 {
            let parent = format!("c{}", level - 1);
            comments.push(comment(&format!("c{level}"), Some(&parent), level));
            expanded.toggle(&id(&parent));
        }
        let rows = ReplyTree::build(&comments).visible_rows(&expanded);
        let last = rows.last().unwrap();
        assert_eq!(last.depth, 6);
        assert_eq!(last.indent, MAX_INDENT_DEPTH);
    }

    #[test]
    fn orphans_and_cycles_are_not_rendered() {
        let comments = vec![
            comment("root", None, 0),
            comment("orphan", Some("missing"), 1),
            comment("x", Some("y"), 2),
            comment("y", Some("x"), 3),
        ];
        let tree = ReplyTree::build(&comments);
        let mut expanded = ExpandedThreads::new();
        expanded.toggle(&id("x"));
        expanded.toggle(&id("y"));
        assert_eq!(row_ids(&tree.visible_rows(&expanded)), vec!["root"]);
        assert_eq!(tree.descendant_count(&id("x")), 1);
    }
}
