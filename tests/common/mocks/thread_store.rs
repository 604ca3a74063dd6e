use agora_lib::application::ports::ThreadStateStore;
use agora_lib::domain::value_objects::{CommentId, DiscussionId};
use agora_lib::shared::error::AppError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryThreadStore {
    saved: Mutex<HashMap<DiscussionId, HashSet<CommentId>>>,
}

impl MemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self, discussion_id: &DiscussionId) -> Option<HashSet<CommentId>> {
        self.saved.lock().unwrap().get(discussion_id).cloned()
    }
}

#[async_trait]
impl ThreadStateStore for MemoryThreadStore {
    async fn load_expanded(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Option<HashSet<CommentId>>, AppError> {
        Ok(self.saved(discussion_id))
    }

    async fn save_expanded(
        &self,
        discussion_id: &DiscussionId,
        expanded: &HashSet<CommentId>,
    ) -> Result<(), AppError> {
        self.saved
            .lock()
            .unwrap()
            .insert(discussion_id.clone(), expanded.clone());
        Ok(())
    }
}
