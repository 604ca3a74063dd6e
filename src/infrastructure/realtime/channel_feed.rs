use crate::application::ports::{RealtimeEvent, RealtimeFeed};
use crate::domain::value_objects::DiscussionId;
use crate::shared::error::AppError;
use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

const DEFAULT_CAPACITY: usize = 256;

/// 埋め込み側から受け取ったリアルタイム通知を購読者へ配る
#[derive(Clone)]
pub struct ChannelRealtimeFeed {
    sender: broadcast::Sender<RealtimeEvent>,
    capacity: usize,
}

impl Default for ChannelRealtimeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChannelRealtimeFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// 購読者数を返す。誰も購読していなければ 0。
    pub fn publish(&self, event: RealtimeEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

fn belongs_to(event: &RealtimeEvent, discussion_id: &DiscussionId) -> bool {
    match event {
        RealtimeEvent::CommentInserted(comment) => &comment.discussion_id == discussion_id,
    }
}

#[async_trait]
impl RealtimeFeed for ChannelRealtimeFeed {
    async fn subscribe_comments(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<mpsc::Receiver<RealtimeEvent>, AppError> {
        let mut source = self.sender.subscribe();
        let (tx, rx) = mpsc::channel(self.capacity);
        let discussion_id = discussion_id.clone();

        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(event) => {
                        if !belongs_to(&event, &discussion_id) {
                            continue;
                        }
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(%discussion_id, skipped, "realtime subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!(%discussion_id, "realtime forwarding stopped");
        });

        Ok(rx)
    }
}
