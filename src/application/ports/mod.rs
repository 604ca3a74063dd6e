pub mod comment_gateway;
pub mod realtime_feed;
pub mod retry_prompt;
pub mod session;
pub mod thread_state_store;
pub mod toggle_gateway;

pub use comment_gateway::{CommentGateway, CommentPage};
pub use realtime_feed::{RealtimeEvent, RealtimeFeed};
pub use retry_prompt::{DeclineRetry, RetryPrompt};
pub use session::ViewerSession;
pub use thread_state_store::ThreadStateStore;
pub use toggle_gateway::ToggleGateway;
