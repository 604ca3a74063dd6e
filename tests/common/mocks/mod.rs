pub mod comment_gateway;
pub mod retry_prompt;
pub mod thread_store;
pub mod toggle_gateway;

pub use comment_gateway::*;
pub use retry_prompt::*;
pub use thread_store::*;
pub use toggle_gateway::*;
