pub mod comment_id;
pub mod discussion_id;
pub mod entity_id;
pub mod toggle_target;
pub mod viewer_id;

pub use comment_id::CommentId;
pub use discussion_id::DiscussionId;
pub use entity_id::EntityId;
pub use toggle_target::{ToggleKind, ToggleTarget};
pub use viewer_id::ViewerId;
