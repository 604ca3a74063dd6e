pub mod entities;
pub mod value_objects;

pub use entities::{Comment, PageCursor, ToggleIntentState, ToggleSnapshot};
pub use value_objects::{CommentId, DiscussionId, EntityId, ToggleKind, ToggleTarget, ViewerId};
