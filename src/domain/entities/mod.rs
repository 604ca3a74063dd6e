pub mod comment;
pub mod page_cursor;
pub mod toggle_intent;

pub use comment::{AuthorSummary, Attachment, Comment, NewComment, PLACEHOLDER_DISPLAY_NAME};
pub use page_cursor::{PageCursor, PageRequest};
pub use toggle_intent::{ToggleIntentState, ToggleSnapshot};
