pub mod discussion_session;
pub mod reply_tree;
pub mod thread_loader;
pub mod toggle_controller;

pub use discussion_session::{DiscussionDeps, DiscussionSession, DiscussionState};
pub use reply_tree::{ExpandedThreads, MAX_INDENT_DEPTH, ReplyTree, ThreadRow};
pub use thread_loader::{PageLoadOutcome, ThreadLoader, ThreadSnapshot};
pub use toggle_controller::{ToggleController, ToggleDeps};
