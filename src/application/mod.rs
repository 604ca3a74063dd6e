pub mod ports;
pub mod services;

pub use services::{DiscussionSession, ThreadLoader, ToggleController};
