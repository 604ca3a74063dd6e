pub mod gateway;
pub mod realtime;
pub mod session;
pub mod storage;

pub use gateway::RestGateway;
pub use realtime::ChannelRealtimeFeed;
pub use session::SessionStore;
pub use storage::{ConnectionPool, SqliteThreadStateStore};
