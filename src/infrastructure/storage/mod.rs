pub mod connection_pool;
pub mod sqlite_thread_store;

pub use connection_pool::ConnectionPool;
pub use sqlite_thread_store::SqliteThreadStateStore;
