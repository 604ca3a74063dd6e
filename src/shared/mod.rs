pub mod config;
pub mod error;

pub use config::{AppConfig, GatewayConfig, StorageConfig, ThreadConfig, ToggleConfig};
pub use error::{AppError, Result};
