use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub toggle: ToggleConfig,
    pub thread: ThreadConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub anon_key: String,
    pub request_timeout_secs: u64,
}

/// いいね/ブックマークのデバウンス設定（ミリ秒）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToggleConfig {
    pub debounce_ms: u64,
    pub follow_up_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreadConfig {
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                base_url: "http://127.0.0.1:54321".to_string(),
                anon_key: String::new(),
                request_timeout_secs: 15,
            },
            toggle: ToggleConfig::default(),
            thread: ThreadConfig::default(),
            storage: StorageConfig {
                database_url: default_database_url(),
            },
        }
    }
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 350,
            follow_up_ms: 150,
        }
    }
}

impl ToggleConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn follow_up(&self) -> Duration {
        Duration::from_millis(self.follow_up_ms)
    }
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_database_url() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("./data"))
        .join("agora");
    format!("sqlite:{}?mode=rwc", data_dir.join("agora.db").display())
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 環境変数の取得元を差し替え可能にした `from_env` 本体
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("AGORA_GATEWAY_URL") {
            let trimmed = v.trim().trim_end_matches('/');
            if !trimmed.is_empty() {
                cfg.gateway.base_url = trimmed.to_string();
            }
        }
        if let Some(v) = lookup("AGORA_GATEWAY_ANON_KEY") {
            cfg.gateway.anon_key = v.trim().to_string();
        }
        if let Some(value) = lookup("AGORA_GATEWAY_TIMEOUT_SECS").and_then(|v| parse_u64(&v)) {
            cfg.gateway.request_timeout_secs = value.max(1);
        }

        if let Some(value) = lookup("AGORA_TOGGLE_DEBOUNCE_MS").and_then(|v| parse_u64(&v)) {
            cfg.toggle.debounce_ms = value;
        }
        if let Some(value) = lookup("AGORA_TOGGLE_FOLLOW_UP_MS").and_then(|v| parse_u64(&v)) {
            cfg.toggle.follow_up_ms = value;
        }

        if let Some(value) = lookup("AGORA_THREAD_PAGE_SIZE").and_then(|v| parse_u64(&v)) {
            cfg.thread.page_size = (value as usize).max(1);
        }

        if let Some(v) = lookup("AGORA_DATABASE_URL") {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                cfg.storage.database_url = trimmed.to_string();
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.gateway.base_url.is_empty() {
            return Err("Gateway base_url must not be empty".to_string());
        }
        if self.thread.page_size == 0 {
            return Err("Thread page_size must be greater than 0".to_string());
        }
        if self.storage.database_url.is_empty() {
            return Err("Storage database_url must not be empty".to_string());
        }
        Ok(())
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    let parsed = value.trim().parse::<u64>().ok();
    if parsed.is_none() {
        tracing::warn!(value, "ignoring non-numeric configuration value");
    }
    parsed
}
