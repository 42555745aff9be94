use crate::promise::engine::{PagePolicy, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub dataset_dir: String,
    pub page_size: usize,
    pub page_policy: PagePolicy,
    pub cache_ttl_secs: u64,
    pub http_timeout_secs: u64,
    pub stale_after_months: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000/".to_string(),
            dataset_dir: "./metrics".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            page_policy: PagePolicy::Keep,
            cache_ttl_secs: 300,
            http_timeout_secs: 10,
            stale_after_months: 6,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base: std::env::var("API_BASE").unwrap_or(defaults.api_base),
            dataset_dir: std::env::var("DATASET_DIR").unwrap_or(defaults.dataset_dir),
            page_size: std::env::var("PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.page_size),
            page_policy: std::env::var("RESET_PAGE_ON_FILTER")
                .map(|v| {
                    if matches!(v.to_lowercase().as_str(), "1" | "true" | "yes") {
                        PagePolicy::ResetOnFilterChange
                    } else {
                        PagePolicy::Keep
                    }
                })
                .unwrap_or(defaults.page_policy),
            cache_ttl_secs: std::env::var("CACHE_TTL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.cache_ttl_secs),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.http_timeout_secs),
            stale_after_months: std::env::var("STALE_AFTER_MONTHS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.stale_after_months),
        }
    }

    pub fn dataset_path(&self, file_name: &str) -> std::path::PathBuf {
        std::path::Path::new(&self.dataset_dir).join(file_name)
    }
}

pub fn now_ts() -> u64 {
    chrono::Utc::now().timestamp() as u64
}
