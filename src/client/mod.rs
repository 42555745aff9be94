//! HTTP access to the promise API.
//!
//! One GET per resource per call, results cached by resource path for a TTL.
//! Failed requests are not retried and not cached; callers surface them as
//! [`FetchState::Unavailable`].

pub mod cache;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;

use crate::config::Config;
use crate::logging::{log_fetch, log_fetch_failure};
use crate::promise::timeline::PromiseDetail;
use crate::promise::{Department, DepartmentListing};
use cache::ResponseCache;

#[async_trait]
pub trait PromiseSource {
    async fn departments(&self) -> Result<Vec<DepartmentListing>>;
    async fn department(&self, slug: &str) -> Result<Department>;
    async fn promise(&self, id: i64) -> Result<PromiseDetail>;
}

pub fn departments_path() -> String {
    "api/v1/departments/".to_string()
}

pub fn department_path(slug: &str) -> String {
    format!("api/v1/departments/{}/", slug.trim_matches('/'))
}

pub fn promise_path(id: i64) -> String {
    format!("api/v1/promises/{}/", id)
}

/// Terminal outcome handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FetchState<T> {
    Loaded { value: T },
    Unavailable { reason: String },
}

impl<T> FetchState<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => FetchState::Loaded { value },
            Err(err) => FetchState::Unavailable {
                reason: format!("{:#}", err),
            },
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, FetchState::Loaded { .. })
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
    cache: Arc<Mutex<ResponseCache>>,
    cache_ttl_secs: u64,
}

impl ApiClient {
    pub fn new(api_base: &str, cache_ttl_secs: u64, timeout_secs: u64) -> Result<Self> {
        // Without a trailing slash `join` would replace the last segment.
        let normalized = if api_base.ends_with('/') {
            api_base.to_string()
        } else {
            format!("{}/", api_base)
        };
        let base = Url::parse(&normalized).with_context(|| format!("invalid API base {}", api_base))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base,
            cache: Arc::new(Mutex::new(ResponseCache::default())),
            cache_ttl_secs,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(&cfg.api_base, cfg.cache_ttl_secs, cfg.http_timeout_secs)
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("bad resource path {}", path))
    }

    pub fn invalidate(&self, path: &str) -> bool {
        self.cache.lock().map(|mut c| c.invalidate(path)).unwrap_or(false)
    }

    /// GET `path` as JSON, served from cache while fresh.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let cached = {
            let cache = self
                .cache
                .lock()
                .map_err(|_| anyhow!("response cache lock poisoned"))?;
            cache.fresh(path, self.cache_ttl_secs).cloned()
        };
        if let Some(body) = cached {
            log_fetch(path, "hit", true, 0.0);
            return serde_json::from_value(body).with_context(|| format!("decoding cached {}", path));
        }

        let started = Instant::now();
        let body = match self.fetch_fresh(path).await {
            Ok(body) => body,
            Err(err) => {
                log_fetch_failure(path, &format!("{:#}", err));
                return Err(err);
            }
        };
        log_fetch(path, "ok", false, started.elapsed().as_secs_f64() * 1000.0);

        let value = serde_json::from_value(body.clone()).with_context(|| format!("decoding {}", path))?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.store(path, body);
        }
        Ok(value)
    }

    async fn fetch_fresh(&self, path: &str) -> Result<serde_json::Value> {
        let url = self.endpoint(path)?;
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("GET {} returned {}", url, status));
        }
        resp.json().await.with_context(|| format!("reading body of {}", url))
    }
}

#[async_trait]
impl PromiseSource for ApiClient {
    async fn departments(&self) -> Result<Vec<DepartmentListing>> {
        self.get_json(&departments_path()).await
    }

    async fn department(&self, slug: &str) -> Result<Department> {
        self.get_json(&department_path(slug)).await
    }

    async fn promise(&self, id: i64) -> Result<PromiseDetail> {
        self.get_json(&promise_path(id)).await
    }
}
