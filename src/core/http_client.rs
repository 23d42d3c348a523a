// src/core/http_client.rs
//! HTTP fetch capability - reqwest client with bounded timeout and per-host pacing

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use std::time::Duration;
use tracing::{debug, trace};

use crate::core::ConfigManager;
use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Turn non-2xx statuses into fetch errors. 429 and 5xx are retryable.
    pub fn into_success(self, url: &str) -> PipelineResult<String> {
        match self.status {
            200..=299 => Ok(self.body),
            429 | 500..=599 => Err(PipelineError::fetch(
                url,
                format!("HTTP {}", self.status),
                true,
            )),
            status => Err(PipelineError::fetch(url, format!("HTTP {}", status), false)),
        }
    }
}

#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(&self, url: &str) -> PipelineResult<FetchResponse>;
}

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Enforces a minimum interval between requests to the same host.
pub struct HostRateLimiter {
    limiter: Option<KeyedLimiter>,
}

impl HostRateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            limiter: Quota::with_period(min_interval).map(RateLimiter::keyed),
        }
    }

    pub async fn wait(&self, url: &str) {
        if let Some(limiter) = &self.limiter {
            let host = url::Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_default();
            limiter.until_key_ready(&host).await;
        }
    }
}

pub struct HttpClient {
    client: reqwest::Client,
    limiter: HostRateLimiter,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration, min_interval: Duration) -> PipelineResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| PipelineError::config(format!("invalid user agent: {}", e)))?,
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(|e| PipelineError::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            limiter: HostRateLimiter::new(min_interval),
        })
    }

    pub fn from_config(config: &ConfigManager) -> PipelineResult<Self> {
        Self::new(&config.user_agent, config.timeout(), config.request_delay())
    }
}

#[async_trait]
impl HttpFetch for HttpClient {
    async fn get(&self, url: &str) -> PipelineResult<FetchResponse> {
        self.limiter.wait(url).await;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            // Malformed URLs and redirect loops will not fix themselves
            let retryable = !(e.is_builder() || e.is_redirect());
            PipelineError::fetch(url, e.to_string(), retryable)
        })?;

        let status = response.status().as_u16();
        trace!("Response status: {}", status);

        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::fetch(url, format!("failed to read body: {}", e), true))?;

        Ok(FetchResponse { status, body })
    }
}
