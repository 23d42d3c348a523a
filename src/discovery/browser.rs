// src/discovery/browser.rs
//! Browsing capability used for search-engine result pages

use async_trait::async_trait;
use url::form_urlencoded;

use crate::core::config_manager::SearchConfig;
use crate::core::{ConfigManager, HttpClient, HttpFetch};
use crate::error::PipelineResult;

/// Renders a page for a URL. A driven browser session handles one
/// navigation at a time; callers serialize access.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn render(&self, target: &str) -> PipelineResult<String>;
}

/// Browser backed by plain HTTP against a search engine's HTML endpoint.
pub struct SearchBrowser {
    fetch: Box<dyn HttpFetch>,
}

impl SearchBrowser {
    pub fn new(fetch: Box<dyn HttpFetch>) -> Self {
        Self { fetch }
    }

    pub fn from_config(config: &ConfigManager) -> PipelineResult<Self> {
        Ok(Self::new(Box::new(HttpClient::from_config(config)?)))
    }
}

#[async_trait]
impl Browser for SearchBrowser {
    async fn render(&self, target: &str) -> PipelineResult<String> {
        self.fetch.get(target).await?.into_success(target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Results,
    Empty,
    /// CAPTCHA or other interstitial in place of results.
    Challenge,
}

pub fn classify_page(html: &str, search: &SearchConfig) -> PageKind {
    let lower = html.to_lowercase();
    let contains = |marker: &String| !marker.is_empty() && lower.contains(&marker.to_lowercase());

    if search.challenge_markers.iter().any(contains) {
        return PageKind::Challenge;
    }
    match &search.result_marker {
        Some(marker) if !contains(marker) => {
            if search.no_results_markers.iter().any(contains) {
                PageKind::Empty
            } else {
                PageKind::Challenge
            }
        }
        _ => PageKind::Results,
    }
}

/// Result page URL for `query`; `page` is 0-based.
pub fn search_url(search: &SearchConfig, query: &str, page: u32) -> String {
    let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
    search
        .url_template
        .replace("{query}", &encoded)
        .replace("{offset}", &(page * search.results_per_page).to_string())
        .replace("{page}", &(page + 1).to_string())
}
