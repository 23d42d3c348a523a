// src/discovery/link_collector.rs
//! Drives search queries through the browser and harvests candidate portal links

use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::browser::{classify_page, search_url, Browser, PageKind};
use crate::core::{ConfigManager, DedupSink, FsOps, RetryPolicy};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{CandidateLink, FailedQuery, Platform, StageReport};
use crate::utils::{host_matches, normalize_url, unwrap_search_redirect};

pub struct LinkCollector<'a> {
    config: &'a ConfigManager,
    browser: &'a dyn Browser,
    /// Held for the duration of one navigation.
    session: Mutex<()>,
    policy: RetryPolicy,
}

#[derive(Debug)]
pub struct CollectOutcome {
    /// Every known link for the platform: prior runs first, then new ones.
    pub links: Vec<CandidateLink>,
    pub failed: Vec<FailedQuery>,
    pub report: StageReport,
}

struct QueryHarvest {
    links: Vec<String>,
    pages: u32,
    failure: Option<String>,
}

fn link_key(link: &CandidateLink) -> String {
    link.url.clone()
}

impl<'a> LinkCollector<'a> {
    pub fn new(config: &'a ConfigManager, browser: &'a dyn Browser) -> Self {
        Self {
            config,
            browser,
            session: Mutex::new(()),
            policy: config.retry_policy(),
        }
    }

    /// Run every query, union the links with the platform's existing link
    /// list and append only the new ones.
    pub async fn collect(
        &self,
        platform: Platform,
        queries: &[String],
    ) -> PipelineResult<CollectOutcome> {
        let hosts = self.config.link_hosts_for(platform)?;
        let (sink, prior) = DedupSink::open(&self.config.links_path(platform), link_key)?;
        info!(
            "Collecting {} links: {} queries, {} links already known",
            platform,
            queries.len(),
            prior.len()
        );

        let mut report = StageReport::new("collect");
        report.input = queries.len();

        let sink = &sink;
        let results = stream::iter(queries)
            .map(|query| async move {
                let harvest = self.harvest_query(query, hosts).await;
                let candidates = harvest
                    .links
                    .iter()
                    .map(|url| CandidateLink {
                        platform,
                        url: url.clone(),
                        query: query.clone(),
                    })
                    .collect();
                let write = sink.append_new(candidates).await?;
                info!(
                    "Query '{}': {} pages, {} new links",
                    query,
                    harvest.pages,
                    write.written.len()
                );
                Ok::<_, PipelineError>((query, harvest.pages, harvest.failure, write))
            })
            .buffered(self.config.concurrency)
            .collect::<Vec<_>>()
            .await;

        let mut links = prior;
        let mut failed = Vec::new();
        for result in results {
            let (query, pages, failure, write) = result?;
            report.produced += write.written.len();
            report.duplicates += write.duplicates;
            links.extend(write.written);
            if let Some(reason) = failure {
                // Blocked after some pages went through: ledgered, but not a failed query
                if pages == 0 {
                    report.failed += 1;
                }
                failed.push(FailedQuery {
                    platform,
                    query: query.clone(),
                    reason,
                });
            }
        }

        FsOps::write_records(&self.config.failed_queries_path(platform), &failed)?;
        info!("{} ({} links total)", report, links.len());

        Ok(CollectOutcome {
            links,
            failed,
            report,
        })
    }

    /// Paginate one query until `max_pages`, an empty page, or a page with
    /// nothing new. A page that keeps failing abandons the query but keeps
    /// what earlier pages produced.
    async fn harvest_query(&self, query: &str, hosts: &[String]) -> QueryHarvest {
        let mut seen = HashSet::new();
        let mut harvest = QueryHarvest {
            links: Vec::new(),
            pages: 0,
            failure: None,
        };

        for page in 0..self.config.max_pages {
            let url = search_url(&self.config.search, query, page);
            let label = format!("search '{}' page {}", query, page + 1);

            match self.policy.run(&label, |_| self.render_results(&url)).await {
                Ok(None) => {
                    debug!("{}: no results", label);
                    break;
                }
                Ok(Some(html)) => {
                    harvest.pages += 1;
                    let before = harvest.links.len();
                    for link in extract_links(&html, &url, hosts) {
                        if seen.insert(link.clone()) {
                            harvest.links.push(link);
                        }
                    }
                    if harvest.links.len() == before {
                        debug!("{}: nothing new, stopping", label);
                        break;
                    }
                }
                Err(e) => {
                    warn!("Giving up on query '{}': {}", query, e);
                    harvest.failure = Some(e.to_string());
                    break;
                }
            }
        }
        harvest
    }

    /// One navigation: randomized pause, render, interstitial check.
    async fn render_results(&self, url: &str) -> PipelineResult<Option<String>> {
        let _session = self.session.lock().await;
        tokio::time::sleep(self.navigation_delay()).await;

        let html = self.browser.render(url).await?;
        match classify_page(&html, &self.config.search) {
            PageKind::Results => Ok(Some(html)),
            PageKind::Empty => Ok(None),
            PageKind::Challenge => Err(PipelineError::fetch(url, "anti-bot challenge page", true)),
        }
    }

    /// Uniform in [request_delay, 2 * request_delay].
    fn navigation_delay(&self) -> Duration {
        let base = self.config.request_delay_ms;
        if base == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(fastrand::u64(base..=base.saturating_mul(2)))
    }
}

/// Normalized links on a result page whose host matches one of `hosts`.
pub fn extract_links(html: &str, page_url: &str, hosts: &[String]) -> Vec<String> {
    let (Ok(base), Ok(selector)) = (Url::parse(page_url), Selector::parse("a[href]")) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(target) = unwrap_search_redirect(href, &base) else {
            continue;
        };
        let Some(host) = target.host_str() else {
            continue;
        };
        if !hosts.iter().any(|pattern| host_matches(host, pattern)) {
            continue;
        }
        if let Some(normalized) = normalize_url(target.as_str()) {
            if seen.insert(normalized.clone()) {
                links.push(normalized);
            }
        }
    }
    links
}
