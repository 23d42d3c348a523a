// src/scraping/portal_scraper.rs
//! Per-portal listing scrape, run as an explicit state machine over pages

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::adapters::{AdapterRegistry, ListingAdapter};
use crate::core::{ConfigManager, DedupSink, FsOps, HttpFetch, RetryPolicy};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{CompanyPortal, FailedPortal, JobRecord, Platform, StageReport};

/// Where one portal's scrape currently stands.
#[derive(Debug)]
enum ScrapeState {
    Fetching { url: String, page: u32 },
    Parsing { url: String, page: u32, body: String },
    Paginating { next_url: String, page: u32 },
    Done,
    Failed(PipelineError),
}

pub struct PortalScraper<'a> {
    config: &'a ConfigManager,
    fetcher: &'a dyn HttpFetch,
    registry: &'a AdapterRegistry,
    policy: RetryPolicy,
}

#[derive(Debug)]
pub struct ScrapeOutcome {
    /// Records appended by this run.
    pub records: Vec<JobRecord>,
    pub failed: Vec<FailedPortal>,
    pub report: StageReport,
}

fn job_key(record: &JobRecord) -> String {
    format!("{}:{}", record.platform, record.posting_id)
}

impl<'a> PortalScraper<'a> {
    pub fn new(
        config: &'a ConfigManager,
        fetcher: &'a dyn HttpFetch,
        registry: &'a AdapterRegistry,
    ) -> Self {
        Self {
            config,
            fetcher,
            registry,
            policy: config.retry_policy(),
        }
    }

    fn adapter(&self, platform: Platform) -> PipelineResult<Arc<dyn ListingAdapter>> {
        self.registry.get(platform).ok_or_else(|| {
            PipelineError::config(format!("no listing adapter registered for {}", platform))
        })
    }

    /// Scrape every page of one portal. Records are unique by posting id.
    pub async fn scrape(&self, portal: &CompanyPortal) -> PipelineResult<Vec<JobRecord>> {
        let adapter = self.adapter(portal.platform)?;
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        let mut parse_retries = 0;

        let mut state = ScrapeState::Fetching {
            url: adapter.first_page_url(portal)?,
            page: 1,
        };
        loop {
            state = match state {
                ScrapeState::Fetching { url, page } => {
                    let label = format!("{} {} page {}", portal.platform, portal.slug, page);
                    match self.policy.run(&label, |_| self.fetch_page(&url)).await {
                        Ok(body) => ScrapeState::Parsing { url, page, body },
                        Err(e) => ScrapeState::Failed(e),
                    }
                }
                ScrapeState::Parsing { url, page, body } => {
                    match adapter.parse_page(portal, &url, page, &body) {
                        Ok(listing) => {
                            parse_retries = 0;
                            let before = records.len();
                            for record in listing.records {
                                if seen.insert(record.posting_id.clone()) {
                                    records.push(record);
                                }
                            }
                            let added = records.len() - before;
                            debug!("{} page {}: {} new postings", portal.slug, page, added);

                            match listing.next_url {
                                Some(next_url) if added > 0 => {
                                    ScrapeState::Paginating { next_url, page }
                                }
                                _ => ScrapeState::Done,
                            }
                        }
                        Err(e) if e.is_retryable() && parse_retries < self.policy.max_retries => {
                            parse_retries += 1;
                            let delay = self.policy.backoff(parse_retries);
                            warn!(
                                "{} page {}: {}, refetching ({}/{}) in {:?}",
                                portal.slug, page, e, parse_retries, self.policy.max_retries, delay
                            );
                            tokio::time::sleep(delay).await;
                            ScrapeState::Fetching { url, page }
                        }
                        Err(e) => ScrapeState::Failed(e),
                    }
                }
                ScrapeState::Paginating { next_url, page } => {
                    if page >= self.config.max_pages {
                        debug!("{}: stopping at max_pages ({})", portal.slug, page);
                        ScrapeState::Done
                    } else {
                        ScrapeState::Fetching {
                            url: next_url,
                            page: page + 1,
                        }
                    }
                }
                ScrapeState::Done => return Ok(records),
                ScrapeState::Failed(e) => return Err(e),
            };
        }
    }

    async fn fetch_page(&self, url: &str) -> PipelineResult<String> {
        self.fetcher.get(url).await?.into_success(url)
    }

    /// Scrape all portals on a bounded worker pool. Each portal's new records
    /// are appended to the platform's job list as soon as it completes; a
    /// failing portal is logged, recorded and skipped.
    pub async fn scrape_all(
        &self,
        platform: Platform,
        portals: &[CompanyPortal],
    ) -> PipelineResult<ScrapeOutcome> {
        self.adapter(platform)?;

        let mut report = StageReport::new("scrape");
        let (matching, other): (Vec<&CompanyPortal>, Vec<&CompanyPortal>) =
            portals.iter().partition(|p| p.platform == platform);
        report.input = portals.len();
        report.invalid = other.len();

        let (sink, prior) = DedupSink::open(&self.config.jobs_path(platform), job_key)?;
        info!(
            "Scraping {} {} portals ({} records already stored)",
            matching.len(),
            platform,
            prior.len()
        );

        let sink = &sink;
        let results = stream::iter(matching)
            .map(|portal| async move {
                match self.scrape(portal).await {
                    Ok(records) => {
                        let found = records.len();
                        let write = sink.append_new(records).await?;
                        info!(
                            "{}: {} postings, {} new",
                            portal.slug,
                            found,
                            write.written.len()
                        );
                        Ok::<_, PipelineError>((portal, Ok(write)))
                    }
                    Err(e) => {
                        warn!("Failed to scrape {} ({}): {}", portal.slug, portal.portal_url, e);
                        Ok((portal, Err(e)))
                    }
                }
            })
            .buffer_unordered(self.config.concurrency)
            .collect::<Vec<_>>()
            .await;

        let mut records = Vec::new();
        let mut failed = Vec::new();
        for result in results {
            let (portal, scraped) = result?;
            match scraped {
                Ok(write) => {
                    report.produced += write.written.len();
                    report.duplicates += write.duplicates;
                    records.extend(write.written);
                }
                Err(e) => failed.push(FailedPortal {
                    platform,
                    slug: portal.slug.clone(),
                    portal_url: portal.portal_url.clone(),
                    reason: e.to_string(),
                }),
            }
        }
        failed.sort_by(|a, b| a.slug.cmp(&b.slug));
        report.failed = failed.len();

        FsOps::write_records(&self.config.failed_portals_path(platform), &failed)?;
        info!("{}", report);

        Ok(ScrapeOutcome {
            records,
            failed,
            report,
        })
    }
}
