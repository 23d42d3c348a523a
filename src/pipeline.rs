// src/pipeline.rs
//! Wires the stages together. Each stage reads the previous stage's
//! artifact from disk, so any of them can be run on its own.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::core::{ConfigManager, FsOps, HttpClient, HttpFetch};
use crate::discovery::{Browser, CompanyExtractor, LinkCollector, QueryGenerator, SearchBrowser};
use crate::error::PipelineResult;
use crate::merger::RecordMerger;
use crate::scraping::{AdapterRegistry, PortalScraper};
use crate::types::{CompanyPortal, Platform, StageReport};

pub struct Pipeline {
    config: ConfigManager,
    browser: Box<dyn Browser>,
    fetcher: Box<dyn HttpFetch>,
    registry: AdapterRegistry,
}

impl Pipeline {
    pub fn new(
        config: ConfigManager,
        browser: Box<dyn Browser>,
        fetcher: Box<dyn HttpFetch>,
        registry: AdapterRegistry,
    ) -> Self {
        Self {
            config,
            browser,
            fetcher,
            registry,
        }
    }

    /// Production wiring: search over HTTP, reqwest fetcher, default adapters.
    pub fn from_config(config: ConfigManager) -> PipelineResult<Self> {
        let browser = SearchBrowser::from_config(&config)?;
        let fetcher = HttpClient::from_config(&config)?;
        Ok(Self::new(
            config,
            Box::new(browser),
            Box::new(fetcher),
            AdapterRegistry::with_defaults(),
        ))
    }

    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    pub fn queries(&self, platform: Platform) -> PipelineResult<Vec<String>> {
        QueryGenerator::new(&self.config).queries(platform)
    }

    pub async fn collect(&self, platform: Platform) -> Result<StageReport> {
        self.config.ensure_directories(platform).await?;
        let queries = self.queries(platform)?;
        let outcome = LinkCollector::new(&self.config, self.browser.as_ref())
            .collect(platform, &queries)
            .await
            .with_context(|| format!("link collection for {} failed", platform))?;
        Ok(outcome.report)
    }

    pub async fn extract(&self, platform: Platform) -> Result<StageReport> {
        self.config.ensure_directories(platform).await?;
        let outcome = CompanyExtractor::from_config(&self.config, platform)?
            .run(&self.config)
            .with_context(|| format!("company extraction for {} failed", platform))?;
        Ok(outcome.report)
    }

    pub async fn scrape(&self, platform: Platform) -> Result<StageReport> {
        self.config.ensure_directories(platform).await?;
        let scraper = PortalScraper::new(&self.config, self.fetcher.as_ref(), &self.registry);

        let portals_path = self.config.portals_path(platform);
        if !portals_path.exists() {
            warn!(
                "{}: portal list {} not found, run extract first",
                platform,
                portals_path.display()
            );
        }
        let load = FsOps::read_records::<CompanyPortal>(&portals_path)?;

        let mut outcome = scraper
            .scrape_all(platform, &load.rows)
            .await
            .with_context(|| format!("portal scraping for {} failed", platform))?;
        outcome.report.input += load.malformed;
        outcome.report.invalid += load.malformed;
        Ok(outcome.report)
    }

    pub fn merge(&self) -> Result<StageReport> {
        let outcome = RecordMerger::new(&self.config)
            .merge()
            .context("merging job records failed")?;
        Ok(outcome.report)
    }

    /// Every stage for one platform, then a merge across all platforms.
    /// Scraping is skipped for platforms without a listing adapter.
    pub async fn run(&self, platform: Platform) -> Result<Vec<StageReport>> {
        let mut reports = vec![self.collect(platform).await?, self.extract(platform).await?];

        if self.registry.supports(platform) {
            reports.push(self.scrape(platform).await?);
        } else {
            info!("{}: no listing adapter, skipping scrape", platform);
        }

        reports.push(self.merge()?);
        for report in &reports {
            info!("{}", report);
        }
        Ok(reports)
    }
}
