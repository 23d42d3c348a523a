// src/core/config_manager.rs
//! Unified configuration - one struct threaded through every stage

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::core::retry::RetryPolicy;
use crate::core::FsOps;
use crate::error::{PipelineError, PipelineResult};
use crate::types::Platform;

pub const DEFAULT_CONFIG_FILE: &str = "scrape_config.toml";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigManager {
    pub max_pages: u32,
    pub retry_count: u32,
    pub request_delay_ms: u64,
    pub backoff_base_ms: u64,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Substituted into `{keyword}` placeholders of the dorks.
    pub keywords: Vec<String>,
    pub dorks: BTreeMap<Platform, Vec<String>>,
    pub patterns: BTreeMap<Platform, String>,
    pub portal_templates: BTreeMap<Platform, String>,
    pub link_hosts: BTreeMap<Platform, Vec<String>>,
    pub output_dirs: OutputDirs,
    pub filters: TitleFilters,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputDirs {
    pub links: PathBuf,
    pub portals: PathBuf,
    pub jobs: PathBuf,
    pub merged: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TitleFilters {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Search page URL with `{query}` and `{offset}` placeholders.
    pub url_template: String,
    pub results_per_page: u32,
    /// Markup that only appears on a genuine result page.
    pub result_marker: Option<String>,
    pub no_results_markers: Vec<String>,
    pub challenge_markers: Vec<String>,
}

impl Default for OutputDirs {
    fn default() -> Self {
        Self {
            links: PathBuf::from("output/links"),
            portals: PathBuf::from("output/portals"),
            jobs: PathBuf::from("output/jobs"),
            merged: PathBuf::from("output/jobs.csv"),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url_template: "https://html.duckduckgo.com/html/?q={query}&s={offset}".to_string(),
            results_per_page: 30,
            result_marker: Some("result__a".to_string()),
            no_results_markers: vec![
                "No results.".to_string(),
                "did not match any documents".to_string(),
            ],
            challenge_markers: vec![
                "Our systems have detected unusual traffic".to_string(),
                "g-recaptcha".to_string(),
                "anomaly-modal".to_string(),
                "captcha".to_string(),
            ],
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ConfigManager {
    fn default() -> Self {
        let dorks = BTreeMap::from([
            (
                Platform::Greenhouse,
                strings(&[
                    "site:boards.greenhouse.io intitle:\"jobs\" {keyword}",
                    "site:job-boards.greenhouse.io {keyword}",
                ]),
            ),
            (Platform::Lever, strings(&["site:jobs.lever.co {keyword}"])),
            (Platform::Ashby, strings(&["site:jobs.ashbyhq.com {keyword}"])),
        ]);

        let patterns = BTreeMap::from([
            (
                Platform::Greenhouse,
                r"^https?://(?:boards|job-boards)\.greenhouse\.io/(?:embed/job_(?:board|app)\?for=)?([^/?&#]+)"
                    .to_string(),
            ),
            (
                Platform::Lever,
                r"^https?://jobs\.lever\.co/([^/#]+)".to_string(),
            ),
            (
                Platform::Ashby,
                r"^https?://jobs\.ashbyhq\.com/([^/?#]+)".to_string(),
            ),
        ]);

        let portal_templates = BTreeMap::from([
            (
                Platform::Greenhouse,
                "https://job-boards.greenhouse.io/embed/job_board?for={company}".to_string(),
            ),
            (
                Platform::Lever,
                "https://api.lever.co/v0/postings/{company}?mode=json".to_string(),
            ),
            (
                Platform::Ashby,
                "https://jobs.ashbyhq.com/{company}".to_string(),
            ),
        ]);

        let link_hosts = BTreeMap::from([
            (Platform::Greenhouse, strings(&["*.greenhouse.io"])),
            (Platform::Lever, strings(&["jobs.lever.co"])),
            (Platform::Ashby, strings(&["jobs.ashbyhq.com"])),
        ]);

        Self {
            max_pages: 10,
            retry_count: 3,
            request_delay_ms: 2000,
            backoff_base_ms: 1000,
            concurrency: 4,
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            keywords: Vec::new(),
            dorks,
            patterns,
            portal_templates,
            link_hosts,
            output_dirs: OutputDirs::default(),
            filters: TitleFilters::default(),
            search: SearchConfig::default(),
        }
    }
}

impl ConfigManager {
    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> PipelineResult<Self> {
        info!("Loading configuration from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::config(format!("cannot read {}: {}", path.display(), e))
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> PipelineResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| PipelineError::config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.concurrency == 0 {
            return Err(PipelineError::config("concurrency must be at least 1"));
        }
        if self.max_pages == 0 {
            return Err(PipelineError::config("max_pages must be at least 1"));
        }
        if self.search.results_per_page == 0 {
            return Err(PipelineError::config(
                "search.results_per_page must be at least 1",
            ));
        }
        if !self.search.url_template.contains("{query}") {
            return Err(PipelineError::config(
                "search.url_template must contain {query}",
            ));
        }
        for (platform, template) in &self.portal_templates {
            if !template.contains("{company}") {
                return Err(PipelineError::config(format!(
                    "portal template for {} must contain {{company}}",
                    platform
                )));
            }
        }
        Ok(())
    }

    pub fn dorks_for(&self, platform: Platform) -> PipelineResult<&[String]> {
        self.dorks
            .get(&platform)
            .filter(|d| !d.is_empty())
            .map(Vec::as_slice)
            .ok_or_else(|| PipelineError::config(format!("no dorks configured for {}", platform)))
    }

    pub fn pattern_for(&self, platform: Platform) -> PipelineResult<&str> {
        self.patterns
            .get(&platform)
            .map(String::as_str)
            .ok_or_else(|| {
                PipelineError::config(format!("no extraction pattern configured for {}", platform))
            })
    }

    pub fn portal_template_for(&self, platform: Platform) -> PipelineResult<&str> {
        self.portal_templates
            .get(&platform)
            .map(String::as_str)
            .ok_or_else(|| {
                PipelineError::config(format!("no portal URL template configured for {}", platform))
            })
    }

    pub fn link_hosts_for(&self, platform: Platform) -> PipelineResult<&[String]> {
        self.link_hosts
            .get(&platform)
            .filter(|h| !h.is_empty())
            .map(Vec::as_slice)
            .ok_or_else(|| {
                PipelineError::config(format!("no link host patterns configured for {}", platform))
            })
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_count, Duration::from_millis(self.backoff_base_ms))
    }

    pub fn links_path(&self, platform: Platform) -> PathBuf {
        self.output_dirs.links.join(platform.as_str()).join("links.csv")
    }

    pub fn failed_queries_path(&self, platform: Platform) -> PathBuf {
        self.output_dirs
            .links
            .join(platform.as_str())
            .join("failed_queries.csv")
    }

    pub fn portals_path(&self, platform: Platform) -> PathBuf {
        self.output_dirs
            .portals
            .join(platform.as_str())
            .join("portals.csv")
    }

    pub fn jobs_path(&self, platform: Platform) -> PathBuf {
        self.output_dirs.jobs.join(platform.as_str()).join("jobs.csv")
    }

    pub fn failed_portals_path(&self, platform: Platform) -> PathBuf {
        self.output_dirs
            .jobs
            .join(platform.as_str())
            .join("failed_portals.csv")
    }

    pub fn merged_path(&self) -> &Path {
        &self.output_dirs.merged
    }

    /// Point every output location under one root directory
    pub fn with_output_root(mut self, root: &Path) -> Self {
        self.output_dirs = OutputDirs {
            links: root.join("links"),
            portals: root.join("portals"),
            jobs: root.join("jobs"),
            merged: root.join("jobs.csv"),
        };
        self
    }

    /// Ensure all per-platform output directories exist
    pub async fn ensure_directories(&self, platform: Platform) -> anyhow::Result<()> {
        for dir in [
            &self.output_dirs.links,
            &self.output_dirs.portals,
            &self.output_dirs.jobs,
        ] {
            FsOps::ensure_dir_exists(&dir.join(platform.as_str())).await?;
        }
        if let Some(parent) = self.output_dirs.merged.parent() {
            if !parent.as_os_str().is_empty() {
                FsOps::ensure_dir_exists(parent).await?;
            }
        }
        Ok(())
    }
}
