// src/discovery/company_extractor.rs
//! Turns candidate links into one portal per company slug

use regex::Regex;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::core::{ConfigManager, FsOps};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{CandidateLink, CompanyPortal, Platform, StageReport};
use crate::utils::is_valid_slug;

/// Path words that match the slug position but never name a company.
const RESERVED_SLUGS: &[&str] = &[
    "embed", "jobs", "job_board", "job_app", "v0", "v1", "api", "boards", "careers", "search",
    "postings",
];

pub struct CompanyExtractor {
    platform: Platform,
    pattern: Regex,
    portal_template: String,
}

#[derive(Debug)]
pub struct ExtractOutcome {
    /// Sorted by slug, one entry per slug.
    pub portals: Vec<CompanyPortal>,
    pub report: StageReport,
}

impl CompanyExtractor {
    pub fn new(platform: Platform, pattern: &str, portal_template: &str) -> PipelineResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            PipelineError::config(format!("invalid extraction pattern for {}: {}", platform, e))
        })?;
        if pattern.captures_len() < 2 {
            return Err(PipelineError::config(format!(
                "extraction pattern for {} needs a capture group for the slug",
                platform
            )));
        }
        Ok(Self {
            platform,
            pattern,
            portal_template: portal_template.to_string(),
        })
    }

    pub fn from_config(config: &ConfigManager, platform: Platform) -> PipelineResult<Self> {
        Self::new(
            platform,
            config.pattern_for(platform)?,
            config.portal_template_for(platform)?,
        )
    }

    /// Company slug embedded in `url`, if the link is a portal link at all.
    pub fn slug_from_url(&self, url: &str) -> Option<String> {
        let captured = self.pattern.captures(url)?.get(1)?.as_str();
        let slug = match self.platform {
            // Lever links carry sharing parameters glued onto the slug
            Platform::Lever => captured.split(['&', '?']).next().unwrap_or_default(),
            _ => captured,
        };
        let slug = slug.trim().to_lowercase();
        if !is_valid_slug(&slug) || RESERVED_SLUGS.contains(&slug.as_str()) {
            return None;
        }
        Some(slug)
    }

    pub fn portal_url(&self, slug: &str) -> String {
        self.portal_template.replace("{company}", slug)
    }

    pub fn extract(&self, links: &[CandidateLink]) -> ExtractOutcome {
        let mut report = StageReport::new("extract");
        report.input = links.len();

        let mut slugs = BTreeSet::new();
        for link in links {
            if link.platform != self.platform {
                report.invalid += 1;
                continue;
            }
            match self.slug_from_url(&link.url) {
                Some(slug) => {
                    if !slugs.insert(slug) {
                        report.duplicates += 1;
                    }
                }
                None => {
                    debug!("No company slug in {}", link.url);
                    report.invalid += 1;
                }
            }
        }

        let portals: Vec<CompanyPortal> = slugs
            .into_iter()
            .map(|slug| CompanyPortal {
                platform: self.platform,
                portal_url: self.portal_url(&slug),
                slug,
            })
            .collect();
        report.produced = portals.len();

        ExtractOutcome { portals, report }
    }

    /// Read the platform's link list and rewrite its portal list.
    pub fn run(&self, config: &ConfigManager) -> PipelineResult<ExtractOutcome> {
        let links_path = config.links_path(self.platform);
        if !links_path.exists() {
            warn!(
                "{}: links file {} not found, run collect first",
                self.platform,
                links_path.display()
            );
        }
        let load = FsOps::read_records::<CandidateLink>(&links_path)?;

        let mut outcome = self.extract(&load.rows);
        outcome.report.input += load.malformed;
        outcome.report.invalid += load.malformed;

        if outcome.portals.is_empty() {
            warn!("{}: no matching URLs found in {}", self.platform, links_path.display());
        }
        FsOps::write_records(&config.portals_path(self.platform), &outcome.portals)?;
        info!("{}", outcome.report);
        Ok(outcome)
    }
}
