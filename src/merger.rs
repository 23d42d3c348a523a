// src/merger.rs
//! Combines per-platform job lists into one filtered, deduplicated dataset

use std::collections::HashSet;
use tracing::{info, warn};

use crate::core::config_manager::TitleFilters;
use crate::core::{ConfigManager, FsOps};
use crate::error::PipelineResult;
use crate::types::{JobRecord, Platform, StageReport};

/// Case-insensitive substring filter on job titles. Exclude terms win; an
/// empty include list lets every non-excluded title through.
#[derive(Debug, Clone, Default)]
pub struct TitleFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl TitleFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        let terms = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect()
        };
        Self {
            include: terms(include),
            exclude: terms(exclude),
        }
    }

    pub fn from_config(filters: &TitleFilters) -> Self {
        Self::new(&filters.include, &filters.exclude)
    }

    pub fn accepts(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        if self.exclude.iter().any(|t| title.contains(t.as_str())) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|t| title.contains(t.as_str()))
    }
}

#[derive(Debug)]
pub struct MergeOutcome {
    pub records: Vec<JobRecord>,
    pub report: StageReport,
}

pub struct RecordMerger<'a> {
    config: &'a ConfigManager,
    filter: TitleFilter,
}

impl<'a> RecordMerger<'a> {
    pub fn new(config: &'a ConfigManager) -> Self {
        Self {
            config,
            filter: TitleFilter::from_config(&config.filters),
        }
    }

    /// Dedup by (platform, posting id) keeping the first seen, then filter.
    /// Input order is preserved.
    pub fn merge_records<I>(&self, batches: I) -> MergeOutcome
    where
        I: IntoIterator<Item = Vec<JobRecord>>,
    {
        let mut report = StageReport::new("merge");
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for record in batches.into_iter().flatten() {
            report.input += 1;
            if !seen.insert(record.key()) {
                report.duplicates += 1;
                continue;
            }
            if !self.filter.accepts(&record.title) {
                report.excluded += 1;
                continue;
            }
            records.push(record);
        }
        report.produced = records.len();
        MergeOutcome { records, report }
    }

    /// Read every platform's job list in platform order and rewrite the
    /// merged dataset.
    pub fn merge(&self) -> PipelineResult<MergeOutcome> {
        let mut batches = Vec::new();
        let mut malformed = 0;
        for platform in Platform::ALL {
            let path = self.config.jobs_path(platform);
            if !path.exists() {
                warn!("{}: no job list at {}, skipping", platform, path.display());
                continue;
            }
            let load = FsOps::read_records::<JobRecord>(&path)?;
            malformed += load.malformed;
            info!("{}: {} records from {}", platform, load.rows.len(), path.display());
            batches.push(load.rows);
        }

        let mut outcome = self.merge_records(batches);
        outcome.report.input += malformed;
        outcome.report.invalid = malformed;

        FsOps::write_records(self.config.merged_path(), &outcome.records)?;
        info!("{}", outcome.report);
        Ok(outcome)
    }
}
