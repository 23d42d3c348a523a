// src/types/report.rs
use serde::Serialize;
use std::fmt;

/// Summary counts every stage emits on completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: &'static str,
    pub input: usize,
    pub produced: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub excluded: usize,
    pub failed: usize,
}

impl StageReport {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            ..Default::default()
        }
    }

    /// True when the stage had work to do and every item of it failed.
    pub fn is_total_failure(&self) -> bool {
        self.input > 0 && self.failed >= self.input
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: input={} produced={} duplicates={} invalid={} excluded={} failed={}",
            self.stage,
            self.input,
            self.produced,
            self.duplicates,
            self.invalid,
            self.excluded,
            self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_failure() {
        let mut report = StageReport::new("scrape");
        assert!(!report.is_total_failure());
        report.input = 5;
        report.failed = 1;
        assert!(!report.is_total_failure());
        report.failed = 5;
        assert!(report.is_total_failure());
    }
}
