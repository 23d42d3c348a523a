// src/types/records.rs
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// Recruiting platforms known to the pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Greenhouse,
    Lever,
    Ashby,
}

impl Platform {
    /// Declaration order doubles as the stable merge order.
    pub const ALL: [Platform; 3] = [Platform::Greenhouse, Platform::Lever, Platform::Ashby];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Greenhouse => "greenhouse",
            Platform::Lever => "lever",
            Platform::Ashby => "ashby",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "greenhouse" | "gh" => Ok(Platform::Greenhouse),
            "lever" => Ok(Platform::Lever),
            "ashby" | "ashbyhq" => Ok(Platform::Ashby),
            other => Err(PipelineError::config(format!("unknown platform: {}", other))),
        }
    }
}

/// Row types persisted as CSV artifacts. `COLUMNS` matches the serde field names,
/// so a file with no rows still carries its header.
pub trait CsvRecord {
    const COLUMNS: &'static [&'static str];
}

/// A search hit that looks like a portal URL, keyed by its normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateLink {
    pub platform: Platform,
    pub url: String,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompanyPortal {
    pub platform: Platform,
    pub slug: String,
    pub portal_url: String,
}

/// Canonical job posting. `(platform, posting_id)` is the natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub platform: Platform,
    pub company: String,
    pub title: String,
    pub location: String,
    pub department: String,
    pub url: String,
    pub posting_id: String,
    pub posted_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl JobRecord {
    pub fn key(&self) -> (Platform, String) {
        (self.platform, self.posting_id.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedQuery {
    pub platform: Platform,
    pub query: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedPortal {
    pub platform: Platform,
    pub slug: String,
    pub portal_url: String,
    pub reason: String,
}

impl CsvRecord for CandidateLink {
    const COLUMNS: &'static [&'static str] = &["platform", "url", "query"];
}

impl CsvRecord for CompanyPortal {
    const COLUMNS: &'static [&'static str] = &["platform", "slug", "portal_url"];
}

impl CsvRecord for JobRecord {
    const COLUMNS: &'static [&'static str] = &[
        "platform",
        "company",
        "title",
        "location",
        "department",
        "url",
        "posting_id",
        "posted_date",
        "description",
    ];
}

impl CsvRecord for FailedQuery {
    const COLUMNS: &'static [&'static str] = &["platform", "query", "reason"];
}

impl CsvRecord for FailedPortal {
    const COLUMNS: &'static [&'static str] = &["platform", "slug", "portal_url", "reason"];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parsing() {
        assert_eq!("Greenhouse".parse::<Platform>().unwrap(), Platform::Greenhouse);
        assert_eq!(" lever ".parse::<Platform>().unwrap(), Platform::Lever);
        assert_eq!("ashbyhq".parse::<Platform>().unwrap(), Platform::Ashby);
        assert!("workday".parse::<Platform>().unwrap_err().is_config());
    }

    #[test]
    fn test_platform_order_is_declaration_order() {
        let mut shuffled = vec![Platform::Ashby, Platform::Greenhouse, Platform::Lever];
        shuffled.sort();
        assert_eq!(shuffled, Platform::ALL.to_vec());
    }

    #[test]
    fn test_job_record_csv_shape() {
        let record = JobRecord {
            platform: Platform::Lever,
            company: "beta".into(),
            title: "Engineer, Platform".into(),
            location: "Remote".into(),
            department: String::new(),
            url: "https://jobs.lever.co/beta/202".into(),
            posting_id: "202".into(),
            posted_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            description: None,
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(&record).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "platform,company,title,location,department,url,posting_id,posted_date,description"
        );
        assert_eq!(
            lines.next().unwrap(),
            "lever,beta,\"Engineer, Platform\",Remote,,https://jobs.lever.co/beta/202,202,2024-03-01,"
        );

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let back: JobRecord = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(back, record);
    }

    fn serialized_header<T: Serialize>(row: &T) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(row).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        text.lines().next().unwrap().to_string()
    }

    #[test]
    fn test_columns_match_serialized_header() {
        let link = CandidateLink {
            platform: Platform::Lever,
            url: "https://jobs.lever.co/beta".into(),
            query: "q".into(),
        };
        let portal = CompanyPortal {
            platform: Platform::Lever,
            slug: "beta".into(),
            portal_url: "https://api.lever.co/v0/postings/beta?mode=json".into(),
        };
        let query = FailedQuery {
            platform: Platform::Lever,
            query: "q".into(),
            reason: "r".into(),
        };
        let failed = FailedPortal {
            platform: Platform::Lever,
            slug: "beta".into(),
            portal_url: "u".into(),
            reason: "r".into(),
        };
        let job = JobRecord {
            platform: Platform::Lever,
            company: "beta".into(),
            title: "T".into(),
            location: String::new(),
            department: String::new(),
            url: "u".into(),
            posting_id: "1".into(),
            posted_date: None,
            description: None,
        };

        assert_eq!(serialized_header(&link), CandidateLink::COLUMNS.join(","));
        assert_eq!(serialized_header(&portal), CompanyPortal::COLUMNS.join(","));
        assert_eq!(serialized_header(&query), FailedQuery::COLUMNS.join(","));
        assert_eq!(serialized_header(&failed), FailedPortal::COLUMNS.join(","));
        assert_eq!(serialized_header(&job), JobRecord::COLUMNS.join(","));
    }
}
