// src/scraping/lever.rs
use chrono::DateTime;
use serde::Deserialize;

use super::adapters::{ListingAdapter, ListingPage};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{CompanyPortal, JobRecord, Platform};
use crate::utils::{clean_text, query_param, truncate_snippet, with_query_param};

pub const DEFAULT_PAGE_LIMIT: u32 = 100;
const SNIPPET_CHARS: usize = 280;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeverPosting {
    id: String,
    text: String,
    #[serde(default)]
    categories: LeverCategories,
    hosted_url: String,
    created_at: Option<i64>,
    description_plain: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LeverCategories {
    location: Option<String>,
    team: Option<String>,
    department: Option<String>,
}

impl LeverCategories {
    /// Department and team joined with " / ", skipping blanks and repeats.
    fn department(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for part in [&self.department, &self.team].into_iter().flatten() {
            let part = clean_text(part);
            if !part.is_empty() && !parts.contains(&part) {
                parts.push(part);
            }
        }
        parts.join(" / ")
    }
}

/// Lever postings API (`/v0/postings/<slug>?mode=json`), paged by `skip`/`limit`.
#[derive(Debug)]
pub struct LeverAdapter {
    limit: u32,
}

impl Default for LeverAdapter {
    fn default() -> Self {
        Self::with_limit(DEFAULT_PAGE_LIMIT)
    }
}

impl LeverAdapter {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    fn page_url(&self, url: &str, skip: u32) -> PipelineResult<String> {
        with_query_param(url, "skip", &skip.to_string())
            .and_then(|u| with_query_param(&u, "limit", &self.limit.to_string()))
            .ok_or_else(|| PipelineError::config(format!("invalid portal URL: {}", url)))
    }

    fn to_record(portal: &CompanyPortal, posting: LeverPosting) -> JobRecord {
        JobRecord {
            platform: Platform::Lever,
            company: portal.slug.clone(),
            title: clean_text(&posting.text),
            location: posting
                .categories
                .location
                .as_deref()
                .map(clean_text)
                .unwrap_or_default(),
            department: posting.categories.department(),
            url: posting.hosted_url,
            posting_id: posting.id,
            posted_date: posting
                .created_at
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.date_naive()),
            description: posting
                .description_plain
                .map(|d| truncate_snippet(&d, SNIPPET_CHARS))
                .filter(|d| !d.is_empty()),
        }
    }
}

impl ListingAdapter for LeverAdapter {
    fn platform(&self) -> Platform {
        Platform::Lever
    }

    fn first_page_url(&self, portal: &CompanyPortal) -> PipelineResult<String> {
        self.page_url(&portal.portal_url, 0)
    }

    fn parse_page(
        &self,
        portal: &CompanyPortal,
        url: &str,
        _page: u32,
        payload: &str,
    ) -> PipelineResult<ListingPage> {
        let postings: Vec<LeverPosting> = serde_json::from_str(payload)
            .map_err(|e| PipelineError::parse(url, format!("unexpected postings JSON: {}", e)))?;

        let count = postings.len() as u32;
        let skip = query_param(url, "skip")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0);

        let records = postings
            .into_iter()
            .map(|p| Self::to_record(portal, p))
            .collect();

        // A short page is the last one
        let next_url = if count < self.limit {
            None
        } else {
            Some(self.page_url(url, skip + count)?)
        };
        Ok(ListingPage { records, next_url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn portal() -> CompanyPortal {
        CompanyPortal {
            platform: Platform::Lever,
            slug: "beta".to_string(),
            portal_url: "https://api.lever.co/v0/postings/beta?mode=json".to_string(),
        }
    }

    const PAYLOAD: &str = r#"[
        {
            "id": "5ac21346-8e0c-4494-8e7a-3eb92ff77902",
            "text": "Senior  Backend Engineer",
            "categories": {"location": "Berlin", "team": "Platform", "department": "Engineering", "commitment": "Full-time"},
            "hostedUrl": "https://jobs.lever.co/beta/5ac21346-8e0c-4494-8e7a-3eb92ff77902",
            "applyUrl": "https://jobs.lever.co/beta/5ac21346-8e0c-4494-8e7a-3eb92ff77902/apply",
            "createdAt": 1709251200000,
            "descriptionPlain": "We build things."
        },
        {
            "id": "202",
            "text": "Engineer",
            "hostedUrl": "https://jobs.lever.co/beta/202"
        }
    ]"#;

    #[test]
    fn test_parse_postings() {
        let adapter = LeverAdapter::default();
        let url = adapter.first_page_url(&portal()).unwrap();
        assert_eq!(
            url,
            "https://api.lever.co/v0/postings/beta?mode=json&skip=0&limit=100"
        );

        let page = adapter.parse_page(&portal(), &url, 1, PAYLOAD).unwrap();
        assert_eq!(page.records.len(), 2);
        assert!(page.next_url.is_none());

        let first = &page.records[0];
        assert_eq!(first.title, "Senior Backend Engineer");
        assert_eq!(first.location, "Berlin");
        assert_eq!(first.department, "Engineering / Platform");
        assert_eq!(first.posted_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(first.description.as_deref(), Some("We build things."));

        let second = &page.records[1];
        assert_eq!(second.posting_id, "202");
        assert_eq!(second.location, "");
        assert_eq!(second.posted_date, None);
    }

    #[test]
    fn test_full_page_requests_next_offset() {
        let adapter = LeverAdapter::with_limit(2);
        let url = adapter.first_page_url(&portal()).unwrap();
        let page = adapter.parse_page(&portal(), &url, 1, PAYLOAD).unwrap();
        assert_eq!(
            page.next_url.as_deref(),
            Some("https://api.lever.co/v0/postings/beta?mode=json&skip=2&limit=2")
        );
    }

    #[test]
    fn test_malformed_payload_is_parse_error() {
        let adapter = LeverAdapter::default();
        let err = adapter
            .parse_page(&portal(), "https://api.lever.co/v0/postings/beta", 1, "<html>")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_long_description_is_truncated() {
        let long = "x".repeat(400);
        let payload = format!(
            r#"[{{"id":"1","text":"T","hostedUrl":"https://jobs.lever.co/beta/1","descriptionPlain":"{}"}}]"#,
            long
        );
        let page = LeverAdapter::default()
            .parse_page(&portal(), &portal().portal_url, 1, &payload)
            .unwrap();
        let snippet = page.records[0].description.as_deref().unwrap();
        assert_eq!(snippet.chars().count(), SNIPPET_CHARS);
        assert!(snippet.ends_with('…'));
    }
}
