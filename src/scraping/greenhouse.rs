// src/scraping/greenhouse.rs
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::adapters::{ListingAdapter, ListingPage};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{CompanyPortal, JobRecord, Platform};
use crate::utils::{clean_text, with_query_param};

const NO_JOBS_NOTICE: &str = "There are no jobs that fit these filter criteria";

/// Embedded Greenhouse job board (`job_board?for=<slug>&page=N`).
#[derive(Debug, Default)]
pub struct GreenhouseAdapter;

impl GreenhouseAdapter {
    pub fn new() -> Self {
        Self
    }

    fn selector(css: &str) -> PipelineResult<Selector> {
        Selector::parse(css)
            .map_err(|e| PipelineError::config(format!("invalid selector '{}': {:?}", css, e)))
    }

    fn page_url(url: &str, page: u32) -> PipelineResult<String> {
        with_query_param(url, "page", &page.to_string())
            .ok_or_else(|| PipelineError::config(format!("invalid portal URL: {}", url)))
    }

    /// Heading of the enclosing department section, if any.
    fn department_of(row: ElementRef, heading: &Selector) -> String {
        for node in row.ancestors() {
            let Some(ancestor) = ElementRef::wrap(node) else {
                continue;
            };
            if !ancestor.value().classes().any(|c| c.contains("department")) {
                continue;
            }
            if let Some(h) = ancestor.select(heading).next() {
                let text = clean_text(&h.text().collect::<Vec<_>>().join(" "));
                if !text.is_empty() {
                    return text;
                }
            }
        }
        String::new()
    }
}

/// `gh_jid`/`token` parameter, else the trailing numeric path segment.
fn posting_id(url: &Url) -> Option<String> {
    let numeric = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());

    for key in ["gh_jid", "token"] {
        if let Some((_, value)) = url.query_pairs().find(|(k, _)| k == key) {
            if numeric(&value) {
                return Some(value.into_owned());
            }
        }
    }
    url.path_segments()?
        .rev()
        .find(|s| !s.is_empty())
        .filter(|s| numeric(*s))
        .map(str::to_string)
}

impl ListingAdapter for GreenhouseAdapter {
    fn platform(&self) -> Platform {
        Platform::Greenhouse
    }

    fn first_page_url(&self, portal: &CompanyPortal) -> PipelineResult<String> {
        Self::page_url(&portal.portal_url, 1)
    }

    fn parse_page(
        &self,
        portal: &CompanyPortal,
        url: &str,
        page: u32,
        payload: &str,
    ) -> PipelineResult<ListingPage> {
        if payload.contains(NO_JOBS_NOTICE) {
            debug!("{}: no jobs notice on page {}", portal.slug, page);
            return Ok(ListingPage::default());
        }

        let base = Url::parse(url).map_err(|e| PipelineError::parse(url, e.to_string()))?;
        let rows = Self::selector("tr.job-post")?;
        let anchor = Self::selector("a[href]")?;
        let para = Self::selector("p")?;
        let heading = Self::selector("h2, h3, h4, .section-header")?;

        let document = Html::parse_document(payload);
        let mut records = Vec::new();
        for row in document.select(&rows) {
            let Some(link) = row.select(&anchor).next() else {
                continue;
            };
            let Some(posting_url) = link.value().attr("href").and_then(|h| base.join(h).ok())
            else {
                continue;
            };
            let Some(id) = posting_id(&posting_url) else {
                debug!("No posting id in {}", posting_url);
                continue;
            };

            let lines: Vec<String> = row
                .select(&para)
                .map(|p| clean_text(&p.text().collect::<Vec<_>>().join(" ")))
                .filter(|t| !t.is_empty())
                .collect();
            let title = match lines.first() {
                Some(first) => first.clone(),
                None => clean_text(&link.text().collect::<Vec<_>>().join(" ")),
            };
            if title.is_empty() {
                continue;
            }

            records.push(JobRecord {
                platform: Platform::Greenhouse,
                company: portal.slug.clone(),
                title,
                location: lines.get(1).cloned().unwrap_or_default(),
                department: Self::department_of(row, &heading),
                url: posting_url.to_string(),
                posting_id: id,
                posted_date: None,
                description: None,
            });
        }

        let next_url = if records.is_empty() {
            None
        } else {
            Some(Self::page_url(url, page + 1)?)
        };
        Ok(ListingPage { records, next_url })
    }
}
