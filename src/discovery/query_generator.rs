// src/discovery/query_generator.rs
use std::collections::HashSet;

use crate::core::ConfigManager;
use crate::error::PipelineResult;
use crate::types::Platform;
use crate::utils::clean_text;

const KEYWORD_PLACEHOLDER: &str = "{keyword}";

/// Builds search-engine dorks from the configured per-platform templates.
pub struct QueryGenerator<'a> {
    config: &'a ConfigManager,
}

impl<'a> QueryGenerator<'a> {
    pub fn new(config: &'a ConfigManager) -> Self {
        Self { config }
    }

    /// Ordered, duplicate-free queries for `platform`. Each template is
    /// expanded once per configured keyword, or stripped of its
    /// placeholder when no keywords are configured.
    pub fn queries(&self, platform: Platform) -> PipelineResult<Vec<String>> {
        let templates = self.config.dorks_for(platform)?;
        let keywords: Vec<String> = self
            .config
            .keywords
            .iter()
            .map(|k| quote_keyword(k))
            .filter(|k| !k.is_empty())
            .collect();

        let mut seen = HashSet::new();
        let mut queries = Vec::new();
        for template in templates {
            let expanded = if template.contains(KEYWORD_PLACEHOLDER) && !keywords.is_empty() {
                keywords
                    .iter()
                    .map(|k| clean_text(&template.replace(KEYWORD_PLACEHOLDER, k)))
                    .collect()
            } else {
                vec![clean_text(&template.replace(KEYWORD_PLACEHOLDER, ""))]
            };

            for query in expanded {
                if !query.is_empty() && seen.insert(query.clone()) {
                    queries.push(query);
                }
            }
        }
        Ok(queries)
    }
}

/// Multi-word keywords become phrase searches.
fn quote_keyword(keyword: &str) -> String {
    let keyword = clean_text(keyword);
    if keyword.contains(' ') && !keyword.starts_with('"') {
        format!("\"{}\"", keyword)
    } else {
        keyword
    }
}
