// src/scraping/adapters.rs
//! Platform registry: maps each platform to the adapter that understands its listings

use std::collections::HashMap;
use std::sync::Arc;

use super::{GreenhouseAdapter, LeverAdapter};
use crate::error::PipelineResult;
use crate::types::{CompanyPortal, JobRecord, Platform};

/// One parsed listing page.
#[derive(Debug, Default)]
pub struct ListingPage {
    pub records: Vec<JobRecord>,
    /// URL of the following page, if the payload suggests there is one.
    pub next_url: Option<String>,
}

/// Knows how to page through one platform's listing endpoint and map its
/// payload into canonical records.
pub trait ListingAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    fn first_page_url(&self, portal: &CompanyPortal) -> PipelineResult<String>;

    /// `page` is 1-based.
    fn parse_page(
        &self,
        portal: &CompanyPortal,
        url: &str,
        page: u32,
        payload: &str,
    ) -> PipelineResult<ListingPage>;
}

#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Platform, Arc<dyn ListingAdapter>>,
}

impl AdapterRegistry {
    /// Greenhouse and Lever. Ashby is discovered but has no adapter.
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register(Arc::new(GreenhouseAdapter::new()));
        registry.register(Arc::new(LeverAdapter::default()));
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn ListingAdapter>) {
        self.adapters.insert(adapter.platform(), adapter);
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn ListingAdapter>> {
        self.adapters.get(&platform).cloned()
    }

    pub fn supports(&self, platform: Platform) -> bool {
        self.adapters.contains_key(&platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = AdapterRegistry::with_defaults();
        assert!(registry.supports(Platform::Greenhouse));
        assert_eq!(
            registry.get(Platform::Lever).map(|a| a.platform()),
            Some(Platform::Lever)
        );
        assert!(registry.get(Platform::Ashby).is_none());
    }
}
