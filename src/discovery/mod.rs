// src/discovery/mod.rs
//! Search-engine reconnaissance: dorks, result links and company slugs

pub mod browser;
pub mod company_extractor;
pub mod link_collector;
pub mod query_generator;

pub use browser::{Browser, PageKind, SearchBrowser};
pub use company_extractor::{CompanyExtractor, ExtractOutcome};
pub use link_collector::{CollectOutcome, LinkCollector};
pub use query_generator::QueryGenerator;
