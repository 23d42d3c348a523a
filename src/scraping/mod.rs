// src/scraping/mod.rs
pub mod adapters;
pub mod greenhouse;
pub mod lever;
pub mod portal_scraper;

pub use adapters::{AdapterRegistry, ListingAdapter, ListingPage};
pub use greenhouse::GreenhouseAdapter;
pub use lever::LeverAdapter;
pub use portal_scraper::{PortalScraper, ScrapeOutcome};
