// src/core/mod.rs
//! Core services shared by every pipeline stage

pub mod config_manager;
pub mod fs_ops;
pub mod http_client;
pub mod retry;
pub mod sink;

pub use config_manager::ConfigManager;
pub use fs_ops::{CsvAppender, CsvLoad, FsOps};
pub use http_client::{FetchResponse, HttpClient, HttpFetch};
pub use retry::RetryPolicy;
pub use sink::{DedupSink, SinkWrite};
