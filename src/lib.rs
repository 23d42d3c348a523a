pub mod cli;
pub mod core;
pub mod discovery;
pub mod error;
pub mod merger;
pub mod pipeline;
pub mod scraping;
pub mod types;
pub mod utils;

pub use error::{PipelineError, PipelineResult};
pub use pipeline::Pipeline;
