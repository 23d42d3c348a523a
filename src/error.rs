// src/error.rs
//! Error taxonomy shared by every pipeline stage

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Missing or invalid configuration. Aborts the invoked stage.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network, timeout, bad status or anti-bot challenge.
    #[error("fetch failed for {url}: {reason}")]
    Fetch {
        url: String,
        reason: String,
        retryable: bool,
    },

    /// Payload did not have the expected shape.
    #[error("parse failed for {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn fetch(url: &str, reason: impl Into<String>, retryable: bool) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: reason.into(),
            retryable,
        }
    }

    pub fn parse(url: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the retry policy should try the operation again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch { retryable, .. } => *retryable,
            Self::Parse { .. } => true,
            Self::Config(_) | Self::Io(_) | Self::Csv(_) => false,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
