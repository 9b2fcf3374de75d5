// @file: kline_ingestion/src/core/errors.rs
// @description: Error taxonomy for page fetches and whole ingestion runs.
// @author: LAS.

use std::time::Duration;
use thiserror::Error;


//
// PAGE-LEVEL ERRORS
//

/// A single REST request failed. Always recoverable by the caller (retry or accept partial data).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("rate limited by exchange (HTTP {status})")]
    RateLimited { status: u16, retry_after: Option<Duration> },

    #[error("response decode failed: {0}")]
    Decode(String),

    #[error("unexpected kline shape: {0}")]
    Schema(String),
}

impl FetchError {
    /// Server-provided wait hint, when the exchange sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}


//
// RUN-LEVEL ERRORS
//

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("data validation failed: {0}")]
    DataValidation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("exchange symbol listing unavailable: {0}")]
    SymbolListing(#[source] FetchError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("run cancelled")]
    Cancelled,
}

impl From<config::ConfigError> for IngestionError {
    fn from(e: config::ConfigError) -> Self {
        IngestionError::Config(e.to_string())
    }
}
