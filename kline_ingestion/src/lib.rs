// @file: kline_ingestion/src/lib.rs
// @description: Exposes the modular architecture for integration testing and external usage.
// @author: LAS.

pub mod core;
pub mod connectors;
pub mod io;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::core::errors::{FetchError, IngestionError};
pub use crate::core::interfaces::{ExchangeRestClient, PageRequest};
pub use crate::core::orchestrator::Orchestrator;
pub use crate::core::paginator::{fetch_series_for_symbol, PaginationOptions, SeriesRequest};
pub use crate::core::resolver::{resolve_symbols, Resolution};
pub use crate::core::summary::{RunSummary, SymbolReport, SymbolStatus};
pub use crate::utils::config::AppConfig;
