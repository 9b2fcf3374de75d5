// @file: kline_ingestion/src/core/mod.rs
// @description: Exports domain logic and data structures.
// @author: LAS.

pub mod errors;
pub mod interfaces;
pub mod models;
pub mod orchestrator;
pub mod paginator;
pub mod rate_limiter;
pub mod resolver;
pub mod retry;
pub mod summary;
