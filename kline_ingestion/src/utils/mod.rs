// @file: kline_ingestion/src/utils/mod.rs
// @description: Configuration helpers.
// @author: LAS.

pub mod config;
