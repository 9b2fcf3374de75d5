// @file: kline_ingestion/src/connectors/binance/mod.rs
// @description: Binance connector.
// @author: LAS.

pub mod binance_rest;

pub use binance_rest::BinanceRestClient;
