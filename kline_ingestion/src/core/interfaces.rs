// @file: kline_ingestion/src/core/interfaces.rs
// @description: Defines the exchange REST seam used by the paginator and orchestrator.
// @author: LAS.

use crate::core::errors::FetchError;
use crate::core::models::{Candle, KlineInterval, SymbolMetadata};
use async_trait::async_trait;


//
// REQUEST TYPES
//

/// One page of klines: `start_time` inclusive, `end_time` exclusive, at most `limit` rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub symbol: String,
    pub interval: KlineInterval,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub limit: usize,
}


//
// TRAIT DEFINITIONS
//

#[async_trait]
pub trait ExchangeRestClient: Send + Sync {
    fn name(&self) -> &str;

    // #1. Symbol metadata
    // Only symbols with TRADING status quoted in `quote_asset`.
    async fn list_tradable_symbols(&self, quote_asset: &str) -> Result<Vec<SymbolMetadata>, FetchError>;

    // #2. Single kline page
    // No retries here: the paginator owns retry so the cursor stays consistent.
    // An empty Ok page means "no data", never "request failed".
    async fn fetch_candle_page(&self, request: &PageRequest) -> Result<Vec<Candle>, FetchError>;
}
