// @file: kline_ingestion/src/connectors/mod.rs
// @description: Factory for the exchange REST client shared by all symbol workers.
// @author: LAS.

pub mod binance;

use crate::core::errors::IngestionError;
use crate::core::interfaces::ExchangeRestClient;
use crate::utils::config::AppConfig;
use std::sync::Arc;


//
// FACTORY FUNCTION
//

/// One client per run; workers share it (and its connection pool) through the Arc.
pub fn build_rest_client(config: &AppConfig) -> Result<Arc<dyn ExchangeRestClient>, IngestionError> {
    let client = binance::BinanceRestClient::from_config(config)?;
    Ok(Arc::new(client))
}
