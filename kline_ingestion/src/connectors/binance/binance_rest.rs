// @file: kline_ingestion/src/connectors/binance/binance_rest.rs
// @description: HTTP client for Binance symbol metadata and historical kline pages.
// @author: LAS.

use crate::core::errors::{FetchError, IngestionError};
use crate::core::interfaces::{ExchangeRestClient, PageRequest};
use crate::core::models::{Candle, SymbolMetadata, TradingStatus};
use crate::utils::config::AppConfig;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;


//
// CONSTANTS
//

/// Fields read from each kline row: openTime .. takerBuyQuoteVolume.
const KLINE_MIN_FIELDS: usize = 11;
const ERROR_BODY_PREVIEW: usize = 256;


//
// BINANCE WIRE MODELS
//

#[derive(Deserialize)]
struct ExchangeInfoResponse {
    #[serde(default)]
    symbols: Vec<BinanceSymbolInfo>,
}

#[derive(Deserialize)]
struct BinanceSymbolInfo {
    symbol: String,
    status: String,
    #[serde(rename = "quoteAsset")]
    quote_asset: String,
}


//
// CLIENT
//

pub struct BinanceRestClient {
    http: Client,
    base_url: String,
    time_zone: String,
}

impl BinanceRestClient {
    pub fn new(base_url: &str, time_zone: &str, timeout: Duration) -> Result<Self, IngestionError> {
        // #1. Validate the base once so endpoint construction cannot fail later
        Url::parse(base_url)
            .map_err(|e| IngestionError::Config(format!("invalid binance_rest_url '{}': {}", base_url, e)))?;

        let http: Client = Client::builder()
            .user_agent(concat!("kline_ingestion/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| IngestionError::Config(format!("HTTP client build failed: {}", e)))?;

        Ok(BinanceRestClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            time_zone: time_zone.to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, IngestionError> {
        Self::new(
            &config.binance_rest_url,
            &config.time_zone,
            Duration::from_secs(config.request_timeout_secs.max(1)),
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        Url::parse(&format!("{}/{}", self.base_url, path))
            .map_err(|e| FetchError::Transport(format!("bad endpoint {}: {}", path, e)))
    }

    /// Builds `/klines?symbol=..&interval=..&limit=..[&startTime][&endTime][&timeZone]`.
    pub fn klines_url(&self, request: &PageRequest) -> Result<Url, FetchError> {
        let mut url: Url = self.endpoint("klines")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("symbol", &request.symbol.to_uppercase());
            query.append_pair("interval", request.interval.as_str());
            query.append_pair("limit", &request.limit.to_string());
            if let Some(start) = request.start_time {
                query.append_pair("startTime", &start.to_string());
            }
            // Binance treats endTime as inclusive on openTime
            if let Some(end) = request.end_time {
                query.append_pair("endTime", &(end - 1).to_string());
            }
            if !self.time_zone.is_empty() {
                query.append_pair("timeZone", &self.time_zone);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl ExchangeRestClient for BinanceRestClient {
    fn name(&self) -> &str {
        "binance"
    }

    async fn list_tradable_symbols(&self, quote_asset: &str) -> Result<Vec<SymbolMetadata>, FetchError> {
        let url: Url = self.endpoint("exchangeInfo")?;
        debug!("GET {}", url);

        let response: Response = check_status(self.http.get(url).send().await?).await?;
        let json: Value = response.json().await?;

        parse_exchange_info(json, quote_asset)
    }

    async fn fetch_candle_page(&self, request: &PageRequest) -> Result<Vec<Candle>, FetchError> {
        let url: Url = self.klines_url(request)?;
        debug!("GET {}", url);

        let response: Response = check_status(self.http.get(url).send().await?).await?;
        let json: Value = response.json().await?;

        parse_kline_page(&json)
    }
}


//
// INTERNAL HELPERS
//

async fn check_status(response: Response) -> Result<Response, FetchError> {
    let status: StatusCode = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // 429 = request weight exceeded, 418 = IP banned after ignoring 429s
    if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
        let retry_after: Option<Duration> = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(FetchError::RateLimited {
            status: status.as_u16(),
            retry_after,
        });
    }

    let body: String = response.text().await.unwrap_or_default();
    Err(FetchError::Status {
        status: status.as_u16(),
        body: body.chars().take(ERROR_BODY_PREVIEW).collect(),
    })
}

pub(crate) fn parse_exchange_info(json: Value, quote_asset: &str) -> Result<Vec<SymbolMetadata>, FetchError> {
    let info: ExchangeInfoResponse = serde_json::from_value(json)
        .map_err(|e| FetchError::Decode(format!("exchangeInfo: {}", e)))?;

    let mut symbols: Vec<SymbolMetadata> = info
        .symbols
        .into_iter()
        .map(|s| SymbolMetadata {
            trading_status: TradingStatus::from(s.status.as_str()),
            symbol: s.symbol,
            quote_asset: s.quote_asset,
        })
        .filter(|m| m.is_tradable_in(quote_asset))
        .collect();

    symbols.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(symbols)
}

/// Binance returns an array of positional arrays:
/// [openTime, open, high, low, close, volume, closeTime, quoteVolume, trades,
///  takerBuyBase, takerBuyQuote, ignore]
pub(crate) fn parse_kline_page(json: &Value) -> Result<Vec<Candle>, FetchError> {
    let rows = json
        .as_array()
        .ok_or_else(|| FetchError::Schema("expected a JSON array of klines".to_string()))?;

    rows.iter()
        .enumerate()
        .map(|(idx, row)| parse_kline_row(idx, row))
        .collect()
}

fn parse_kline_row(idx: usize, row: &Value) -> Result<Candle, FetchError> {
    // #1. Shape
    let arr = row
        .as_array()
        .ok_or_else(|| FetchError::Schema(format!("row {} is not an array", idx)))?;

    if arr.len() < KLINE_MIN_FIELDS {
        return Err(FetchError::Schema(format!(
            "row {} has {} fields, expected at least {}",
            idx,
            arr.len(),
            KLINE_MIN_FIELDS
        )));
    }

    // #2. Fields (numbers may arrive as JSON numbers or numeric strings)
    let int_at = |pos: usize| -> Result<i64, FetchError> {
        let v: &Value = &arr[pos];
        v.as_i64()
            .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
            .ok_or_else(|| FetchError::Schema(format!("row {} field {} is not an integer: {}", idx, pos, v)))
    };
    let float_at = |pos: usize| -> Result<f64, FetchError> {
        let v: &Value = &arr[pos];
        v.as_str()
            .and_then(|s| s.parse().ok())
            .or_else(|| v.as_f64())
            .ok_or_else(|| FetchError::Schema(format!("row {} field {} is not a number: {}", idx, pos, v)))
    };

    let candle: Candle = Candle {
        open_time: int_at(0)?,
        open: float_at(1)?,
        high: float_at(2)?,
        low: float_at(3)?,
        close: float_at(4)?,
        volume: float_at(5)?,
        close_time: int_at(6)?,
        quote_volume: float_at(7)?,
        trade_count: int_at(8)?,
        taker_buy_base_volume: float_at(9)?,
        taker_buy_quote_volume: float_at(10)?,
    };

    // #3. Invariant
    if candle.open_time >= candle.close_time {
        return Err(FetchError::Schema(format!(
            "row {} has openTime {} not before closeTime {}",
            idx, candle.open_time, candle.close_time
        )));
    }

    Ok(candle)
}
