// @file: kline_ingestion/src/core/models.rs
// @description: Centralized data structures for symbol metadata, candles, series and output records.
// @author: LAS.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;


//
// KLINE INTERVALS
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum KlineInterval {
    #[serde(rename = "1s")] OneSecond,
    #[serde(rename = "1m")] OneMinute,
    #[serde(rename = "3m")] ThreeMinutes,
    #[serde(rename = "5m")] FiveMinutes,
    #[serde(rename = "15m")] FifteenMinutes,
    #[serde(rename = "30m")] ThirtyMinutes,
    #[serde(rename = "1h")] OneHour,
    #[serde(rename = "2h")] TwoHours,
    #[serde(rename = "4h")] FourHours,
    #[serde(rename = "6h")] SixHours,
    #[serde(rename = "8h")] EightHours,
    #[serde(rename = "12h")] TwelveHours,
    #[serde(rename = "1d")] OneDay,
    #[serde(rename = "3d")] ThreeDays,
    #[serde(rename = "1w")] OneWeek,
    #[serde(rename = "1M")] OneMonth,
}

const MS_IN_S: i64 = 1_000;
const MS_IN_MIN: i64 = 60 * MS_IN_S;
const MS_IN_H: i64 = 60 * MS_IN_MIN;
const MS_IN_D: i64 = 24 * MS_IN_H;

impl KlineInterval {
    pub const ALL: [KlineInterval; 16] = [
        KlineInterval::OneSecond,
        KlineInterval::OneMinute,
        KlineInterval::ThreeMinutes,
        KlineInterval::FiveMinutes,
        KlineInterval::FifteenMinutes,
        KlineInterval::ThirtyMinutes,
        KlineInterval::OneHour,
        KlineInterval::TwoHours,
        KlineInterval::FourHours,
        KlineInterval::SixHours,
        KlineInterval::EightHours,
        KlineInterval::TwelveHours,
        KlineInterval::OneDay,
        KlineInterval::ThreeDays,
        KlineInterval::OneWeek,
        KlineInterval::OneMonth,
    ];

    /// Wire representation used in the `interval` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            KlineInterval::OneSecond => "1s",
            KlineInterval::OneMinute => "1m",
            KlineInterval::ThreeMinutes => "3m",
            KlineInterval::FiveMinutes => "5m",
            KlineInterval::FifteenMinutes => "15m",
            KlineInterval::ThirtyMinutes => "30m",
            KlineInterval::OneHour => "1h",
            KlineInterval::TwoHours => "2h",
            KlineInterval::FourHours => "4h",
            KlineInterval::SixHours => "6h",
            KlineInterval::EightHours => "8h",
            KlineInterval::TwelveHours => "12h",
            KlineInterval::OneDay => "1d",
            KlineInterval::ThreeDays => "3d",
            KlineInterval::OneWeek => "1w",
            KlineInterval::OneMonth => "1M",
        }
    }

    /// Nominal bucket width. Months are counted as 30 days; only used for gap accounting.
    pub fn duration_ms(&self) -> i64 {
        match self {
            KlineInterval::OneSecond => MS_IN_S,
            KlineInterval::OneMinute => MS_IN_MIN,
            KlineInterval::ThreeMinutes => 3 * MS_IN_MIN,
            KlineInterval::FiveMinutes => 5 * MS_IN_MIN,
            KlineInterval::FifteenMinutes => 15 * MS_IN_MIN,
            KlineInterval::ThirtyMinutes => 30 * MS_IN_MIN,
            KlineInterval::OneHour => MS_IN_H,
            KlineInterval::TwoHours => 2 * MS_IN_H,
            KlineInterval::FourHours => 4 * MS_IN_H,
            KlineInterval::SixHours => 6 * MS_IN_H,
            KlineInterval::EightHours => 8 * MS_IN_H,
            KlineInterval::TwelveHours => 12 * MS_IN_H,
            KlineInterval::OneDay => MS_IN_D,
            KlineInterval::ThreeDays => 3 * MS_IN_D,
            KlineInterval::OneWeek => 7 * MS_IN_D,
            KlineInterval::OneMonth => 30 * MS_IN_D,
        }
    }
}

impl FromStr for KlineInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: &str = s.trim();
        KlineInterval::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == wanted)
            .ok_or_else(|| format!("Unsupported kline interval: '{}'", s))
    }
}

impl fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


//
// SYMBOL METADATA
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradingStatus {
    Trading,
    Other(String),
}

impl From<&str> for TradingStatus {
    fn from(raw: &str) -> Self {
        if raw == "TRADING" {
            TradingStatus::Trading
        } else {
            TradingStatus::Other(raw.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMetadata {
    pub symbol: String,
    pub quote_asset: String,
    pub trading_status: TradingStatus,
}

impl SymbolMetadata {
    pub fn is_tradable_in(&self, quote_asset: &str) -> bool {
        self.trading_status == TradingStatus::Trading && self.quote_asset == quote_asset
    }
}


//
// CANDLES
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
    pub quote_volume: f64,
    pub trade_count: i64,
    pub taker_buy_base_volume: f64,
    pub taker_buy_quote_volume: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesStatus {
    /// Pagination reached a natural stop (empty page, short page or end of range).
    Complete,
    /// Pagination gave up after transient failures; candles hold what arrived before that.
    Incomplete { reason: String },
    /// The run was cancelled between pages. The candles must not be persisted.
    Cancelled,
}

/// Append-only series for one symbol, owned by a single fetch operation.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    pub symbol: String,
    pub candles: Vec<Candle>,
    pub status: SeriesStatus,
    pub pages: usize,
}

impl CandleSeries {
    pub fn new(symbol: &str) -> Self {
        CandleSeries {
            symbol: symbol.to_string(),
            candles: Vec::new(),
            status: SeriesStatus::Complete,
            pages: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == SeriesStatus::Complete
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Appends a page, dropping any candle that does not move `open_time` forward.
    /// Returns the number of dropped candles.
    pub fn push_page(&mut self, page: Vec<Candle>) -> usize {
        let mut dropped: usize = 0;
        self.pages += 1;

        for candle in page {
            if let Some(last) = self.candles.last() {
                if candle.open_time <= last.open_time {
                    dropped += 1;
                    continue;
                }
            }
            self.candles.push(candle);
        }

        dropped
    }

    /// Number of places where consecutive buckets are further apart than one interval.
    pub fn gap_count(&self, interval: KlineInterval) -> usize {
        let width: i64 = interval.duration_ms();
        self.candles
            .windows(2)
            .filter(|w| w[1].open_time - w[0].open_time > width)
            .count()
    }
}


//
// CURRENCIES & RESOLUTION
//

/// Distinct base currencies in first-encounter order, with transaction counts.
#[derive(Debug, Clone, Default)]
pub struct CurrencySet {
    order: Vec<String>,
    counts: HashMap<String, usize>,
}

impl CurrencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, currency: &str) {
        match self.counts.get_mut(currency) {
            Some(count) => *count += 1,
            None => {
                self.order.push(currency.to_string());
                self.counts.insert(currency.to_string(), 1);
            }
        }
    }

    pub fn currencies(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn count_of(&self, currency: &str) -> usize {
        self.counts.get(currency).copied().unwrap_or(0)
    }

    /// Currencies ordered by transaction count (descending), ties broken by name.
    pub fn by_count(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .order
            .iter()
            .map(|c| (c.as_str(), self.count_of(c)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPair {
    pub base_currency: String,
    pub symbol: String,
}


//
// TIME RANGE
//

/// Epoch-millisecond window; `end_ms` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeRange {
    pub fn from_datetimes(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        TimeRange {
            start_ms: start.timestamp_millis(),
            end_ms: end.timestamp_millis(),
        }
    }

    pub fn span_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}


//
// OUTPUT RECORDS
//

/// One line of the per-symbol JSONL output. Key names follow the warehouse loader's columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionRecord {
    pub symbol: String,
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
    pub quote_volume: f64,
    #[serde(rename = "trades")]
    pub trade_count: i64,
    pub taker_buy_base_volume: f64,
    pub taker_buy_quote_volume: f64,
}

impl IngestionRecord {
    pub fn from_candle(symbol: &str, candle: &Candle) -> Self {
        IngestionRecord {
            symbol: symbol.to_string(),
            open_time: candle.open_time,
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume,
            close_time: candle.close_time,
            quote_volume: candle.quote_volume,
            trade_count: candle.trade_count,
            taker_buy_base_volume: candle.taker_buy_base_volume,
            taker_buy_quote_volume: candle.taker_buy_quote_volume,
        }
    }
}
