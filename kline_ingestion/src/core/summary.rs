// @file: kline_ingestion/src/core/summary.rs
// @description: Run summary separating unresolved, failed, partial, empty and complete symbols.
// @author: LAS.

use crate::core::models::TimeRange;
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;


//
// PER-SYMBOL OUTCOME
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolStatus {
    /// Full series written.
    Complete,
    /// Fetch gave up after transient errors; the partial series was written.
    Incomplete,
    /// The exchange had no candles in range. No file.
    Empty,
    /// Fetch failed before any candle arrived, or the write failed. No file.
    Failed,
    /// Run cancelled before the series finished. Nothing written.
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub base_currency: String,
    pub status: SymbolStatus,
    pub records: usize,
    pub pages: usize,
    pub gaps: usize,
    pub output_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl SymbolReport {
    pub fn new(symbol: &str, base_currency: &str, status: SymbolStatus) -> Self {
        SymbolReport {
            symbol: symbol.to_string(),
            base_currency: base_currency.to_string(),
            status,
            records: 0,
            pages: 0,
            gaps: 0,
            output_path: None,
            error: None,
        }
    }
}


//
// RUN SUMMARY
//

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub exchange: String,
    pub quote_asset: String,
    pub interval: String,
    pub range: TimeRange,
    pub currencies: usize,
    pub resolved: usize,
    pub unresolved: Vec<String>,
    pub symbols: Vec<SymbolReport>,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn count(&self, status: SymbolStatus) -> usize {
        self.symbols.iter().filter(|s| s.status == status).count()
    }

    pub fn total_records(&self) -> usize {
        self.symbols.iter().map(|s| s.records).sum()
    }

    pub fn report_for(&self, symbol: &str) -> Option<&SymbolReport> {
        self.symbols.iter().find(|s| s.symbol == symbol)
    }

    pub fn empty_symbols(&self) -> Vec<&str> {
        self.symbols
            .iter()
            .filter(|s| s.status == SymbolStatus::Empty)
            .map(|s| s.symbol.as_str())
            .collect()
    }

    pub fn log_report(&self) {
        info!("==================== RUN SUMMARY ====================");
        info!(
            "exchange={} quote={} interval={} range=[{}, {})",
            self.exchange,
            self.quote_asset,
            self.interval,
            self.range.start_ms,
            self.range.end_ms
        );
        info!(
            "currencies={} resolved={} unresolved={}",
            self.currencies,
            self.resolved,
            self.unresolved.len()
        );
        if !self.unresolved.is_empty() {
            warn!("no tradable pair for: {}", self.unresolved.join(", "));
        }

        for report in &self.symbols {
            let line: String = format!(
                "{:<14} {:<10} records={:<6} pages={:<4} gaps={}",
                report.symbol,
                format!("{:?}", report.status).to_lowercase(),
                report.records,
                report.pages,
                report.gaps
            );
            match (&report.status, &report.error) {
                (SymbolStatus::Complete, _) => info!("{}", line),
                (_, Some(err)) => warn!("{} error={}", line, err),
                (_, None) => warn!("{}", line),
            }
        }

        info!(
            "complete={} incomplete={} empty={} failed={} cancelled={} total_records={}",
            self.count(SymbolStatus::Complete),
            self.count(SymbolStatus::Incomplete),
            self.count(SymbolStatus::Empty),
            self.count(SymbolStatus::Failed),
            self.count(SymbolStatus::Cancelled),
            self.total_records()
        );
    }
}
