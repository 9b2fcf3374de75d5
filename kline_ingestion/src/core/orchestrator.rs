// @file: kline_ingestion/src/core/orchestrator.rs
// @description: End-to-end run coordination: extract -> resolve -> paginate per symbol -> persist -> summarize.
// @author: LAS.

use crate::core::errors::IngestionError;
use crate::core::interfaces::ExchangeRestClient;
use crate::core::models::{CandleSeries, KlineInterval, ResolvedPair, SeriesStatus, SymbolMetadata, TimeRange};
use crate::core::paginator::{self, PaginationOptions, SeriesRequest};
use crate::core::rate_limiter::RequestPacer;
use crate::core::resolver::{self, Resolution};
use crate::core::retry::{self, Attempt};
use crate::core::summary::{RunSummary, SymbolReport, SymbolStatus};
use crate::io::extract::{self, BusinessExtract};
use crate::io::sink;
use crate::utils::config::AppConfig;
use futures_util::stream::{self, StreamExt};
use log::{error, info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;


//
// ORCHESTRATOR STRUCT
//

pub struct Orchestrator {
    client: Arc<dyn ExchangeRestClient>,
    config: AppConfig,
    pacer: Arc<RequestPacer>,
    cancel: CancellationToken,
}

impl Orchestrator {
    //
    // INITIALIZATION
    //

    pub fn new(client: Arc<dyn ExchangeRestClient>, mut config: AppConfig, cancel: CancellationToken) -> Self {
        config.normalize();
        let pacer: Arc<RequestPacer> = Arc::new(RequestPacer::per_second(config.rate_limit_per_sec));
        Orchestrator {
            client,
            config,
            pacer,
            cancel,
        }
    }



    //
    // PUBLIC INTERFACE
    //

    pub async fn run(&self) -> Result<RunSummary, IngestionError> {
        // #1. Extract first: a bad extract aborts before any network call
        let extract: BusinessExtract = extract::load_business_extract(&self.config.extract_path)?;
        self.run_with_extract(&extract).await
    }

    pub async fn run_with_extract(&self, extract: &BusinessExtract) -> Result<RunSummary, IngestionError> {
        self.config.validate()?;
        let options: PaginationOptions = self.config.pagination_options()?;
        let range: TimeRange = covering_range(extract, options.interval);
        let quote: &str = &self.config.quote_asset;

        // #2. Live symbol set
        let tradable: Vec<SymbolMetadata> = self.list_tradable_symbols().await?;
        info!("{} {} pairs tradable on {}", tradable.len(), quote, self.client.name());

        // #3. Resolve currencies (unresolved ones are reported, never fatal)
        let resolution: Resolution =
            resolver::resolve_symbols(extract.currencies.currencies(), &tradable, quote);
        for currency in &resolution.unresolved {
            warn!("{} - no tradable {}{} pair, skipped", currency, currency, quote);
        }
        info!(
            "{} of {} currencies resolved, {} unresolved",
            resolution.resolved.len(),
            extract.currencies.len(),
            resolution.unresolved.len()
        );

        // #4. Bounded worker pool, one job per resolved symbol
        let total: usize = resolution.resolved.len();
        let mut reports: Vec<SymbolReport> = stream::iter(resolution.resolved.iter().enumerate())
            .map(|(idx, pair)| self.ingest_symbol(idx, total, pair, range, &options))
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;
        reports.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        // #5. Summary
        let summary: RunSummary = RunSummary {
            exchange: self.client.name().to_string(),
            quote_asset: quote.to_string(),
            interval: options.interval.to_string(),
            range,
            currencies: extract.currencies.len(),
            resolved: resolution.resolved.len(),
            unresolved: resolution.unresolved,
            symbols: reports,
            cancelled: self.cancel.is_cancelled(),
        };

        if !self.config.summary_path.as_os_str().is_empty() {
            sink::write_summary(&self.config.summary_path, &summary).await?;
        }
        Ok(summary)
    }


    //
    // INTERNAL HELPERS
    //

    async fn list_tradable_symbols(&self) -> Result<Vec<SymbolMetadata>, IngestionError> {
        let quote: &str = &self.config.quote_asset;
        let attempt = retry::run_with_retry(
            &self.config.retry_policy(),
            &self.pacer,
            &self.cancel,
            "exchangeInfo",
            || self.client.list_tradable_symbols(quote),
        )
        .await;

        match attempt {
            Attempt::Done(symbols) => Ok(symbols),
            Attempt::Exhausted { error, attempts } => {
                error!("symbol listing failed after {} attempt(s): {}", attempts, error);
                Err(IngestionError::SymbolListing(error))
            }
            Attempt::Cancelled => Err(IngestionError::Cancelled),
        }
    }

    async fn ingest_symbol(
        &self,
        idx: usize,
        total: usize,
        pair: &ResolvedPair,
        range: TimeRange,
        options: &PaginationOptions,
    ) -> SymbolReport {
        if self.cancel.is_cancelled() {
            return SymbolReport::new(&pair.symbol, &pair.base_currency, SymbolStatus::Cancelled);
        }
        info!("[{}/{}] {} is processing...", idx + 1, total, pair.symbol);

        let request: SeriesRequest = SeriesRequest {
            symbol: pair.symbol.clone(),
            start_ms: range.start_ms,
            end_ms: Some(range.end_ms),
        };
        let series: CandleSeries = paginator::fetch_series_for_symbol(
            self.client.as_ref(),
            &request,
            options,
            &self.pacer,
            &self.cancel,
        )
        .await;

        self.persist(pair, series, options.interval).await
    }

    async fn persist(&self, pair: &ResolvedPair, series: CandleSeries, interval: KlineInterval) -> SymbolReport {
        let mut report: SymbolReport = SymbolReport::new(&pair.symbol, &pair.base_currency, SymbolStatus::Complete);
        report.pages = series.pages;
        let output_dir = &self.config.output_dir;

        match &series.status {
            // #1. Cancelled: discard, a truncated file would look complete
            SeriesStatus::Cancelled => {
                info!("{}: cancelled, discarding {} fetched candles", pair.symbol, series.len());
                report.status = SymbolStatus::Cancelled;
                return report;
            }

            // #2. Nothing to write: drop any file from an earlier run
            status if series.is_empty() => {
                match status {
                    SeriesStatus::Incomplete { reason } => {
                        error!("{}: fetch failed before any data: {}", pair.symbol, reason);
                        report.status = SymbolStatus::Failed;
                        report.error = Some(reason.clone());
                    }
                    _ => {
                        warn!("{}: no data in range", pair.symbol);
                        report.status = SymbolStatus::Empty;
                    }
                }
                if let Err(e) = sink::remove_stale(output_dir, &pair.symbol).await {
                    warn!("{}: could not remove stale output: {}", pair.symbol, e);
                }
                return report;
            }

            SeriesStatus::Incomplete { reason } => {
                warn!(
                    "{}: partial series ({} candles) will be written and marked incomplete",
                    pair.symbol,
                    series.len()
                );
                report.status = SymbolStatus::Incomplete;
                report.error = Some(reason.clone());
            }

            SeriesStatus::Complete => {}
        }

        // #3. Write
        report.records = series.len();
        report.gaps = series.gap_count(interval);
        match sink::write_series(output_dir, &pair.symbol, &series.candles).await {
            Ok(path) => {
                info!("{}: saved {} klines in {}", pair.symbol, report.records, path.display());
                report.output_path = Some(path);
            }
            Err(e) => {
                error!("{}: write failed: {}", pair.symbol, e);
                report.status = SymbolStatus::Failed;
                report.error = Some(e.to_string());
                report.records = 0;
            }
        }
        report
    }
}


//
// RANGE HELPERS
//

/// `[first, last)` of the extract; a single-instant extract still fetches one bucket.
pub fn covering_range(extract: &BusinessExtract, interval: KlineInterval) -> TimeRange {
    let mut range: TimeRange = extract.time_range();
    if range.end_ms <= range.start_ms {
        range.end_ms = range.start_ms + interval.duration_ms();
    }
    range
}
