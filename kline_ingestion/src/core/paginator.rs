// @file: kline_ingestion/src/core/paginator.rs
// @description: Cursor-advancing pagination that assembles a complete candle series for one symbol.
// @author: LAS.

use crate::core::interfaces::{ExchangeRestClient, PageRequest};
use crate::core::models::{Candle, CandleSeries, KlineInterval, SeriesStatus};
use crate::core::rate_limiter::RequestPacer;
use crate::core::retry::{self, Attempt, RetryPolicy};
use log::{debug, info, warn};
use std::time::Duration;
use tokio_util::sync::CancellationToken;


//
// CONSTANTS
//

/// Binance rejects `limit` above this value.
pub const MAX_PAGE_SIZE: usize = 1000;


//
// TYPE DEFINITIONS
//

#[derive(Debug, Clone)]
pub struct PaginationOptions {
    pub interval: KlineInterval,
    pub page_size: usize,
    pub page_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        PaginationOptions {
            interval: KlineInterval::OneHour,
            page_size: MAX_PAGE_SIZE,
            page_delay: Duration::from_millis(100),
            retry: RetryPolicy::none(),
        }
    }
}

/// Window for one symbol. `end_ms` is exclusive; `None` pages until the exchange runs dry.
#[derive(Debug, Clone)]
pub struct SeriesRequest {
    pub symbol: String,
    pub start_ms: i64,
    pub end_ms: Option<i64>,
}


//
// PUBLIC INTERFACE
//

pub async fn fetch_series_for_symbol(
    client: &dyn ExchangeRestClient,
    request: &SeriesRequest,
    options: &PaginationOptions,
    pacer: &RequestPacer,
    cancel: &CancellationToken,
) -> CandleSeries {
    let mut series: CandleSeries = CandleSeries::new(&request.symbol);
    let page_size: usize = options.page_size.clamp(1, MAX_PAGE_SIZE);

    // #1. Initialize cursor
    let mut cursor: i64 = request.start_ms;

    loop {
        if cancel.is_cancelled() {
            series.status = SeriesStatus::Cancelled;
            return series;
        }

        // #2. Request one page starting at the cursor
        let page_request: PageRequest = PageRequest {
            symbol: request.symbol.clone(),
            interval: options.interval,
            start_time: Some(cursor),
            end_time: request.end_ms,
            limit: page_size,
        };
        let label: String = format!("{} page {} (startTime={})", request.symbol, series.pages + 1, cursor);

        let attempt = retry::run_with_retry(&options.retry, pacer, cancel, &label, || {
            client.fetch_candle_page(&page_request)
        })
        .await;

        let page: Vec<Candle> = match attempt {
            Attempt::Done(page) => page,
            Attempt::Exhausted { error, attempts } => {
                warn!(
                    "{}: giving up after {} attempt(s), keeping {} candles as a partial series: {}",
                    request.symbol,
                    attempts,
                    series.len(),
                    error
                );
                series.status = SeriesStatus::Incomplete { reason: error.to_string() };
                return series;
            }
            Attempt::Cancelled => {
                series.status = SeriesStatus::Cancelled;
                return series;
            }
        };

        // #3. Stop A: nothing left in range
        if page.is_empty() {
            debug!("{}: empty page, no more data", request.symbol);
            break;
        }

        let page_len: usize = page.len();
        let last_close: i64 = page[page_len - 1].close_time;

        // #4. Clip buckets opening at or past the exclusive end
        let (page, clipped): (Vec<Candle>, usize) = clip_to_end(page, request.end_ms);
        if clipped > 0 {
            debug!("{}: {} candle(s) at or past end_time ignored", request.symbol, clipped);
        }
        if page.is_empty() {
            break;
        }
        let kept: usize = page.len();

        // #5. Append
        let dropped: usize = series.push_page(page);
        if dropped > 0 {
            warn!(
                "{}: dropped {} candle(s) that did not advance openTime",
                request.symbol, dropped
            );
        }
        debug!("{}: fetched {} klines (total {})", request.symbol, kept, series.len());

        // #6. Stop B: a short page or one that reached end_time completes the series
        if page_len < page_size || clipped > 0 {
            debug!("{}: last page reached", request.symbol);
            break;
        }

        // #7. Advance one millisecond past the last close (startTime is inclusive)
        let next_cursor: i64 = last_close + 1;
        if next_cursor <= cursor {
            // A full page that does not move time forward would repeat forever.
            series.status = SeriesStatus::Incomplete {
                reason: format!("cursor did not advance past {}", cursor),
            };
            warn!("{}: cursor stalled at {}, stopping", request.symbol, cursor);
            return series;
        }
        cursor = next_cursor;

        // #8. Stop C: range exhausted
        if let Some(end) = request.end_ms {
            if cursor >= end {
                debug!("{}: reached end_time", request.symbol);
                break;
            }
        }

        // #9. Per-worker spacing between pages
        if !retry::pause(options.page_delay, cancel).await {
            series.status = SeriesStatus::Cancelled;
            return series;
        }
    }

    info!(
        "{}: {} klines in {} page(s)",
        request.symbol,
        series.len(),
        series.pages
    );
    series
}


//
// INTERNAL HELPERS
//

fn clip_to_end(mut page: Vec<Candle>, end_ms: Option<i64>) -> (Vec<Candle>, usize) {
    let end: i64 = match end_ms {
        Some(end) => end,
        None => return (page, 0),
    };
    let before: usize = page.len();
    page.retain(|c| c.open_time < end);
    let clipped: usize = before - page.len();
    (page, clipped)
}
