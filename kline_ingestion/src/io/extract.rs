// @file: kline_ingestion/src/io/extract.rs
// @description: Reads the business transaction extract and derives currencies and the covering time range.
// @author: LAS.

use crate::core::errors::IngestionError;
use crate::core::models::{CurrencySet, TimeRange};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{info, warn};
use std::io::Read;
use std::path::Path;


//
// CONSTANTS
//

pub const CURRENCY_COLUMN: &str = "destination_currency";
pub const TIMESTAMP_COLUMN: &str = "created_at";

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%#z"];


//
// TYPE DEFINITIONS
//

#[derive(Debug, Clone)]
pub struct BusinessExtract {
    pub currencies: CurrencySet,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub row_count: usize,
}

impl BusinessExtract {
    /// `[first_seen, last_seen)` in epoch ms.
    pub fn time_range(&self) -> TimeRange {
        TimeRange::from_datetimes(self.first_seen, self.last_seen)
    }
}


//
// PUBLIC INTERFACE
//

pub fn load_business_extract(path: &Path) -> Result<BusinessExtract, IngestionError> {
    if !path.is_file() {
        return Err(IngestionError::DataValidation(format!(
            "business extract not found: {}",
            path.display()
        )));
    }

    let file = std::fs::File::open(path)?;
    let extract: BusinessExtract = read_business_extract(file)?;
    info!("Read {} ({} rows)", path.display(), extract.row_count);
    Ok(extract)
}

pub fn read_business_extract<R: Read>(reader: R) -> Result<BusinessExtract, IngestionError> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    // #1. Locate required columns
    let headers: StringRecord = csv_reader.headers()?.clone();
    let currency_idx: usize = column_index(&headers, CURRENCY_COLUMN)?;
    let timestamp_idx: usize = column_index(&headers, TIMESTAMP_COLUMN)?;

    let mut currencies: CurrencySet = CurrencySet::new();
    let mut first_seen: Option<DateTime<Utc>> = None;
    let mut last_seen: Option<DateTime<Utc>> = None;
    let mut row_count: usize = 0;

    // #2. Scan rows
    for (idx, record) in csv_reader.records().enumerate() {
        let record: StringRecord = record?;
        // Header is line 1
        let line: usize = idx + 2;
        row_count += 1;

        let raw_ts: &str = record.get(timestamp_idx).unwrap_or("");
        let ts: DateTime<Utc> = parse_created_at(raw_ts).ok_or_else(|| {
            IngestionError::DataValidation(format!(
                "line {}: unparseable {} value '{}'",
                line, TIMESTAMP_COLUMN, raw_ts
            ))
        })?;

        first_seen = Some(first_seen.map_or(ts, |cur| cur.min(ts)));
        last_seen = Some(last_seen.map_or(ts, |cur| cur.max(ts)));

        let currency: String = record.get(currency_idx).unwrap_or("").to_uppercase();
        if currency.is_empty() {
            warn!("line {}: blank {}, row skipped for currency detection", line, CURRENCY_COLUMN);
            continue;
        }
        currencies.record(&currency);
    }

    // #3. Reject extracts that cannot drive a run
    let (first_seen, last_seen) = match (first_seen, last_seen) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(IngestionError::DataValidation(
                "business extract contains no rows".to_string(),
            ))
        }
    };
    if currencies.is_empty() {
        return Err(IngestionError::DataValidation(format!(
            "business extract has no non-blank {} values",
            CURRENCY_COLUMN
        )));
    }

    let extract: BusinessExtract = BusinessExtract {
        currencies,
        first_seen,
        last_seen,
        row_count,
    };
    log_extract_overview(&extract);
    Ok(extract)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff][offset]` and plain dates. Naive values are UTC.
pub fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw: &str = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}


//
// INTERNAL HELPERS
//

fn column_index(headers: &StringRecord, name: &str) -> Result<usize, IngestionError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| IngestionError::DataValidation(format!("business extract lacks a '{}' column", name)))
}

fn log_extract_overview(extract: &BusinessExtract) {
    info!("Found {} destination currencies", extract.currencies.len());
    for (currency, count) in extract.currencies.by_count() {
        info!("  {:<10} {} transactions", currency, count);
    }

    let span = extract.last_seen - extract.first_seen;
    info!("start_date: {}", extract.first_seen);
    info!("end_date:   {}", extract.last_seen);
    info!(
        "time range: {} days, {} hours",
        span.num_days(),
        span.num_hours() % 24
    );
}
