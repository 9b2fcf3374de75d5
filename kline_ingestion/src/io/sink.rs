// @file: kline_ingestion/src/io/sink.rs
// @description: Per-symbol JSONL output with replace-on-rerun semantics, plus the run summary file.
// @author: LAS.

use crate::core::errors::IngestionError;
use crate::core::models::{Candle, IngestionRecord};
use crate::core::summary::RunSummary;
use std::path::{Path, PathBuf};
use tokio::fs;


//
// NAMING
//

pub fn output_path(output_dir: &Path, symbol: &str) -> PathBuf {
    output_dir.join(format!("{}.jsonl", symbol))
}

fn staging_path(output_dir: &Path, symbol: &str) -> PathBuf {
    output_dir.join(format!("{}.jsonl.tmp", symbol))
}

fn check_symbol(symbol: &str) -> Result<(), IngestionError> {
    if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(IngestionError::DataValidation(format!(
            "symbol '{}' cannot be used as an output file name",
            symbol
        )));
    }
    Ok(())
}


//
// ENCODING
//

/// One flat JSON object per line, in series order.
pub fn encode_records(symbol: &str, candles: &[Candle]) -> Result<String, IngestionError> {
    let mut out: String = String::with_capacity(candles.len() * 256);
    for candle in candles {
        let record: IngestionRecord = IngestionRecord::from_candle(symbol, candle);
        out.push_str(&serde_json::to_string(&record)?);
        out.push('\n');
    }
    Ok(out)
}


//
// PUBLIC INTERFACE
//

/// Writes the series to a staging file and renames it over `{SYMBOL}.jsonl`.
/// The final name only ever holds a fully written file.
pub async fn write_series(output_dir: &Path, symbol: &str, candles: &[Candle]) -> Result<PathBuf, IngestionError> {
    check_symbol(symbol)?;
    fs::create_dir_all(output_dir).await?;

    let body: String = encode_records(symbol, candles)?;
    let staging: PathBuf = staging_path(output_dir, symbol);
    let target: PathBuf = output_path(output_dir, symbol);

    fs::write(&staging, body.as_bytes()).await?;
    if let Err(e) = fs::rename(&staging, &target).await {
        let _ = fs::remove_file(&staging).await;
        return Err(e.into());
    }

    Ok(target)
}

/// Removes output left by an earlier run. Returns whether a file existed.
pub async fn remove_stale(output_dir: &Path, symbol: &str) -> Result<bool, IngestionError> {
    check_symbol(symbol)?;
    match fs::remove_file(output_path(output_dir, symbol)).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

pub async fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), IngestionError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let json: String = serde_json::to_string_pretty(summary)?;
    fs::write(path, json.as_bytes()).await?;
    Ok(())
}
