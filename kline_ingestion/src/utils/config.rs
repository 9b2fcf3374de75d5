// @file: kline_ingestion/src/utils/config.rs
// @description: Layered configuration (defaults, optional config file, APP_* environment).
// @author: LAS.

use crate::core::errors::IngestionError;
use crate::core::models::KlineInterval;
use crate::core::paginator::{PaginationOptions, MAX_PAGE_SIZE};
use crate::core::retry::RetryPolicy;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;


//
// DEFAULTS
//

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_BINANCE_REST_URL: &str = "https://api.binance.com/api/v3";
const DEFAULT_QUOTE_ASSET: &str = "USDT";
const DEFAULT_KLINE_INTERVAL: &str = "1h";
const DEFAULT_TIME_ZONE: &str = "0";
const DEFAULT_PAGE_SIZE: usize = 1000;
const DEFAULT_PAGE_DELAY_MS: u64 = 100;
const DEFAULT_RATE_LIMIT_PER_SEC: u32 = 10;
const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_EXTRACT_PATH: &str = "data/transactions.csv";
const DEFAULT_OUTPUT_DIR: &str = "output/raw_rates";
const DEFAULT_SUMMARY_PATH: &str = "output/run_summary.json";


//
// TYPE DEFINITIONS
//

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,

    // Exchange
    pub binance_rest_url: String,
    pub quote_asset: String,
    pub kline_interval: String,
    pub time_zone: String,

    // Pagination & Rate Limits
    pub page_size: usize,
    pub page_delay_ms: u64,
    pub rate_limit_per_sec: u32,
    pub max_concurrency: usize,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub request_timeout_secs: u64,

    // Files
    pub extract_path: PathBuf,
    pub output_dir: PathBuf,
    pub summary_path: PathBuf,

    // Run control (0 = no deadline)
    pub run_deadline_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            binance_rest_url: DEFAULT_BINANCE_REST_URL.to_string(),
            quote_asset: DEFAULT_QUOTE_ASSET.to_string(),
            kline_interval: DEFAULT_KLINE_INTERVAL.to_string(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            page_delay_ms: DEFAULT_PAGE_DELAY_MS,
            rate_limit_per_sec: DEFAULT_RATE_LIMIT_PER_SEC,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            retry_max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            extract_path: PathBuf::from(DEFAULT_EXTRACT_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            summary_path: PathBuf::from(DEFAULT_SUMMARY_PATH),
            run_deadline_secs: 0,
        }
    }
}

impl AppConfig {
    //
    // PUBLIC INTERFACE
    //

    pub fn load() -> Result<Self, IngestionError> {
        // APP_CONFIG_FILE picks another file; the default "config" resolves config.toml/.yaml/.json
        let config_file: String = std::env::var("APP_CONFIG_FILE").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("log_level", DEFAULT_LOG_LEVEL)?
            
            // Exchange
            .set_default("binance_rest_url", DEFAULT_BINANCE_REST_URL)?
            .set_default("quote_asset", DEFAULT_QUOTE_ASSET)?
            .set_default("kline_interval", DEFAULT_KLINE_INTERVAL)?
            .set_default("time_zone", DEFAULT_TIME_ZONE)?
            
            // Pagination & Rate Limits
            .set_default("page_size", DEFAULT_PAGE_SIZE as i64)?
            .set_default("page_delay_ms", DEFAULT_PAGE_DELAY_MS as i64)?
            .set_default("rate_limit_per_sec", DEFAULT_RATE_LIMIT_PER_SEC as i64)?
            .set_default("max_concurrency", DEFAULT_MAX_CONCURRENCY as i64)?
            .set_default("max_retries", DEFAULT_MAX_RETRIES as i64)?
            .set_default("retry_base_delay_ms", DEFAULT_RETRY_BASE_DELAY_MS as i64)?
            .set_default("retry_max_delay_ms", DEFAULT_RETRY_MAX_DELAY_MS as i64)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS as i64)?
            
            // Files
            .set_default("extract_path", DEFAULT_EXTRACT_PATH)?
            .set_default("output_dir", DEFAULT_OUTPUT_DIR)?
            .set_default("summary_path", DEFAULT_SUMMARY_PATH)?
            .set_default("run_deadline_secs", 0_i64)?
            
            // File & Env Overrides
            .add_source(File::with_name(&config_file).required(false))
            .add_source(Environment::with_prefix("APP"));

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Symbols and extract currencies are uppercase; the quote asset must match them.
    pub fn normalize(&mut self) {
        self.quote_asset = self.quote_asset.trim().to_uppercase();
    }

    pub fn validate(&self) -> Result<(), IngestionError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(IngestionError::Config(format!(
                "page_size must be within 1..={}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        if self.quote_asset.trim().is_empty() {
            return Err(IngestionError::Config("quote_asset must not be empty".to_string()));
        }
        if self.max_concurrency == 0 {
            return Err(IngestionError::Config("max_concurrency must be at least 1".to_string()));
        }
        self.interval()?;
        Ok(())
    }

    pub fn interval(&self) -> Result<KlineInterval, IngestionError> {
        self.kline_interval.parse().map_err(IngestionError::Config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    pub fn pagination_options(&self) -> Result<PaginationOptions, IngestionError> {
        Ok(PaginationOptions {
            interval: self.interval()?,
            page_size: self.page_size,
            page_delay: Duration::from_millis(self.page_delay_ms),
            retry: self.retry_policy(),
        })
    }

    pub fn run_deadline(&self) -> Option<Duration> {
        match self.run_deadline_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
