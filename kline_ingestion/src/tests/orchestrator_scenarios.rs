// @file: kline_ingestion/src/tests/orchestrator_scenarios.rs
// @description: End-to-end runs against the simulated exchange: resolution, per-symbol isolation, persistence and summaries.
// @author: LAS.

#[cfg(test)]
mod orchestrator_tests {
    use crate::core::errors::IngestionError;
    use crate::core::interfaces::ExchangeRestClient;
    use crate::core::models::IngestionRecord;
    use crate::core::orchestrator::Orchestrator;
    use crate::core::summary::{RunSummary, SymbolStatus};
    use crate::io::extract::{read_business_extract, BusinessExtract};
    use crate::io::sink;
    use crate::tests::mock_exchange::{hourly_candles, SimulatedExchange, HOUR_MS};
    use crate::utils::config::AppConfig;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    //
    // CONSTANTS
    //

    // 2025-01-01T00:00:00Z
    const T0: i64 = 1_735_689_600_000;
    // History starts a day early and runs well past the extract
    const HISTORY_START: i64 = T0 - 24 * HOUR_MS;
    const HISTORY_LEN: usize = 24 * 6;

    const EXTRACT: &str = "txn_id,destination_currency,created_at\n\
                           t1,BTC,2025-01-01T00:00:00Z\n\
                           t2,FOO,2025-01-02 12:00:00\n\
                           t3,USDT,2025-01-02 13:00:00\n\
                           t4,BTC,2025-01-03T00:00:00Z\n";

    //
    // HELPERS
    //

    fn test_config(dir: &Path) -> AppConfig {
        AppConfig {
            page_delay_ms: 0,
            rate_limit_per_sec: 0,
            max_retries: 0,
            retry_base_delay_ms: 0,
            retry_max_delay_ms: 0,
            extract_path: dir.join("transactions.csv"),
            output_dir: dir.join("raw_rates"),
            summary_path: dir.join("run_summary.json"),
            ..AppConfig::default()
        }
    }

    fn extract_of(csv: &str) -> BusinessExtract {
        read_business_extract(csv.as_bytes()).unwrap()
    }

    async fn run_against(exchange: Arc<SimulatedExchange>, config: AppConfig, csv: &str) -> RunSummary {
        let client: Arc<dyn ExchangeRestClient> = exchange;
        Orchestrator::new(client, config, CancellationToken::new())
            .run_with_extract(&extract_of(csv))
            .await
            .unwrap()
    }

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    //
    // SCENARIOS
    //

    #[tokio::test]
    async fn test_end_to_end_hourly_series_and_unresolved_warning() {
        let dir = tempfile::tempdir().unwrap();
        let config: AppConfig = test_config(dir.path());
        let exchange = Arc::new(
            SimulatedExchange::new()
                .with_symbol("BTCUSDT", "USDT", "TRADING")
                .with_history("BTCUSDT", hourly_candles(HISTORY_START, HISTORY_LEN)),
        );

        let summary: RunSummary = run_against(exchange.clone(), config.clone(), EXTRACT).await;

        // #1. Resolution
        assert_eq!(summary.currencies, 3);
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.unresolved, vec!["FOO".to_string()]);
        assert_eq!(summary.range.start_ms, T0);
        assert_eq!(summary.range.end_ms, T0 + 48 * HOUR_MS);

        // #2. One complete series of 48 hourly buckets
        let report = summary.report_for("BTCUSDT").unwrap();
        assert_eq!(report.status, SymbolStatus::Complete);
        assert_eq!(report.records, 48);
        assert_eq!(report.gaps, 0);
        assert!(summary.report_for("FOOUSDT").is_none());

        // #3. Output file
        let path = sink::output_path(&config.output_dir, "BTCUSDT");
        assert_eq!(report.output_path.as_deref(), Some(path.as_path()));
        let lines: Vec<String> = read_lines(&path);
        assert_eq!(lines.len(), 48);

        let first: IngestionRecord = serde_json::from_str(&lines[0]).unwrap();
        let last: IngestionRecord = serde_json::from_str(&lines[47]).unwrap();
        assert_eq!(first.symbol, "BTCUSDT");
        assert_eq!(first.open_time, T0);
        assert_eq!(last.open_time, T0 + 47 * HOUR_MS);
        assert!(lines[0].contains("\"trades\":"));
        assert!(!config.output_dir.join("FOOUSDT.jsonl").exists());
        assert!(!config.output_dir.join("BTCUSDT.jsonl.tmp").exists());

        // #4. Requests carried the extract's window
        let requests = exchange.requests_for("BTCUSDT");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].start_time, Some(T0));
        assert_eq!(requests[0].end_time, Some(T0 + 48 * HOUR_MS));

        // #5. Summary file
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&config.summary_path).unwrap()).unwrap();
        assert_eq!(written["symbols"][0]["status"], "complete");
        assert_eq!(written["unresolved"][0], "FOO");
    }

    #[tokio::test]
    async fn test_small_pages_produce_the_same_series() {
        let dir = tempfile::tempdir().unwrap();
        let mut config: AppConfig = test_config(dir.path());
        config.page_size = 10;
        let exchange = Arc::new(
            SimulatedExchange::new()
                .with_symbol("BTCUSDT", "USDT", "TRADING")
                .with_history("BTCUSDT", hourly_candles(HISTORY_START, HISTORY_LEN)),
        );

        let summary = run_against(exchange.clone(), config.clone(), EXTRACT).await;

        // 10 + 10 + 10 + 10 + 8
        assert_eq!(exchange.requests_for("BTCUSDT").len(), 5);
        let report = summary.report_for("BTCUSDT").unwrap();
        assert_eq!(report.records, 48);
        assert_eq!(report.pages, 5);
    }

    #[tokio::test]
    async fn test_rerun_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let config: AppConfig = test_config(dir.path());
        let build = || {
            Arc::new(
                SimulatedExchange::new()
                    .with_symbol("BTCUSDT", "USDT", "TRADING")
                    .with_history("BTCUSDT", hourly_candles(HISTORY_START, HISTORY_LEN)),
            )
        };
        let path = sink::output_path(&config.output_dir, "BTCUSDT");

        run_against(build(), config.clone(), EXTRACT).await;
        let first: Vec<u8> = std::fs::read(&path).unwrap();

        run_against(build(), config.clone(), EXTRACT).await;
        let second: Vec<u8> = std::fs::read(&path).unwrap();

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_failing_symbols_do_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut config: AppConfig = test_config(dir.path());
        config.page_size = 10;
        config.max_concurrency = 2;
        let exchange = Arc::new(
            SimulatedExchange::new()
                .with_symbol("BTCUSDT", "USDT", "TRADING")
                .with_symbol("ETHUSDT", "USDT", "TRADING")
                .with_symbol("SOLUSDT", "USDT", "TRADING")
                .with_history("BTCUSDT", hourly_candles(HISTORY_START, HISTORY_LEN))
                .with_history("ETHUSDT", hourly_candles(HISTORY_START, HISTORY_LEN))
                .with_history("SOLUSDT", hourly_candles(HISTORY_START, HISTORY_LEN))
                .fail_from_call("ETHUSDT", 1)
                .fail_from_call("SOLUSDT", 3),
        );
        let csv = "destination_currency,created_at\n\
                   SOL,2025-01-01T00:00:00Z\n\
                   ETH,2025-01-02T00:00:00Z\n\
                   BTC,2025-01-03T00:00:00Z\n";

        let summary = run_against(exchange, config.clone(), csv).await;

        // #1. Reports are in symbol order and keep the three outcomes apart
        let symbols: Vec<&str> = summary.symbols.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT", "SOLUSDT"]);

        let btc = summary.report_for("BTCUSDT").unwrap();
        assert_eq!(btc.status, SymbolStatus::Complete);
        assert_eq!(btc.records, 48);

        let eth = summary.report_for("ETHUSDT").unwrap();
        assert_eq!(eth.status, SymbolStatus::Failed);
        assert!(eth.error.is_some());
        assert!(!sink::output_path(&config.output_dir, "ETHUSDT").exists());

        // #2. Partial series is persisted and flagged
        let sol = summary.report_for("SOLUSDT").unwrap();
        assert_eq!(sol.status, SymbolStatus::Incomplete);
        assert_eq!(sol.records, 20);
        assert_eq!(read_lines(&sink::output_path(&config.output_dir, "SOLUSDT")).len(), 20);

        assert_eq!(summary.count(SymbolStatus::Complete), 1);
        assert_eq!(summary.count(SymbolStatus::Failed), 1);
        assert_eq!(summary.count(SymbolStatus::Incomplete), 1);
        assert!(!summary.cancelled);
    }

    #[tokio::test]
    async fn test_empty_series_is_reported_and_stale_output_removed() {
        let dir = tempfile::tempdir().unwrap();
        let config: AppConfig = test_config(dir.path());
        let stale = sink::output_path(&config.output_dir, "XRPUSDT");
        std::fs::create_dir_all(&config.output_dir).unwrap();
        std::fs::write(&stale, "{\"old\":true}\n").unwrap();

        let exchange = Arc::new(SimulatedExchange::new().with_symbol("XRPUSDT", "USDT", "TRADING"));
        let csv = "destination_currency,created_at\nXRP,2025-01-01T00:00:00Z\nXRP,2025-01-02T00:00:00Z\n";

        let summary = run_against(exchange, config, csv).await;

        let report = summary.report_for("XRPUSDT").unwrap();
        assert_eq!(report.status, SymbolStatus::Empty);
        assert_eq!(report.records, 0);
        assert_eq!(summary.empty_symbols(), vec!["XRPUSDT"]);
        assert!(!stale.exists());
    }

    fn many_symbol_fixture(bases: &[&str]) -> (SimulatedExchange, String) {
        let mut exchange = SimulatedExchange::new().with_latency(Duration::from_millis(5));
        let mut csv = String::from("destination_currency,created_at\n");
        for base in bases.iter().rev() {
            let symbol = format!("{}USDT", base);
            exchange = exchange
                .with_symbol(&symbol, "USDT", "TRADING")
                .with_history(&symbol, hourly_candles(HISTORY_START, HISTORY_LEN));
            csv.push_str(&format!("{},2025-01-01T00:00:00Z\n{},2025-01-03T00:00:00Z\n", base, base));
        }
        (exchange, csv)
    }

    #[tokio::test]
    async fn test_many_symbols_under_a_concurrency_cap() {
        let dir = tempfile::tempdir().unwrap();
        let mut config: AppConfig = test_config(dir.path());
        config.page_size = 7;
        config.max_concurrency = 3;

        let bases = ["ADA", "BNB", "BTC", "DOGE", "ETH", "LTC", "SOL", "XRP"];
        let (exchange, csv) = many_symbol_fixture(&bases);
        let exchange = Arc::new(exchange);

        let summary = run_against(exchange.clone(), config, &csv).await;

        // #1. Workers overlapped, but never beyond the cap
        let peak: usize = exchange.peak_in_flight();
        assert!(peak > 1, "symbols were fetched one at a time (peak {})", peak);
        assert!(peak <= 3, "{} requests in flight with max_concurrency = 3", peak);

        // #2. Each symbol still paged forward to a full series
        assert_eq!(summary.resolved, bases.len());
        assert_eq!(summary.count(SymbolStatus::Complete), bases.len());
        for base in bases {
            let symbol = format!("{}USDT", base);
            let starts: Vec<i64> = exchange
                .requests_for(&symbol)
                .iter()
                .filter_map(|r| r.start_time)
                .collect();
            assert!(starts.windows(2).all(|w| w[0] < w[1]), "{} cursor went backwards", symbol);
            assert_eq!(summary.report_for(&symbol).unwrap().records, 48);
        }
    }

    #[tokio::test]
    async fn test_single_worker_fetches_sequentially() {
        let dir = tempfile::tempdir().unwrap();
        let mut config: AppConfig = test_config(dir.path());
        config.max_concurrency = 1;

        let (exchange, csv) = many_symbol_fixture(&["BTC", "ETH", "SOL"]);
        let exchange = Arc::new(exchange);

        let summary = run_against(exchange.clone(), config, &csv).await;

        assert_eq!(exchange.peak_in_flight(), 1);
        assert_eq!(summary.count(SymbolStatus::Complete), 3);
    }

    #[tokio::test]
    async fn test_lowercase_quote_asset_still_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let mut config: AppConfig = test_config(dir.path());
        config.quote_asset = "usdt".to_string();
        let exchange = Arc::new(
            SimulatedExchange::new()
                .with_symbol("BTCUSDT", "USDT", "TRADING")
                .with_history("BTCUSDT", hourly_candles(HISTORY_START, HISTORY_LEN)),
        );

        let summary = run_against(exchange, config, EXTRACT).await;

        assert_eq!(summary.quote_asset, "USDT");
        assert_eq!(summary.resolved, 1);
        // USDT itself is never treated as a base currency
        assert_eq!(summary.unresolved, vec!["FOO".to_string()]);
    }

    //
    // RUN-LEVEL FAILURES
    //

    #[tokio::test]
    async fn test_empty_extract_aborts_before_any_network_call() {
        let dir = tempfile::tempdir().unwrap();
        let config: AppConfig = test_config(dir.path());
        std::fs::write(&config.extract_path, "txn_id,destination_currency,created_at\n").unwrap();
        let exchange = Arc::new(SimulatedExchange::new().with_symbol("BTCUSDT", "USDT", "TRADING"));
        let client: Arc<dyn ExchangeRestClient> = exchange.clone();

        let result = Orchestrator::new(client, config.clone(), CancellationToken::new()).run().await;

        assert!(matches!(result, Err(IngestionError::DataValidation(_))));
        assert_eq!(exchange.listing_calls(), 0);
        assert!(exchange.requests().is_empty());
        assert!(!config.output_dir.exists());
    }

    #[tokio::test]
    async fn test_extract_without_timestamp_column_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let config: AppConfig = test_config(dir.path());
        std::fs::write(&config.extract_path, "txn_id,destination_currency\n1,BTC\n").unwrap();
        let exchange = Arc::new(SimulatedExchange::new());
        let client: Arc<dyn ExchangeRestClient> = exchange.clone();

        let result = Orchestrator::new(client, config, CancellationToken::new()).run().await;

        assert!(matches!(result, Err(IngestionError::DataValidation(_))));
        assert_eq!(exchange.listing_calls(), 0);
    }

    #[tokio::test]
    async fn test_run_reads_extract_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config: AppConfig = test_config(dir.path());
        std::fs::write(&config.extract_path, EXTRACT).unwrap();
        let exchange = Arc::new(
            SimulatedExchange::new()
                .with_symbol("BTCUSDT", "USDT", "TRADING")
                .with_history("BTCUSDT", hourly_candles(HISTORY_START, HISTORY_LEN)),
        );
        let client: Arc<dyn ExchangeRestClient> = exchange;

        let summary = Orchestrator::new(client, config, CancellationToken::new()).run().await.unwrap();

        assert_eq!(summary.total_records(), 48);
    }

    #[tokio::test]
    async fn test_symbol_listing_outage_is_distinct_from_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let mut config: AppConfig = test_config(dir.path());
        config.max_retries = 1;

        // Two failures exhaust one retry
        let exchange = Arc::new(SimulatedExchange::new().with_symbol("BTCUSDT", "USDT", "TRADING").fail_listing(2));
        let client: Arc<dyn ExchangeRestClient> = exchange.clone();
        let result = Orchestrator::new(client, config.clone(), CancellationToken::new())
            .run_with_extract(&extract_of(EXTRACT))
            .await;

        assert!(matches!(result, Err(IngestionError::SymbolListing(_))));
        assert_eq!(exchange.listing_calls(), 2);

        // One failure is absorbed by the retry
        let exchange = Arc::new(
            SimulatedExchange::new()
                .with_symbol("BTCUSDT", "USDT", "TRADING")
                .with_history("BTCUSDT", hourly_candles(HISTORY_START, HISTORY_LEN))
                .fail_listing(1),
        );
        let summary = run_against(exchange, config, EXTRACT).await;
        assert_eq!(summary.resolved, 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config: AppConfig = test_config(dir.path());
        let exchange = Arc::new(
            SimulatedExchange::new()
                .with_symbol("BTCUSDT", "USDT", "TRADING")
                .with_history("BTCUSDT", hourly_candles(HISTORY_START, HISTORY_LEN)),
        );
        let client: Arc<dyn ExchangeRestClient> = exchange.clone();
        let cancel: CancellationToken = CancellationToken::new();
        cancel.cancel();

        let result = Orchestrator::new(client, config.clone(), cancel)
            .run_with_extract(&extract_of(EXTRACT))
            .await;

        assert!(matches!(result, Err(IngestionError::Cancelled)));
        assert!(exchange.requests().is_empty());
        assert!(!sink::output_path(&config.output_dir, "BTCUSDT").exists());
    }

    #[tokio::test]
    async fn test_single_instant_extract_fetches_one_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let config: AppConfig = test_config(dir.path());
        let exchange = Arc::new(
            SimulatedExchange::new()
                .with_symbol("BTCUSDT", "USDT", "TRADING")
                .with_history("BTCUSDT", hourly_candles(HISTORY_START, HISTORY_LEN)),
        );

        let summary = run_against(exchange, config, "destination_currency,created_at\nBTC,2025-01-01T00:00:00Z\n").await;

        assert_eq!(summary.range.end_ms - summary.range.start_ms, HOUR_MS);
        assert_eq!(summary.report_for("BTCUSDT").unwrap().records, 1);
    }
}
