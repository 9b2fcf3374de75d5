// @file: kline_ingestion/src/main.rs
// @description: Binary entry point invoked by the scheduler as the kline ingestion step.
// @author: LAS.

use kline_ingestion::connectors::build_rest_client;
use kline_ingestion::{AppConfig, IngestionError, Orchestrator, RunSummary};
use log::{error, info, warn};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Environment & Config
    dotenv::dotenv().ok();
    let config: AppConfig = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::from(1);
        }
    };

    // 2. Initialize Logger (RUST_LOG overrides log_level)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str())).init();

    info!(">>> Kline Ingestion is Starting... <<<");

    // 3. Run
    match run(config).await {
        Ok(summary) if summary.cancelled => {
            warn!(">>> Run cancelled; completed symbols were kept <<<");
            ExitCode::from(130)
        }
        Ok(_) => {
            info!(">>> Kline Ingestion finished <<<");
            ExitCode::SUCCESS
        }
        Err(IngestionError::Cancelled) => {
            warn!(">>> Run cancelled before any symbol was fetched <<<");
            ExitCode::from(130)
        }
        Err(e) => {
            error!(">>> Run aborted: {} <<<", e);
            ExitCode::from(1)
        }
    }
}

async fn run(config: AppConfig) -> Result<RunSummary, IngestionError> {
    let client = build_rest_client(&config)?;
    let cancel: CancellationToken = CancellationToken::new();

    // #1. Operator abort
    let on_signal: CancellationToken = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after in-flight pages");
            on_signal.cancel();
        }
    });

    // #2. Run-level deadline
    if let Some(deadline) = config.run_deadline() {
        let on_deadline: CancellationToken = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            warn!("Run deadline of {:?} reached, cancelling", deadline);
            on_deadline.cancel();
        });
    }

    let output_dir = config.output_dir.clone();
    let orchestrator: Orchestrator = Orchestrator::new(client, config, cancel);
    let summary: RunSummary = orchestrator.run().await?;

    summary.log_report();
    info!("Output directory: {}/", output_dir.display());
    Ok(summary)
}
