//! Daily OHLCV collector CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use stock_collector::{Collector, CollectorConfig};
use stock_core::{init_logging, LogConfig, LogFormat, Symbol, TracingEventSink};
use stock_data::PgRecordStore;

#[derive(Parser)]
#[command(name = "stock-collector")]
#[command(about = "Daily OHLCV batch collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error). 없으면 RUST_LOG 사용
    #[arg(long)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact). 없으면 LOG_FORMAT 사용
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// 갱신이 필요한 심볼의 최신 일봉 수집 (1회)
    Run {
        /// 특정 심볼만 수집 (쉼표로 구분, 예: "AAPL,MSFT")
        #[arg(long)]
        symbols: Option<String>,
    },

    /// 수집 대상 티커 등록 (쉼표로 구분)
    AddTickers { symbols: String },

    /// 스키마 마이그레이션 적용
    Migrate,

    /// 데몬 모드: 주기적으로 수집 실행
    Daemon,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env();
    if let Some(level) = &cli.log_level {
        log_config = log_config.with_level(LogConfig::for_pipeline(level).level);
    }
    if let Some(format) = cli.log_format {
        log_config = log_config.with_format(format);
    }
    let _log_guard =
        init_logging(log_config).map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {e}"))?;

    tracing::info!("Stock Collector 시작");

    let config = CollectorConfig::from_env().context("설정 로드 실패")?;
    tracing::debug!(
        concurrency = config.batch.concurrency,
        stale_after_hours = config.batch.stale_after.num_hours(),
        "설정 로드 완료"
    );

    let events = TracingEventSink::shared();

    match cli.command {
        Commands::Run { symbols } => {
            let explicit = symbols.as_deref().map(Symbol::parse_list).transpose()?;
            let collector = Collector::connect(&config, events).await?;
            let report = collector.run(explicit).await;
            collector.close().await;
            report?.log_summary("일봉 수집");
        }
        Commands::AddTickers { symbols } => {
            let symbols = Symbol::parse_list(&symbols)?;
            let store = PgRecordStore::connect(&config.store_config(), events).await?;
            let rows = store.add_tickers(&symbols).await?;
            tracing::info!(count = symbols.len(), rows, "티커 등록 완료");
            store.close().await;
        }
        Commands::Migrate => {
            let store = PgRecordStore::connect(&config.store_config(), events).await?;
            store.migrate().await?;
            tracing::info!("마이그레이션 완료");
            store.close().await;
        }
        Commands::Daemon => {
            let collector = Collector::connect(&config, events).await?;
            tracing::info!(
                "=== 데몬 모드 시작 (주기: {}분) ===",
                config.daemon.interval_minutes
            );

            let mut interval = tokio::time::interval(config.daemon.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("종료 신호 수신, 데몬 종료 중...");
                        break;
                    }
                    _ = interval.tick() => {
                        match collector.run(None).await {
                            Ok(report) => report.log_summary("일봉 수집"),
                            Err(e) => tracing::error!("일봉 수집 실패: {}", e),
                        }
                        tracing::info!(
                            "=== 수집 완료, 다음 실행: {}분 후 ===",
                            config.daemon.interval_minutes
                        );
                    }
                }
            }

            collector.close().await;
        }
    }

    tracing::info!("Stock Collector 종료");
    Ok(())
}
