//! 수집 파이프라인 구성 및 1회 실행.

use std::sync::Arc;

use stock_core::{PipelineEvent, SharedEventSink, Symbol};
use stock_data::{AlphaVantageClient, PgRecordStore, SymbolSource};
use stock_notification::AlertManager;

use super::batch_fetch::BatchFetcher;
use crate::{BatchReport, CollectorConfig, Result};

/// 심볼 목록을 정하고 배치 수집을 한 번 실행합니다.
///
/// `explicit`가 주어지면 저장소 조회 없이 그 목록을 사용합니다.
/// 심볼 조회 실패는 실행 전체를 중단시킵니다.
pub async fn run_once<S>(
    source: &S,
    fetcher: &BatchFetcher,
    explicit: Option<Vec<Symbol>>,
) -> Result<BatchReport>
where
    S: SymbolSource + ?Sized,
{
    let symbols = match explicit {
        Some(symbols) => {
            tracing::info!(count = symbols.len(), "지정 심볼 수집");
            symbols
        }
        None => source.symbols_to_fetch().await?,
    };

    Ok(fetcher.run(&symbols).await)
}

/// PostgreSQL, Alpha Vantage, 알림 채널로 구성된 수집기.
pub struct Collector {
    store: Arc<PgRecordStore>,
    fetcher: BatchFetcher,
}

impl Collector {
    /// 저장소 연결과 HTTP 세션을 만들고 수집기를 구성합니다.
    ///
    /// 어느 하나라도 실패하면 심볼을 하나도 시도하지 않고 오류를 반환합니다.
    pub async fn connect(config: &CollectorConfig, events: SharedEventSink) -> Result<Self> {
        let store = PgRecordStore::connect(&config.store_config(), events.clone()).await?;
        let store = Arc::new(store);
        tracing::info!("데이터베이스 연결 성공");

        let client = AlphaVantageClient::new(config.alpha_vantage_config())?;

        let alerts = AlertManager::from_env(events.clone());
        let channels = alerts.channels().join(",");
        events.record(
            PipelineEvent::info("send_alert", "Alert channels configured")
                .with_field("channels", channels),
        );

        let fetcher = BatchFetcher::new(
            Arc::new(client),
            store.clone(),
            alerts.shared(),
            events,
            config.batch.concurrency,
        )?;

        Ok(Self { store, fetcher })
    }

    /// 레코드 저장소
    pub fn store(&self) -> &PgRecordStore {
        &self.store
    }

    /// 파이프라인을 한 번 실행합니다.
    pub async fn run(&self, explicit: Option<Vec<Symbol>>) -> Result<BatchReport> {
        run_once(self.store.as_ref(), &self.fetcher, explicit).await
    }

    /// 연결 풀을 닫습니다.
    pub async fn close(&self) {
        self.store.close().await;
    }
}
