//! Alpha Vantage 일봉 시세 클라이언트.
//!
//! `GET {base_url}/query?function=TIME_SERIES_DAILY&outputsize=compact` 요청으로
//! 최근 100 거래일 시계열을 받아, 그중 가장 최근 날짜 한 건만 사용합니다.
//!
//! # 응답 형식
//!
//! ```json
//! {
//!   "Meta Data": { ... },
//!   "Time Series (Daily)": {
//!     "2024-05-17": {
//!       "1. open": "189.5100", "2. high": "190.8100", "3. low": "189.1800",
//!       "4. close": "189.8700", "5. volume": "41282925"
//!     }
//!   }
//! }
//! ```
//!
//! 잘못된 API 키나 호출 한도 초과는 HTTP 200과 함께 `Error Message`, `Note`,
//! `Information` 키로 전달됩니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use stock_data::{AlphaVantageClient, AlphaVantageConfig, MarketDataSource};
//!
//! let client = AlphaVantageClient::new(AlphaVantageConfig::new(api_key))?;
//! let bar = client.fetch_latest(&Symbol::parse("AAPL")?).await?;
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use stock_core::{DailyBar, Symbol};

use super::MarketDataSource;
use crate::error::FetchError;

/// 일봉 시계열 키
const DAILY_SERIES_KEY: &str = "Time Series (Daily)";

/// Alpha Vantage 클라이언트 설정.
#[derive(Debug)]
pub struct AlphaVantageConfig {
    /// API 키
    pub api_key: SecretString,
    /// API Base URL
    pub base_url: String,
    /// 요청별 타임아웃
    pub timeout: Duration,
}

impl AlphaVantageConfig {
    /// 기본 Base URL
    pub const DEFAULT_BASE_URL: &'static str = "https://www.alphavantage.co";

    /// 기본 요청 타임아웃 (초)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// 기본값으로 설정을 생성합니다.
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Base URL을 설정합니다.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 요청 타임아웃을 설정합니다.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Alpha Vantage 일봉 시세 클라이언트.
///
/// 하나의 `reqwest::Client`(연결 풀)를 모든 수집 작업이 공유합니다.
pub struct AlphaVantageClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    timeout: Duration,
}

impl AlphaVantageClient {
    /// 새 클라이언트를 생성합니다.
    ///
    /// HTTP 세션을 만들 수 없으면 오류를 반환하며, 이는 실행 전체를 중단시키는
    /// 치명적 오류로 취급됩니다.
    pub fn new(config: AlphaVantageConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    /// 요청 타임아웃
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn request_daily_series(&self, symbol: &Symbol) -> Result<Value, FetchError> {
        let url = format!("{}/query", self.base_url);

        tracing::debug!(symbol = %symbol, url = %url, "Alpha Vantage 요청");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol.as_str()),
                ("outputsize", "compact"),
                ("apikey", self.api_key.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(symbol, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Rejected {
                symbol: symbol.clone(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::from_reqwest(symbol, e))
    }
}

#[async_trait]
impl MarketDataSource for AlphaVantageClient {
    fn name(&self) -> &str {
        "Alpha Vantage"
    }

    async fn fetch_latest(&self, symbol: &Symbol) -> Result<DailyBar, FetchError> {
        let body = self.request_daily_series(symbol).await?;
        parse_latest_bar(symbol, &body)
    }
}

/// 일봉 시계열 응답.
///
/// 거부 응답은 시계열 대신 아래 키 중 하나로 메시지를 담습니다.
#[derive(Debug, Deserialize)]
struct DailySeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    series: Option<BTreeMap<String, Value>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

impl DailySeriesResponse {
    fn rejection(&self) -> Option<(&'static str, &str)> {
        [
            ("Error Message", &self.error_message),
            ("Note", &self.note),
            ("Information", &self.information),
        ]
        .into_iter()
        .find_map(|(key, message)| message.as_deref().map(|m| (key, m)))
    }
}

/// 하루치 OHLCV 항목 (값은 모두 문자열)
#[derive(Debug, Deserialize)]
struct DailyEntry {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

/// 응답 본문에서 가장 최근 거래일의 일봉을 추출합니다.
///
/// 날짜 키를 모두 파싱해 최댓값을 고르며, 응답의 키 순서에 의존하지 않습니다.
/// 더 오래된 날짜는 버립니다.
pub fn parse_latest_bar(symbol: &Symbol, body: &Value) -> Result<DailyBar, FetchError> {
    let response = DailySeriesResponse::deserialize(body)
        .map_err(|e| FetchError::data_format(symbol, format!("malformed response: {e}")))?;

    let series = match (&response.series, response.rejection()) {
        (Some(series), _) => series,
        (None, Some((key, message))) => {
            return Err(FetchError::Rejected {
                symbol: symbol.clone(),
                message: format!("{key}: {message}"),
            })
        }
        (None, None) => {
            return Err(FetchError::data_format(
                symbol,
                format!("missing \"{DAILY_SERIES_KEY}\""),
            ))
        }
    };

    let mut latest: Option<(NaiveDate, &Value)> = None;
    for (date_str, entry) in series {
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
            FetchError::data_format(symbol, format!("invalid date key {date_str:?}: {e}"))
        })?;
        if latest.map_or(true, |(current, _)| date > current) {
            latest = Some((date, entry));
        }
    }

    let (trading_day, entry) =
        latest.ok_or_else(|| FetchError::data_format(symbol, "daily series is empty"))?;

    let entry = DailyEntry::deserialize(entry).map_err(|e| {
        FetchError::data_format(symbol, format!("invalid entry for {trading_day}: {e}"))
    })?;

    DailyBar::new(
        symbol.clone(),
        trading_day,
        parse_price(symbol, "open", &entry.open)?,
        parse_price(symbol, "high", &entry.high)?,
        parse_price(symbol, "low", &entry.low)?,
        parse_price(symbol, "close", &entry.close)?,
        parse_volume(symbol, &entry.volume)?,
    )
    .map_err(|e| FetchError::data_format(symbol, e.to_string()))
}

fn parse_price(symbol: &Symbol, field: &str, raw: &str) -> Result<f64, FetchError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| FetchError::data_format(symbol, format!("{field} is not a number: {raw:?}")))
}

fn parse_volume(symbol: &Symbol, raw: &str) -> Result<i64, FetchError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| FetchError::data_format(symbol, format!("volume is not an integer: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use stock_core::FailureKind;

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn entry(open: &str, volume: &str) -> Value {
        json!({
            "1. open": open,
            "2. high": "191.0000",
            "3. low": "188.2000",
            "4. close": "190.1000",
            "5. volume": volume,
        })
    }

    fn client_for(base_url: &str) -> AlphaVantageClient {
        AlphaVantageClient::new(
            AlphaVantageConfig::new(SecretString::from("demo".to_string()))
                .with_base_url(base_url)
                .with_timeout(Duration::from_secs(5)),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_picks_most_recent_date_regardless_of_order() {
        let body = json!({
            "Time Series (Daily)": {
                "2024-05-15": entry("180.0000", "100"),
                "2024-05-17": entry("189.5000", "41282925"),
                "2024-05-16": entry("185.0000", "200"),
            }
        });

        let bar = parse_latest_bar(&symbol("AAPL"), &body).unwrap();
        assert_eq!(bar.trading_day, NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());
        assert_eq!(bar.open, 189.5);
        assert_eq!(bar.high, 191.0);
        assert_eq!(bar.low, 188.2);
        assert_eq!(bar.close, 190.1);
        assert_eq!(bar.volume, 41_282_925);
    }

    #[test]
    fn test_missing_series_is_data_format_error() {
        let body = json!({ "Meta Data": {} });
        let err = parse_latest_bar(&symbol("BADSYM"), &body).unwrap_err();
        assert_eq!(err.kind(), FailureKind::DataFormat);
        assert!(err.to_string().contains("BADSYM"));
    }

    #[test]
    fn test_error_message_payload_is_rejected() {
        let body = json!({
            "Error Message": "Invalid API call. Please retry or visit the documentation."
        });
        let err = parse_latest_bar(&symbol("BADSYM"), &body).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Rejected);
        assert!(err.to_string().contains("Invalid API call"));

        let rate_limited = json!({ "Note": "Thank you for using Alpha Vantage! ..." });
        let err = parse_latest_bar(&symbol("AAPL"), &rate_limited).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Rejected);
    }

    #[test]
    fn test_non_numeric_fields_are_data_format_errors() {
        let bad_price = json!({ "Time Series (Daily)": { "2024-05-17": entry("n/a", "1") } });
        let err = parse_latest_bar(&symbol("AAPL"), &bad_price).unwrap_err();
        assert_eq!(err.kind(), FailureKind::DataFormat);

        let bad_volume = json!({ "Time Series (Daily)": { "2024-05-17": entry("1.0", "1.5") } });
        let err = parse_latest_bar(&symbol("AAPL"), &bad_volume).unwrap_err();
        assert_eq!(err.kind(), FailureKind::DataFormat);
    }

    #[test]
    fn test_invalid_date_and_empty_series() {
        let bad_date = json!({ "Time Series (Daily)": { "17/05/2024": entry("1.0", "1") } });
        assert_eq!(
            parse_latest_bar(&symbol("AAPL"), &bad_date).unwrap_err().kind(),
            FailureKind::DataFormat
        );

        let empty = json!({ "Time Series (Daily)": {} });
        assert_eq!(
            parse_latest_bar(&symbol("AAPL"), &empty).unwrap_err().kind(),
            FailureKind::DataFormat
        );
    }

    #[test]
    fn test_non_positive_price_is_rejected_as_data_format() {
        let body = json!({ "Time Series (Daily)": { "2024-05-17": entry("0", "1") } });
        let err = parse_latest_bar(&symbol("AAPL"), &body).unwrap_err();
        assert_eq!(err.kind(), FailureKind::DataFormat);
    }

    #[tokio::test]
    async fn test_fetch_latest_sends_compact_daily_request() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "Meta Data": { "2. Symbol": "AAPL" },
            "Time Series (Daily)": {
                "2024-05-17": entry("189.5000", "41282925"),
                "2024-05-16": entry("185.0000", "200"),
            }
        });
        let mock = server
            .mock("GET", "/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("function".into(), "TIME_SERIES_DAILY".into()),
                Matcher::UrlEncoded("symbol".into(), "AAPL".into()),
                Matcher::UrlEncoded("outputsize".into(), "compact".into()),
                Matcher::UrlEncoded("apikey".into(), "demo".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let bar = client.fetch_latest(&symbol("AAPL")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(bar.symbol.as_str(), "AAPL");
        assert_eq!(bar.trading_day, NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());
    }

    #[tokio::test]
    async fn test_fetch_latest_http_error_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let client = client_for(&server.url());
        let err = client.fetch_latest(&symbol("AAPL")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Rejected);
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_fetch_latest_invalid_json_is_data_format() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let client = client_for(&server.url());
        let err = client.fetch_latest(&symbol("AAPL")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::DataFormat);
    }

    #[tokio::test]
    async fn test_fetch_latest_connection_refused_is_transport() {
        // 127.0.0.1:1 은 리스닝 중인 프로세스가 없음
        let client = client_for("http://127.0.0.1:1");
        let err = client.fetch_latest(&symbol("AAPL")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Transport);
    }

    #[tokio::test]
    async fn test_fetch_latest_slow_endpoint_times_out() {
        // 연결은 받지만 응답하지 않는 서버
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let client = AlphaVantageClient::new(
            AlphaVantageConfig::new(SecretString::from("demo".to_string()))
                .with_base_url(format!("http://{addr}"))
                .with_timeout(Duration::from_millis(200)),
        )
        .unwrap();

        let err = client.fetch_latest(&symbol("SLOW")).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }), "{err}");
        assert_eq!(err.kind(), FailureKind::Transport);
        assert_eq!(err.symbol(), &symbol("SLOW"));
    }
}
