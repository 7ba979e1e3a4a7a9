//! 구조화된 감사 이벤트 싱크.
//!
//! 각 컴포넌트는 생성 시점에 `Arc<dyn EventSink>`를 주입받아
//! 실행 이력을 재구성할 수 있는 이벤트를 기록합니다.
//! 호출 위치의 컨텍스트는 `operation`과 명시적 필드로 전달합니다.
//!
//! - [`TracingEventSink`]: `tracing`으로 이벤트를 내보내는 운영용 싱크
//! - [`MemoryEventSink`]: 이벤트를 메모리에 보관하는 테스트용 싱크

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};

/// 이벤트 레벨.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// 파이프라인 감사 이벤트.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineEvent {
    /// 레벨
    pub level: EventLevel,
    /// 작업 이름 (예: "fetch_symbol", "upsert_bars")
    pub operation: String,
    /// 사람이 읽는 메시지
    pub message: String,
    /// 구조화 필드
    pub fields: Map<String, Value>,
    /// 발생 시각
    pub timestamp: DateTime<Utc>,
}

impl PipelineEvent {
    /// 새 이벤트를 생성합니다.
    pub fn new(level: EventLevel, operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            operation: operation.into(),
            message: message.into(),
            fields: Map::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn info(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Info, operation, message)
    }

    pub fn warn(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Warn, operation, message)
    }

    pub fn error(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Error, operation, message)
    }

    /// 구조화 필드를 추가합니다.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// 필드 값을 조회합니다.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// 감사 이벤트 싱크 trait.
pub trait EventSink: Send + Sync {
    /// 이벤트를 기록합니다.
    fn record(&self, event: PipelineEvent);
}

/// 공유 이벤트 싱크 핸들.
pub type SharedEventSink = Arc<dyn EventSink>;

/// 개별 tracing 필드로 내보내는 이벤트 필드
const PROMOTED_FIELDS: [&str; 9] = [
    "symbol",
    "status",
    "error",
    "error_kind",
    "duration_ms",
    "bars_written",
    "symbol_count",
    "record_count",
    "rows_affected",
];

/// `tracing`으로 이벤트를 내보내는 싱크.
///
/// 자주 쓰는 필드(`symbol`, `error`, `duration_ms` 등)는 개별 tracing 필드로,
/// 나머지는 `extra` 필드에 JSON 문자열로 기록됩니다. JSON 로그 형식에서는
/// 개별 필드가 로그 항목의 최상위 키가 됩니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    /// 공유 핸들로 생성합니다.
    pub fn shared() -> SharedEventSink {
        Arc::new(Self)
    }
}

macro_rules! emit_event {
    ($level:expr, $event:expr, $extra:expr) => {{
        let fields = &$event.fields;
        let text = |key: &str| fields.get(key).and_then(Value::as_str);
        let count = |key: &str| fields.get(key).and_then(Value::as_u64);
        tracing::event!(
            $level,
            operation = $event.operation.as_str(),
            symbol = text("symbol"),
            status = text("status"),
            error = text("error"),
            error_kind = text("error_kind"),
            duration_ms = count("duration_ms"),
            bars_written = count("bars_written"),
            symbol_count = count("symbol_count"),
            record_count = count("record_count"),
            rows_affected = count("rows_affected"),
            extra = $extra,
            "{}",
            $event.message
        )
    }};
}

impl EventSink for TracingEventSink {
    fn record(&self, event: PipelineEvent) {
        let rest: Map<String, Value> = event
            .fields
            .iter()
            .filter(|(key, value)| {
                !PROMOTED_FIELDS.contains(&key.as_str()) || !(value.is_string() || value.is_u64())
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let extra = (!rest.is_empty()).then(|| Value::Object(rest).to_string());
        let extra = extra.as_deref();

        match event.level {
            EventLevel::Debug => emit_event!(tracing::Level::DEBUG, event, extra),
            EventLevel::Info => emit_event!(tracing::Level::INFO, event, extra),
            EventLevel::Warn => emit_event!(tracing::Level::WARN, event, extra),
            EventLevel::Error => emit_event!(tracing::Level::ERROR, event, extra),
        }
    }
}

/// 이벤트를 메모리에 보관하는 싱크.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 기록된 모든 이벤트의 복사본을 반환합니다.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// 특정 작업의 이벤트만 반환합니다.
    pub fn by_operation(&self, operation: &str) -> Vec<PipelineEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.operation == operation)
            .collect()
    }
}

impl EventSink for MemoryEventSink {
    fn record(&self, event: PipelineEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder_fields() {
        let event = PipelineEvent::info("fetch_symbol", "수집 완료")
            .with_field("symbol", "AAPL")
            .with_field("duration_ms", 42u64);

        assert_eq!(event.level, EventLevel::Info);
        assert_eq!(event.field("symbol"), Some(&Value::from("AAPL")));
        assert_eq!(event.field("duration_ms"), Some(&Value::from(42u64)));
    }

    #[test]
    fn test_memory_sink_filters_by_operation() {
        let sink = MemoryEventSink::new();
        sink.record(PipelineEvent::info("batch_fetch", "start"));
        sink.record(PipelineEvent::error("fetch_symbol", "failed"));
        sink.record(PipelineEvent::info("batch_fetch", "done"));

        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.by_operation("batch_fetch").len(), 2);
        assert_eq!(sink.by_operation("fetch_symbol")[0].level, EventLevel::Error);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_tracing_sink_writes_fields_as_top_level_json_keys() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            TracingEventSink.record(
                PipelineEvent::error("fetch_symbol", "Error fetching BADSYM")
                    .with_field("symbol", "BADSYM")
                    .with_field("error_kind", "data_format")
                    .with_field("duration_ms", 42u64)
                    .with_field("channel", "discord"),
            );
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let line: Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(line["level"], "ERROR");
        assert_eq!(line["message"], "Error fetching BADSYM");
        assert_eq!(line["operation"], "fetch_symbol");
        assert_eq!(line["symbol"], "BADSYM");
        assert_eq!(line["error_kind"], "data_format");
        assert_eq!(line["duration_ms"], 42);
        assert!(line.get("bars_written").is_none());
        assert_eq!(line["extra"], r#"{"channel":"discord"}"#);
    }
}
