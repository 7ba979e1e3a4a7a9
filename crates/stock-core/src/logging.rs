//! tracing 기반 로깅 초기화.
//!
//! 수집기 바이너리는 시작 시 한 번 호출합니다. 파이프라인 컴포넌트는 이 전역
//! 구독자에 직접 의존하지 않고 주입된 [`EventSink`](crate::EventSink)로 이벤트를 남기며,
//! [`TracingEventSink`](crate::TracingEventSink)가 이 구독자로 전달합니다.
//!
//! 콘솔 출력 형식: `pretty` (개발), `json` (로그 집계), `compact` (한 줄).
//! `LOG_DIR`이 설정되면 같은 이벤트를 `{LOG_DIR}/collector.log`에 JSON 한 줄씩 추가로 기록합니다.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// 로그 파일 이름
pub const LOG_FILE_NAME: &str = "collector.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 파이프라인 crate 목록 (레벨 지시자 생성용)
const PIPELINE_TARGETS: [&str; 4] = [
    "stock_collector",
    "stock_data",
    "stock_core",
    "stock_notification",
];

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
            Self::Compact => "compact",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(format!("Unknown log format: {other}")),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `EnvFilter` 지시자 (예: "info", "stock_data=debug")
    pub level: String,
    pub format: LogFormat,
    /// span 진입/종료 이벤트 출력
    pub span_events: bool,
    /// 파일명과 줄 번호 출력
    pub source_location: bool,
    pub thread_ids: bool,
    /// JSON 로그 파일 디렉터리 (없으면 콘솔만)
    pub log_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            span_events: false,
            source_location: true,
            thread_ids: false,
            log_dir: None,
        }
    }
}

impl LogConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    /// 파이프라인 crate에만 `level`을 적용하는 설정.
    ///
    /// 의존 crate(sqlx, reqwest 등)의 로그는 기본 필터에서 제외됩니다.
    pub fn for_pipeline(level: &str) -> Self {
        let directives: Vec<String> = PIPELINE_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect();
        Self::new(directives.join(","))
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_source_location(mut self, enabled: bool) -> Self {
        self.source_location = enabled;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// `RUST_LOG`, `LOG_FORMAT`, `LOG_DIR` 환경 변수로 설정을 만듭니다.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로 설정을 만듭니다. 알 수 없는 형식은 `pretty`로 대체합니다.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = lookup("LOG_FORMAT")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        Self {
            level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            format,
            log_dir: lookup("LOG_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            ..Default::default()
        }
    }

    fn fmt_span(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    fn output_layer(&self) -> BoxedLayer {
        let layer = fmt::layer()
            .with_file(self.source_location)
            .with_line_number(self.source_location)
            .with_thread_ids(self.thread_ids)
            .with_span_events(self.fmt_span());

        match self.format {
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Json => layer.json().flatten_event(true).boxed(),
            LogFormat::Compact => layer.compact().boxed(),
        }
    }
}

/// 파일에 JSON 한 줄씩 기록하는 layer.
///
/// 이벤트 필드는 항목의 최상위 키로 합쳐집니다.
fn json_file_layer<W>(writer: W) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(writer)
        .boxed()
}

/// 로그 파일 writer를 유지하는 guard.
///
/// drop되면 남은 로그를 파일에 flush하므로 프로세스가 끝날 때까지 보관해야 합니다.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug, Default)]
pub struct LoggingGuard {
    file: Option<WorkerGuard>,
}

impl LoggingGuard {
    /// 파일 로그가 활성화되었는지 여부
    pub fn has_file_output(&self) -> bool {
        self.file.is_some()
    }
}

fn file_output(
    dir: &Path,
) -> Result<(BoxedLayer, WorkerGuard), Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(dir)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    Ok((json_file_layer(writer), guard))
}

/// 전역 tracing 구독자를 설치합니다.
///
/// `RUST_LOG`가 설정되어 있으면 `config.level`보다 우선합니다.
/// 이미 구독자가 설치된 경우 오류를 반환합니다.
///
/// ```no_run
/// use stock_core::logging::{init_logging, LogConfig, LogFormat};
///
/// let _guard = init_logging(
///     LogConfig::for_pipeline("debug")
///         .with_format(LogFormat::Json)
///         .with_log_dir("logs/collector"),
/// )?;
/// # Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
/// ```
pub fn init_logging(
    config: LogConfig,
) -> Result<LoggingGuard, Box<dyn std::error::Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let mut layers = vec![config.output_layer()];
    let mut guard = LoggingGuard::default();
    if let Some(dir) = &config.log_dir {
        let (layer, file_guard) = file_output(dir)?;
        layers.push(layer);
        guard.file = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;

    tracing::debug!(
        format = config.format.as_str(),
        level = %config.level,
        log_dir = ?config.log_dir,
        "로깅 초기화 완료"
    );
    Ok(guard)
}

/// 심볼 필드가 붙은 info span을 만듭니다.
///
/// 심볼 작업 안에서 발생하는 모든 로그에 `symbol` 필드가 포함됩니다.
#[macro_export]
macro_rules! symbol_span {
    ($name:expr, $symbol:expr) => {
        tracing::info_span!($name, symbol = %$symbol)
    };
    ($name:expr, $symbol:expr, $attempt:expr) => {
        tracing::info_span!($name, symbol = %$symbol, attempt = $attempt)
    };
}
