//! tracing 기반 로깅 초기화.
//!
//! 레벨과 형식은 `RUST_LOG` / `LOG_FORMAT` 환경 변수에서 읽고,
//! CLI 플래그가 주어지면 그 값이 우선합니다. 로그는 표준 에러로 출력되어
//! 표준 출력의 JSON 요약과 섞이지 않습니다.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 사람이 읽기 쉬운 여러 줄 형식
    #[default]
    Pretty,
    /// 로그 수집용 JSON
    Json,
    /// 한 줄 형식
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` 지시문 (예: "info", "perf_collector=debug")
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl LogConfig {
    /// 프로세스 환경 변수에서 설정을 읽습니다.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 조회 함수로 설정을 읽습니다.
    ///
    /// 비어 있거나 알 수 없는 `LOG_FORMAT`은 기본 형식으로 처리합니다.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let level = lookup("RUST_LOG")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.level);
        let format = lookup("LOG_FORMAT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.format);

        Self { level, format }
    }

    /// 로더 크레이트들에 한정한 레벨 지시문으로 덮어씁니다.
    ///
    /// `None`이면 기존 값(환경 변수)을 유지합니다.
    pub fn override_level(mut self, level: Option<&str>, crates: &[&str]) -> Self {
        if let Some(level) = level {
            self.level = crates
                .iter()
                .map(|krate| format!("{krate}={level}"))
                .collect::<Vec<_>>()
                .join(",");
        }
        self
    }

    pub fn override_format(mut self, format: Option<LogFormat>) -> Self {
        if let Some(format) = format {
            self.format = format;
        }
        self
    }
}

/// 로깅 시스템을 초기화합니다.
///
/// # 예제
///
/// ```no_run
/// use perf_core::logging::{init_logging, LogConfig, LogFormat};
///
/// let config = LogConfig::from_env().override_format(Some(LogFormat::Json));
/// init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_new(&config.level)?;

    let fmt_layer = match config.format {
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()?;

    tracing::debug!(format = ?config.format, level = %config.level, "로깅 초기화 완료");
    Ok(())
}
