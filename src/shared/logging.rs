use std::fmt::Display;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Lenient parse of `TFDRIFT_LOG_LEVEL`; unknown values fall back to info.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warning,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warning => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Default filter directive for a level: our crate at `level`, HTTP internals quieter.
pub fn default_directive(level: LogLevel) -> String {
    format!("tfdrift={},tower_http={},hyper=warn", level, level)
}

/// Filter directive from `TFDRIFT_LOG_LEVEL`, falling back to `RUST_LOG`,
/// then to info.
pub fn filter_directive(log_level: Option<&str>, rust_log: Option<&str>) -> String {
    match (log_level.filter(|v| !v.trim().is_empty()), rust_log) {
        (Some(level), _) => default_directive(LogLevel::parse(level)),
        (None, Some(directive)) if !directive.trim().is_empty() => directive.to_string(),
        _ => default_directive(LogLevel::Info),
    }
}

/// Install the global subscriber. Logs go to stderr so `check`/`analyze`
/// keep stdout clean for JSON.
pub fn init() {
    let log_level = std::env::var("TFDRIFT_LOG_LEVEL").ok();
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(log_level.as_deref(), rust_log.as_deref());

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_new(&directive)
                .unwrap_or_else(|_| default_directive(LogLevel::Info).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
