//! Logging setup for the server binary

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose events are shown without any `RUST_LOG`
const LOGGED_CRATES: [&str; 2] = ["artifact_publisher_mcp", "publisher_config"];

/// How log lines are rendered on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// `LOG_FORMAT=json` selects JSON lines; anything else is plain text
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// `RUST_LOG` plus our crates at info, or debug when `debug` is set
pub fn log_filter(debug: bool) -> anyhow::Result<EnvFilter> {
    let level = if debug { "debug" } else { "info" };
    LOGGED_CRATES
        .iter()
        .try_fold(EnvFilter::from_default_env(), |filter, krate| {
            Ok(filter.add_directive(format!("{krate}={level}").parse()?))
        })
}

/// Log to stderr; stdout carries the MCP protocol
pub fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let format = LogFormat::from_env();
    let json = (format == LogFormat::Json)
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text = (format == LogFormat::Text)
        .then(|| fmt::layer().with_writer(std::io::stderr).with_ansi(false));

    tracing_subscriber::registry()
        .with(log_filter(debug)?)
        .with(json)
        .with(text)
        .try_init()?;
    Ok(())
}
