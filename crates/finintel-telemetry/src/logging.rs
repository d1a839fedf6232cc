//! Structured logging initialization.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Deserialize;
use tracing::Level;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

use crate::audit::SECURITY_AUDIT_TARGET;
use crate::error::{TelemetryError, TelemetryResult};

const DEFAULT_FILTER: &str = "info,finintel=debug";

pub const GENERAL_LOG_FILE: &str = "gateway.log";
pub const SECURITY_LOG_FILE: &str = "security-audit.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging options from the `[telemetry]` config section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the JSON log files. Console only when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn is_production() -> bool {
    std::env::var("RUST_ENV")
        .map(|v| v == "production")
        .unwrap_or(false)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn open_append(path: &Path) -> TelemetryResult<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| TelemetryError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Initialize structured logging.
///
/// Console output is JSON in production and pretty otherwise. With a
/// `log_dir`, every event is also appended as JSON to `gateway.log`, and
/// security-audit events are appended to `security-audit.log`.
pub fn init_logging(config: &LoggingConfig) -> TelemetryResult<()> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console: BoxedLayer = if is_production() {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(env_filter())
            .boxed()
    } else {
        fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_names(true)
            .with_filter(env_filter())
            .boxed()
    };
    layers.push(console);

    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)?;

        let general = open_append(&dir.join(GENERAL_LOG_FILE))?;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(Mutex::new(general))
                .with_filter(env_filter())
                .boxed(),
        );

        let security = open_append(&dir.join(SECURITY_LOG_FILE))?;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(Mutex::new(security))
                .with_filter(Targets::new().with_target(SECURITY_AUDIT_TARGET, Level::TRACE))
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
