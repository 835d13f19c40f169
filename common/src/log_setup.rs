use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where and how a tracking run logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset, e.g. `"info,segtrack=debug"`.
    pub base_level: String,
    pub directory: PathBuf,
    pub file_prefix: String,
    /// Daily files kept before the oldest is removed.
    pub max_files: usize,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: "info".to_string(),
            directory: PathBuf::from("logs"),
            file_prefix: "segtrack".to_string(),
            max_files: 5,
            ansi: true,
        }
    }
}

impl LogConfig {
    pub fn with_level(base_level: impl Into<String>) -> Self {
        Self {
            base_level: base_level.into(),
            ..Self::default()
        }
    }

    fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.base_level))
            .with_context(|| format!("invalid log filter {:?}", self.base_level))
    }

    fn file_appender(&self) -> anyhow::Result<RollingFileAppender> {
        std::fs::create_dir_all(&self.directory)
            .with_context(|| format!("failed to create {}", self.directory.display()))?;
        tracing_appender::rolling::Builder::new()
            .rotation(tracing_appender::rolling::Rotation::DAILY)
            .filename_prefix(&self.file_prefix)
            .filename_suffix("log")
            .max_log_files(self.max_files.max(1))
            .build(&self.directory)
            .context("failed to create log file appender")
    }
}

/// Console + rolling file logging for drivers (trackers, segmentation runs).
///
/// `RUST_LOG` wins over `config.base_level`. WARN and above also go to
/// stderr. Fails when logging was already initialized.
pub fn setup_logging(config: &LogConfig) -> anyhow::Result<()> {
    let env_filter = config.env_filter()?;
    let (file_writer, guard) = tracing_appender::non_blocking(config.file_appender()?);
    LOG_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("logging already initialized"))?;

    let console_writer = std::io::stdout.and(std::io::stderr.with_min_level(Level::WARN));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_ansi(config.ansi)
        .with_writer(console_writer);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("logger initialization failed")
}

/// Captured-output subscriber for unit tests. Safe to call from every test.
pub fn init_test_logging() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        // another harness may already own the global subscriber
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_test_writer()
            .try_init();
    });
}
