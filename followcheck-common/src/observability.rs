//! `tracing` setup for the `followcheck` binary.
//!
//! Events always go to a daily rolling file. Stderr mirroring and JSON output
//! are opt-in. Only the first [`init_logging`] call installs anything.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Utc;
use serde::Deserialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::APP_NAME;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

const LOG_DIR_ENV: &str = "FOLLOWCHECK_LOG_DIR";

/// Output encoding for structured logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// File stem, and the directory name under `~/.local/share`.
    pub app_name: &'static str,
    /// Falls back to `FOLLOWCHECK_LOG_DIR`, then `~/.local/share/<app_name>`.
    pub log_dir: Option<PathBuf>,
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset.
    pub default_filter: String,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: APP_NAME,
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

/// Install the global subscriber and return today's log file path.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let stem = format!("{}.log", config.app_name);
    let path = dir.join(format!("{stem}.{}", Utc::now().format("%Y-%m-%d")));

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &stem));
    let _ = LOG_GUARD.set(guard);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    tracing_subscriber::registry()
        .with(sinks(config.format, config.emit_stderr, writer))
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let _ = LOG_PATH.set(path.clone());
    Ok(path)
}

fn sinks(format: LogFormat, emit_stderr: bool, file: NonBlocking) -> Vec<BoxedLayer> {
    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
    match format {
        LogFormat::Text => {
            layers.push(fmt::layer().with_writer(file).with_ansi(false).boxed());
            if emit_stderr {
                layers.push(fmt::layer().with_writer(std::io::stderr).boxed());
            }
        }
        LogFormat::Json => {
            layers.push(fmt::layer().json().with_writer(file).boxed());
            if emit_stderr {
                layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
            }
        }
    }
    layers
}

fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return expand_home(dir);
    }

    if let Ok(env_dir) = std::env::var(LOG_DIR_ENV) {
        return expand_home(Path::new(&env_dir));
    }

    default_data_dir(app_name)
}

fn expand_home(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

fn default_data_dir(app_name: &str) -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(app_name)
    } else {
        PathBuf::from(".").join(app_name)
    }
}
