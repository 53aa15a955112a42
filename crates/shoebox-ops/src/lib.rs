//! Operational helpers: logging setup, output bootstrap, run accounting.

use std::{fmt, path::PathBuf};

use shoebox_types::{config::OpsConfig, Result, ShoeboxError};
use tracing::info;
use tracing_subscriber::{fmt as subscriber_fmt, EnvFilter};

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| ShoeboxError::Ops(format!("failed to create log filter: {err}")))?;

    subscriber_fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| ShoeboxError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}

pub fn ensure_output_dir(path: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(path);
    std::fs::create_dir_all(&dir)
        .map_err(|err| ShoeboxError::Ops(format!("failed to create output dir: {err}")))?;
    info!("Output directory ready at {:?}", dir);
    Ok(dir)
}

/// Per-run accounting for the dispatcher. One instance per processing run.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub resolved: u64,
    pub transferred: u64,
    pub skipped: u64,
    pub failures: Vec<String>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_resolved(&mut self) {
        self.resolved += 1;
    }

    pub fn record_transferred(&mut self) {
        self.transferred += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn record_failure(&mut self, detail: impl Into<String>) {
        self.failures.push(detail.into());
    }

    pub fn failed(&self) -> u64 {
        self.failures.len() as u64
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} resolved, {} transferred, {} skipped, {} failed",
            self.resolved,
            self.transferred,
            self.skipped,
            self.failed()
        )
    }
}
