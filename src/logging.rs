//! File logging.
//!
//! The panel owns the terminal, so tracing output goes to
//! `<state dir>/hypr-quicksettings/quicksettings.log`. The previous session's
//! log is kept as `quicksettings.log.1`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt};

const LOG_FILE: &str = "quicksettings.log";

pub fn log_dir() -> Result<PathBuf> {
    let base = dirs::state_dir()
        .or_else(dirs::cache_dir)
        .context("Could not find a state or cache directory")?;
    Ok(base.join("hypr-quicksettings"))
}

/// Installs the global subscriber writing to `dir`, filtered by `filter`.
pub fn init_logging(dir: &Path, filter: &str) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    rotate_previous(&dir.join(LOG_FILE))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE)
        .build(dir)
        .context("Failed to open log file")?;

    let filter = EnvFilter::try_new(filter)
        .with_context(|| format!("Invalid log filter {filter:?}"))?;

    let subscriber = fmt()
        .with_writer(file_appender)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to install logger: {e}"))?;

    tracing::info!("hypr-quicksettings v{} started", env!("CARGO_PKG_VERSION"));
    Ok(())
}

/// Moves `log_path` to `<log_path>.1`, replacing any older copy.
fn rotate_previous(log_path: &Path) -> Result<()> {
    if !log_path.exists() {
        return Ok(());
    }
    let mut rotated = log_path.as_os_str().to_owned();
    rotated.push(".1");
    fs::rename(log_path, PathBuf::from(rotated)).context("Failed to rotate previous log")?;
    Ok(())
}
