use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Where diagnostic records go.
pub enum LogTarget<'a> {
    /// Text and JSON modes.
    Stderr,
    /// TUI mode; the alternate screen owns stdout/stderr.
    File(Option<&'a Path>),
}

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn default_log_file() -> Result<PathBuf> {
    Ok(crate::storage::app_dir()?.join("query-submit.log"))
}

/// Install the global subscriber. `RUST_LOG` overrides the default level.
pub fn init(target: LogTarget<'_>) -> Result<()> {
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter("warn"))
                .with_writer(std::io::stderr)
                .init();
        }
        LogTarget::File(path) => {
            let path = match path {
                Some(p) => p.to_path_buf(),
                None => default_log_file()?,
            };
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter("info"))
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
    }
    Ok(())
}
