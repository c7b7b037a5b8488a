//! Logging setup.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log file path {0}")]
    InvalidPath(PathBuf),

    #[error("failed to open log file {path}: {source}")]
    File { path: PathBuf, source: InitError },

    #[error("failed to install subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Setup logging with the given level.
///
/// `RUST_LOG` takes precedence over `level`. When `file` is set, events are
/// also written there through a non-blocking writer; keep the returned guard
/// alive until exit so buffered lines are flushed.
pub fn setup_logging(
    level: &str,
    json: bool,
    file: Option<&Path>,
) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match file {
        Some(path) => {
            let appender = file_appender(path)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if json {
        registry.with(fmt::layer().json()).try_init()?;
    } else {
        registry.with(fmt::layer().pretty()).try_init()?;
    }

    Ok(guard)
}

fn split_path(path: &Path) -> Result<(&Path, &str), LoggingError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LoggingError::InvalidPath(path.to_path_buf()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    Ok((dir, name))
}

fn file_appender(path: &Path) -> Result<RollingFileAppender, LoggingError> {
    let (dir, name) = split_path(path)?;
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .map_err(|source| LoggingError::File {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path() {
        let (dir, name) = split_path(Path::new("logs/run.log")).unwrap();
        assert_eq!(dir, Path::new("logs"));
        assert_eq!(name, "run.log");

        let (dir, _) = split_path(Path::new("run.log")).unwrap();
        assert_eq!(dir, Path::new("."));

        assert!(matches!(
            split_path(Path::new("/")),
            Err(LoggingError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_file_appender_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backtest.log");

        file_appender(&path).unwrap();
        assert!(path.exists());
    }
}
