// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Console and rolling-file log output.
//!
//! Every event goes to stdout and, when a log directory is available, to a
//! daily rolled file in that directory written without ANSI colors.

use std::path::Path;

use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::common::config::AppConfig;
use crate::error::ConfigError;

pub type FileLayer<S> = fmt::Layer<S, DefaultFields, Format, NonBlocking>;

fn log_dir_error(dir: &Path, message: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        key: "log_dir",
        message: format!("{}: {message}", dir.display()),
    }
}

/// Open the rolling log file under `dir`, creating the directory if needed.
///
/// The returned guard flushes buffered lines when dropped and must be kept
/// alive for as long as logging is wanted.
pub fn file_writer(dir: &Path) -> Result<(NonBlocking, WorkerGuard), ConfigError> {
    std::fs::create_dir_all(dir).map_err(|e| log_dir_error(dir, e))?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(AppConfig::LOG_FILE_PREFIX)
        .filename_suffix(AppConfig::LOG_FILE_SUFFIX)
        .build(dir)
        .map_err(|e| log_dir_error(dir, e))?;
    Ok(tracing_appender::non_blocking(appender))
}

pub fn file_layer<S>(writer: NonBlocking) -> FileLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer().with_ansi(false).with_writer(writer)
}

/// Install the global subscriber. Falls back to console-only output when the
/// log file cannot be opened.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let (writer, guard, failure) = match log_dir.map(file_writer) {
        Some(Ok((writer, guard))) => (Some(writer), Some(guard), None),
        Some(Err(e)) => (None, None, Some(e)),
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| AppConfig::DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(writer.map(file_layer))
        .init();

    match (failure, log_dir) {
        (Some(e), _) => tracing::warn!("File logging disabled: {e}"),
        (None, Some(dir)) => tracing::debug!("Logging to {}", dir.display()),
        (None, None) => {}
    }
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_logs(dir: &Path) -> String {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
            .collect()
    }

    #[test]
    fn test_error_event_reaches_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let (writer, guard) = file_writer(dir.path()).unwrap();
        let subscriber = tracing_subscriber::registry().with(file_layer(writer));

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(server = "Server1", op = "write_cells", "HTTP 503: backend unavailable");
        });
        drop(guard);

        let text = read_logs(dir.path());
        assert!(text.contains("ERROR"));
        assert!(text.contains("server=\"Server1\""));
        assert!(text.contains("op=\"write_cells\""));
        assert!(text.contains("HTTP 503: backend unavailable"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_log_file_named_after_crate() {
        let dir = tempfile::tempdir().unwrap();
        let (_writer, guard) = file_writer(dir.path()).unwrap();
        drop(guard);

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("dbsize-report."));
        assert!(names[0].ends_with(".log"));
    }

    #[test]
    fn test_missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("var").join("log");
        let (_writer, guard) = file_writer(&nested).unwrap();
        drop(guard);
        assert!(nested.is_dir());
    }

    #[test]
    fn test_unusable_directory_is_config_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = file_writer(&file.path().join("logs"));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "log_dir", .. })
        ));
    }
}
