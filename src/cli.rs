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

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::common::config::AppConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = AppConfig::DEFAULT_CONFIG_PATH)]
    pub config: String,
    /// Seconds between cycles. Overrides `interval_secs` from the configuration.
    #[arg(short, long)]
    pub interval: Option<u64>,
    /// Run a single cycle and exit.
    #[arg(long)]
    pub once: bool,
    /// Directory for the rolling log file.
    #[arg(long, default_value = AppConfig::DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,
    /// Log to the console only.
    #[arg(long, conflicts_with = "log_dir")]
    pub no_log_file: bool,
}

impl Cli {
    /// Log directory to use, if file logging is enabled.
    pub fn log_dir(&self) -> Option<&Path> {
        (!self.no_log_file).then_some(self.log_dir.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["dbsize-report"]);
        assert_eq!(cli.config, "dbsize-report.json");
        assert_eq!(cli.interval, None);
        assert!(!cli.once);
        assert_eq!(cli.log_dir(), Some(Path::new("logs")));
    }

    #[test]
    fn test_log_dir_options() {
        let cli = Cli::parse_from(["dbsize-report", "--log-dir", "/var/log/dbsize"]);
        assert_eq!(cli.log_dir(), Some(Path::new("/var/log/dbsize")));

        let cli = Cli::parse_from(["dbsize-report", "--no-log-file"]);
        assert_eq!(cli.log_dir(), None);

        assert!(Cli::try_parse_from([
            "dbsize-report",
            "--no-log-file",
            "--log-dir",
            "/tmp/x"
        ])
        .is_err());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "dbsize-report",
            "--config",
            "/etc/dbsize.json",
            "-i",
            "600",
            "--once",
        ]);
        assert_eq!(cli.config, "/etc/dbsize.json");
        assert_eq!(cli.interval, Some(600));
        assert!(cli.once);
    }

    #[test]
    fn test_rejects_non_numeric_interval() {
        assert!(Cli::try_parse_from(["dbsize-report", "--interval", "soon"]).is_err());
    }
}
