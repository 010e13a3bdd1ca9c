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

pub struct AppConfig;

impl AppConfig {
    // Scheduling
    pub const DEFAULT_INTERVAL_SECS: u64 = 3600;
    pub const MIN_INTERVAL_SECS: u64 = 1;

    // Measurement
    pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
    pub const DB_CONNECT_TIMEOUT_SECS: u64 = 10;
    pub const SIZE_QUERY: &'static str = "select pg_database_size($1)";

    // Report backend (Google Sheets v4)
    pub const SHEETS_API_BASE: &'static str = "https://sheets.googleapis.com/v4";
    pub const DEFAULT_REPORT_TITLE: &'static str = "Database sizes";
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;
    pub const POOL_IDLE_TIMEOUT_SECS: u64 = 60;
    pub const TCP_KEEPALIVE_SECS: u64 = 30;

    // Report layout
    pub const PLACEHOLDER_TABLE_TITLES: [&'static str; 2] = ["Лист1", "Sheet1"];
    pub const FIRST_COLUMN: char = 'A';
    pub const LAST_COLUMN: char = 'D';
    pub const DATE_FORMAT: &'static str = "%d.%m.%Y";
    pub const UNKNOWN_MARKER: &'static str = "unknown";
    pub const FREE_MARKER: &'static str = "free";
    pub const HEADER_TITLES: [&'static str; 4] = ["Server", "Database", "Size, GB", "Updated"];

    // Files and environment
    pub const DEFAULT_CONFIG_PATH: &'static str = "dbsize-report.json";
    pub const TOKEN_ENV_VAR: &'static str = "DBSIZE_SHEETS_TOKEN";
    pub const DEFAULT_LOG_FILTER: &'static str = "dbsize_report=info";
    pub const DEFAULT_LOG_DIR: &'static str = "logs";
    pub const LOG_FILE_PREFIX: &'static str = "dbsize-report";
    pub const LOG_FILE_SUFFIX: &'static str = "log";
}

pub struct EnvConfig;

impl EnvConfig {
    /// Resolve the cycle interval: CLI override first, then the file value,
    /// then the built-in default. Never shorter than one second.
    pub fn cycle_interval_secs(cli: Option<u64>, file: Option<u64>) -> u64 {
        cli.or(file)
            .unwrap_or(AppConfig::DEFAULT_INTERVAL_SECS)
            .max(AppConfig::MIN_INTERVAL_SECS)
    }

    /// Bearer token from the environment, ignoring blank values.
    pub fn sheets_token() -> Option<String> {
        std::env::var(AppConfig::TOKEN_ENV_VAR)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    pub fn bytes_to_gb(bytes: f64) -> f64 {
        bytes / AppConfig::BYTES_PER_GB
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_interval_precedence() {
        assert_eq!(EnvConfig::cycle_interval_secs(Some(5), Some(60)), 5);
        assert_eq!(EnvConfig::cycle_interval_secs(None, Some(60)), 60);
        assert_eq!(
            EnvConfig::cycle_interval_secs(None, None),
            AppConfig::DEFAULT_INTERVAL_SECS
        );
    }

    #[test]
    fn test_cycle_interval_never_zero() {
        assert_eq!(EnvConfig::cycle_interval_secs(Some(0), None), 1);
    }

    #[test]
    fn test_bytes_to_gb() {
        assert_eq!(EnvConfig::bytes_to_gb(1024.0 * 1024.0 * 1024.0), 1.0);
        assert_eq!(EnvConfig::bytes_to_gb(0.0), 0.0);
    }
}
