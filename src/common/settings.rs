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

//! Loading of the JSON settings document.
//!
//! Server entries are validated one by one: an entry with a missing or blank
//! required field is dropped with a warning instead of failing the whole
//! file. Only a document with zero usable servers is rejected.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::common::config::AppConfig;
use crate::error::ConfigError;
use crate::server::info::{ConnectionParams, ServerDescriptor};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ReportSettings {
    /// Target spreadsheet. When absent a new one is created at start-up.
    pub spreadsheet_id: Option<String>,
    /// Title used when a new spreadsheet has to be created.
    pub title: Option<String>,
    pub access_token: Option<String>,
    pub api_base: Option<String>,
}

impl ReportSettings {
    pub fn title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or(AppConfig::DEFAULT_REPORT_TITLE)
    }

    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .filter(|base| !base.trim().is_empty())
            .unwrap_or(AppConfig::SHEETS_API_BASE)
    }

    pub fn spreadsheet_id(&self) -> Option<&str> {
        self.spreadsheet_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub interval_secs: Option<u64>,
    pub report: ReportSettings,
    pub servers: Vec<ServerDescriptor>,
}

#[derive(Deserialize)]
struct RawSettings {
    interval_secs: Option<u64>,
    #[serde(default)]
    report: ReportSettings,
    #[serde(default)]
    servers: Vec<Value>,
}

#[derive(Deserialize)]
struct ServerEntry {
    server_name: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    database_name: Option<String>,
    user_id: Option<String>,
    password: Option<String>,
    total_capacity_bytes: Option<f64>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(format!("missing or blank `{field}`")),
    }
}

impl ServerEntry {
    fn into_descriptor(self) -> Result<ServerDescriptor, String> {
        let name = required(self.server_name, "server_name")?;
        let host = required(self.host, "host")?;
        let port = match self.port {
            Some(port) if port != 0 => port,
            _ => return Err("missing or zero `port`".to_string()),
        };
        let database = required(self.database_name, "database_name")?;
        let user = required(self.user_id, "user_id")?;
        let password = required(self.password, "password")?;

        let mut server = ServerDescriptor::new(
            name.trim(),
            ConnectionParams {
                host,
                port,
                database,
                user,
                password,
            },
        );

        match self.total_capacity_bytes {
            Some(bytes) if bytes.is_finite() && bytes >= 0.0 => {
                server.total_capacity_bytes = Some(bytes);
            }
            Some(bytes) => {
                tracing::warn!(
                    server = %server.name,
                    "Ignoring invalid total_capacity_bytes {bytes}; free space will be reported as unknown"
                );
            }
            None => {}
        }

        Ok(server)
    }
}

/// Validate raw server entries, keeping the input order. Invalid entries and
/// repeated names are dropped with a warning.
fn collect_servers(entries: Vec<Value>) -> Vec<ServerDescriptor> {
    let mut seen = HashSet::new();
    let mut servers = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let parsed = serde_json::from_value::<ServerEntry>(entry)
            .map_err(|e| e.to_string())
            .and_then(ServerEntry::into_descriptor);

        match parsed {
            Ok(server) => {
                if !seen.insert(server.name.clone()) {
                    tracing::warn!(
                        server = %server.name,
                        "Dropping server entry #{index}: duplicate server name"
                    );
                    continue;
                }
                servers.push(server);
            }
            Err(reason) => {
                tracing::warn!("Dropping server entry #{index}: {reason}");
            }
        }
    }

    servers
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawSettings = serde_json::from_str(text)?;
        let servers = collect_servers(raw.servers);
        if servers.is_empty() {
            return Err(ConfigError::NoServers);
        }

        if raw.interval_secs == Some(0) {
            return Err(ConfigError::Invalid {
                key: "interval_secs",
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            interval_secs: raw.interval_secs,
            report: raw.report,
            servers,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Bearer token for the report backend: the environment wins over the file.
    pub fn resolve_token(&self, from_env: Option<String>) -> Result<String, ConfigError> {
        from_env
            .or_else(|| {
                self.report
                    .access_token
                    .as_ref()
                    .map(|token| token.trim().to_string())
            })
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::Missing("report.access_token"))
    }
}
