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

//! Unified error types for the dbsize-report library.
//!
//! Every external call (database, report backend) fails into one of the
//! concern-specific enums below. Components catch these at their origin,
//! log them and degrade to a sentinel value, so only [`enum@Error`] ever
//! reaches `main`, and only before the first cycle starts.

use thiserror::Error;

/// Failure while talking to a report backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The addressed report or table does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failure injected by a test backend.
    #[error("Injected failure: {0}")]
    Injected(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Failure while measuring a database.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Size query failed: {0}")]
    Query(String),

    #[error("Failed to close connection: {0}")]
    Close(String),
}

/// Failure of the table catalog to obtain the list of tables.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to list tables: {0}")]
    List(#[source] BackendError),
}

/// Invalid or unusable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No valid server entries in configuration")]
    NoServers,

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Top-level error for the fatal start-up path.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Report backend unavailable: {0}")]
    Backend(#[from] BackendError),
}

/// A specialized Result type for dbsize-report start-up operations.
pub type Result<T> = std::result::Result<T, Error>;
