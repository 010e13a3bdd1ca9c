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

use std::fmt;

use crate::common::config::EnvConfig;

/// Everything needed to open a connection to one monitored database.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

// Keeps the password out of logs.
impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Data size of a database in gigabytes.
///
/// A failed measurement is `Unknown` and is never coerced to zero. Non-finite
/// inputs are normalised to `Unknown` as well.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MeasuredSize {
    Known(f64),
    #[default]
    Unknown,
}

impl MeasuredSize {
    pub fn from_gb(gb: f64) -> Self {
        if gb.is_finite() {
            Self::Known(gb)
        } else {
            Self::Unknown
        }
    }

    pub fn from_bytes(bytes: f64) -> Self {
        Self::from_gb(EnvConfig::bytes_to_gb(bytes))
    }

    pub fn gigabytes(&self) -> Option<f64> {
        match self {
            Self::Known(gb) => Some(*gb),
            Self::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

/// One monitored server. `name` is the unique key and the title of its table
/// in the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerDescriptor {
    pub name: String,
    pub connection: ConnectionParams,
    pub total_capacity_bytes: Option<f64>,
    pub size: MeasuredSize,
}

impl ServerDescriptor {
    pub fn new(name: impl Into<String>, connection: ConnectionParams) -> Self {
        Self {
            name: name.into(),
            connection,
            total_capacity_bytes: None,
            size: MeasuredSize::Unknown,
        }
    }

    pub fn with_capacity_bytes(mut self, bytes: f64) -> Self {
        self.total_capacity_bytes = Some(bytes);
        self
    }

    pub fn database_name(&self) -> &str {
        &self.connection.database
    }

    pub fn capacity_gb(&self) -> Option<f64> {
        self.total_capacity_bytes
            .filter(|bytes| bytes.is_finite())
            .map(EnvConfig::bytes_to_gb)
    }

    /// Capacity left on the server, in gigabytes. `None` when either the
    /// capacity or the measured size is unavailable.
    pub fn remaining_gb(&self) -> Option<f64> {
        let used = self.size.gigabytes()?;
        let total = self.capacity_gb()?;
        Some(total - used)
    }
}
