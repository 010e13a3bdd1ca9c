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

pub mod postgres;

use async_trait::async_trait;

use crate::common::config::AppConfig;
use crate::error::ProbeError;
use crate::server::info::{ConnectionParams, MeasuredSize, ServerDescriptor};

pub use postgres::PostgresDriver;

/// Low-level database capability used by [`DriverProbe`].
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    type Handle: Send;

    /// Open a dedicated connection.
    async fn open(&self, params: &ConnectionParams) -> Result<Self::Handle, ProbeError>;

    /// Run a query returning a single integer, binding `database` as `$1`.
    async fn scalar_query(
        &self,
        handle: &mut Self::Handle,
        query: &str,
        database: &str,
    ) -> Result<Option<i64>, ProbeError>;

    /// Release the connection.
    async fn close(&self, handle: Self::Handle) -> Result<(), ProbeError>;
}

/// Measures the current data size of a server.
///
/// Implementations never fail: any problem is logged and reported as
/// [`MeasuredSize::Unknown`] so one unreachable server cannot abort a cycle.
#[async_trait]
pub trait SizeProbe: Send + Sync {
    async fn measure(&self, server: &ServerDescriptor) -> MeasuredSize;
}

/// [`SizeProbe`] issuing one size query per measurement over a scoped
/// connection.
pub struct DriverProbe<D> {
    driver: D,
}

impl<D: DatabaseDriver> DriverProbe<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

#[async_trait]
impl<D: DatabaseDriver> SizeProbe for DriverProbe<D> {
    async fn measure(&self, server: &ServerDescriptor) -> MeasuredSize {
        let mut handle = match self.driver.open(&server.connection).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(server = %server.name, op = "open", "{e}");
                return MeasuredSize::Unknown;
            }
        };

        let result = self
            .driver
            .scalar_query(&mut handle, AppConfig::SIZE_QUERY, server.database_name())
            .await;

        // The connection is released before the result is inspected.
        if let Err(e) = self.driver.close(handle).await {
            tracing::warn!(server = %server.name, op = "close", "{e}");
        }

        match result {
            Ok(Some(bytes)) if bytes >= 0 => MeasuredSize::from_bytes(bytes as f64),
            Ok(other) => {
                tracing::error!(
                    server = %server.name,
                    op = "scalar_query",
                    "Unexpected size value {other:?}"
                );
                MeasuredSize::Unknown
            }
            Err(e) => {
                tracing::error!(server = %server.name, op = "scalar_query", "{e}");
                MeasuredSize::Unknown
            }
        }
    }
}

/// Refresh the measured size of every server in place, one after another.
pub async fn measure_all<P: SizeProbe + ?Sized>(probe: &P, servers: &mut [ServerDescriptor]) {
    for server in servers.iter_mut() {
        server.size = probe.measure(server).await;
        match server.size {
            MeasuredSize::Known(gb) => {
                tracing::info!(server = %server.name, "Measured {gb:.3} GB");
            }
            MeasuredSize::Unknown => {
                tracing::warn!(server = %server.name, "Size unknown for this cycle");
            }
        }
    }
}
