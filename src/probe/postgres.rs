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

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection};

use super::DatabaseDriver;
use crate::common::config::AppConfig;
use crate::error::ProbeError;
use crate::server::info::ConnectionParams;

/// PostgreSQL driver. Every measurement gets its own connection; nothing is
/// pooled across the sleep interval.
pub struct PostgresDriver {
    timeout: Duration,
}

impl PostgresDriver {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(AppConfig::DB_CONNECT_TIMEOUT_SECS),
        }
    }

    fn connect_options(params: &ConnectionParams) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .database(&params.database)
            .username(&params.user)
            .password(&params.password)
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    type Handle = PgConnection;

    async fn open(&self, params: &ConnectionParams) -> Result<PgConnection, ProbeError> {
        let options = Self::connect_options(params);
        match tokio::time::timeout(self.timeout, options.connect()).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(ProbeError::Connect(e.to_string())),
            Err(_) => Err(ProbeError::Connect(format!(
                "timed out after {}s connecting to {}:{}",
                self.timeout.as_secs(),
                params.host,
                params.port
            ))),
        }
    }

    async fn scalar_query(
        &self,
        handle: &mut PgConnection,
        query: &str,
        database: &str,
    ) -> Result<Option<i64>, ProbeError> {
        let fetch = sqlx::query_scalar::<_, Option<i64>>(query)
            .bind(database)
            .fetch_one(&mut *handle);
        match tokio::time::timeout(self.timeout, fetch).await {
            Ok(result) => result.map_err(|e| ProbeError::Query(e.to_string())),
            Err(_) => Err(ProbeError::Query(format!(
                "timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }

    async fn close(&self, handle: PgConnection) -> Result<(), ProbeError> {
        handle
            .close()
            .await
            .map_err(|e| ProbeError::Close(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresDriver>();
    }

    #[test]
    fn test_default_timeout() {
        let driver = PostgresDriver::default();
        assert_eq!(
            driver.timeout,
            Duration::from_secs(AppConfig::DB_CONNECT_TIMEOUT_SECS)
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_reports_connect_error() {
        let driver = PostgresDriver {
            timeout: Duration::from_millis(500),
        };
        let params = ConnectionParams {
            host: "127.0.0.1".to_string(),
            port: 1,
            database: "app".to_string(),
            user: "monitor".to_string(),
            password: "pw".to_string(),
        };
        let err = driver.open(&params).await.unwrap_err();
        assert!(matches!(err, ProbeError::Connect(_)));
    }
}
