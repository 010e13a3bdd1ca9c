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
use std::sync::Arc;

use chrono::NaiveDate;

use super::backend::{ReportBackend, TableInfo};
use crate::common::config::AppConfig;
use crate::server::info::ServerDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Fixed column titles.
    Header,
    /// One snapshot of the measured database size.
    Data,
    /// Remaining capacity on the server.
    Footer,
}

impl RowKind {
    fn operation(&self) -> &'static str {
        match self {
            Self::Header => "write_header_row",
            Self::Data => "write_data_row",
            Self::Footer => "write_footer_row",
        }
    }
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "header"),
            Self::Data => write!(f, "data"),
            Self::Footer => write!(f, "footer"),
        }
    }
}

/// Gigabytes rounded to one decimal with a `.` separator, or the unknown
/// marker.
pub fn format_gb(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => {
            let rounded = (v * 10.0).round() / 10.0;
            // Avoid printing "-0.0".
            let rounded = if rounded == 0.0 { 0.0 } else { rounded };
            format!("{rounded:.1}")
        }
        None => AppConfig::UNKNOWN_MARKER.to_string(),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(AppConfig::DATE_FORMAT).to_string()
}

/// Cell contents of a row, columns A..D.
pub fn row_cells(kind: RowKind, server: &ServerDescriptor, date: NaiveDate) -> Vec<String> {
    match kind {
        RowKind::Header => AppConfig::HEADER_TITLES
            .iter()
            .map(|title| title.to_string())
            .collect(),
        RowKind::Data => vec![
            server.name.clone(),
            server.database_name().to_string(),
            format_gb(server.size.gigabytes()),
            format_date(date),
        ],
        RowKind::Footer => vec![
            server.name.clone(),
            AppConfig::FREE_MARKER.to_string(),
            format_gb(server.remaining_gb()),
            format_date(date),
        ],
    }
}

/// Writes single rows into a table, one backend call per row.
pub struct RowWriter {
    backend: Arc<dyn ReportBackend>,
}

impl RowWriter {
    pub fn new(backend: Arc<dyn ReportBackend>) -> Self {
        Self { backend }
    }

    /// Write `kind` at `row` of `table`. Failures are logged and reported as
    /// `false`; retrying is left to the next cycle.
    pub async fn write(
        &self,
        report_id: &str,
        table: &TableInfo,
        kind: RowKind,
        server: &ServerDescriptor,
        row: usize,
        date: NaiveDate,
    ) -> bool {
        let values = row_cells(kind, server, date);
        match self
            .backend
            .write_cells(report_id, table.id, row, 0, &values)
            .await
        {
            Ok(()) => {
                tracing::debug!(server = %server.name, "Wrote {kind} row at {row}");
                true
            }
            Err(e) => {
                tracing::error!(
                    server = %server.name,
                    op = kind.operation(),
                    row,
                    "{e}"
                );
                false
            }
        }
    }
}
