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

//! Per-cycle report update.
//!
//! Nothing is remembered between cycles: every cycle re-reads the table list
//! and each table's rows, so a cycle that stopped half way is repaired by the
//! next one. A table evolves as
//!
//! ```text
//! (empty) -> header -> header, data, footer -> header, data, data, footer ...
//! ```
//!
//! Each new data row takes the place of the previous footer and a fresh
//! footer is appended after it.

use std::sync::Arc;

use chrono::{Local, NaiveDate};

use super::backend::{CellRange, ReportBackend, TableInfo, TableSnapshot};
use super::catalog::TableCatalog;
use super::row::{RowKind, RowWriter};
use crate::common::config::AppConfig;
use crate::server::info::ServerDescriptor;

/// What happened to one server during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerOutcome {
    /// Data and footer rows were written.
    Written { data_row: usize, footer_row: usize },
    /// The data row failed; the footer was written in its place.
    FooterOnly { footer_row: usize },
    /// The data row was written but the footer failed.
    DataOnly { data_row: usize },
    /// Nothing could be written this cycle.
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    CatalogUnavailable,
    NoTable,
    ReadFailed,
    HeaderFailed,
    NoRowsAfterHeader,
    NothingWritten,
}

/// Outcome of one full cycle, in server order.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub servers: Vec<(String, ServerOutcome)>,
}

impl CycleReport {
    pub fn outcome(&self, server: &str) -> Option<&ServerOutcome> {
        self.servers
            .iter()
            .find(|(name, _)| name == server)
            .map(|(_, outcome)| outcome)
    }

    pub fn written(&self) -> usize {
        self.servers
            .iter()
            .filter(|(_, o)| matches!(o, ServerOutcome::Written { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.servers
            .iter()
            .filter(|(_, o)| matches!(o, ServerOutcome::Skipped(_)))
            .count()
    }
}

/// Row where this cycle's data row goes, given the rows currently in the
/// table.
///
/// A header-only table gets its first data row right below the header. A
/// trailing footer is replaced. Anything else at the bottom (a data row left
/// by a cycle whose footer write failed) is kept and the new row is appended.
pub fn data_row_index(rows: &[Vec<String>]) -> usize {
    match rows.len() {
        0 | 1 => 1,
        len if is_footer(&rows[len - 1]) => len - 1,
        len => len,
    }
}

fn is_footer(row: &[String]) -> bool {
    row.get(1).is_some_and(|cell| cell == AppConfig::FREE_MARKER)
}

pub struct ReportReconciler {
    backend: Arc<dyn ReportBackend>,
    catalog: TableCatalog,
    writer: RowWriter,
    report_id: String,
}

impl ReportReconciler {
    pub fn new(backend: Arc<dyn ReportBackend>, report_id: impl Into<String>) -> Self {
        Self {
            catalog: TableCatalog::new(backend.clone()),
            writer: RowWriter::new(backend.clone()),
            backend,
            report_id: report_id.into(),
        }
    }

    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    /// Run one cycle dated with today's local date.
    pub async fn run_cycle(&self, servers: &[ServerDescriptor]) -> CycleReport {
        self.run_cycle_on(servers, Local::now().date_naive()).await
    }

    pub async fn run_cycle_on(&self, servers: &[ServerDescriptor], date: NaiveDate) -> CycleReport {
        let mut report = CycleReport::default();

        let snapshot = match self.catalog.reconcile(&self.report_id, servers).await {
            Ok(outcome) => outcome.snapshot,
            Err(e) => {
                tracing::error!("Skipping report update this cycle: {e}");
                report.servers = servers
                    .iter()
                    .map(|s| {
                        (
                            s.name.clone(),
                            ServerOutcome::Skipped(SkipReason::CatalogUnavailable),
                        )
                    })
                    .collect();
                return report;
            }
        };

        for server in servers {
            let outcome = self.update_server(&snapshot, server, date).await;
            report.servers.push((server.name.clone(), outcome));
        }

        tracing::info!(
            written = report.written(),
            skipped = report.skipped(),
            total = servers.len(),
            "Report cycle finished"
        );
        report
    }

    async fn read_rows(&self, server: &ServerDescriptor) -> Option<Vec<Vec<String>>> {
        let range = CellRange::report_columns(&server.name);
        match self.backend.read_range(&self.report_id, &range).await {
            Ok(rows) => Some(rows.unwrap_or_default()),
            Err(e) => {
                tracing::error!(server = %server.name, op = "read_range", "{e}");
                None
            }
        }
    }

    async fn write(
        &self,
        table: &TableInfo,
        kind: RowKind,
        server: &ServerDescriptor,
        row: usize,
        date: NaiveDate,
    ) -> bool {
        self.writer
            .write(&self.report_id, table, kind, server, row, date)
            .await
    }

    async fn update_server(
        &self,
        snapshot: &TableSnapshot,
        server: &ServerDescriptor,
        date: NaiveDate,
    ) -> ServerOutcome {
        let Some(table) = snapshot.find(&server.name) else {
            tracing::warn!(server = %server.name, "No table for server, skipping");
            return ServerOutcome::Skipped(SkipReason::NoTable);
        };

        let Some(rows) = self.read_rows(server).await else {
            return ServerOutcome::Skipped(SkipReason::ReadFailed);
        };

        if rows.is_empty() && !self.write(table, RowKind::Header, server, 0, date).await {
            return ServerOutcome::Skipped(SkipReason::HeaderFailed);
        }

        // Re-read so the row count reflects what the backend actually holds.
        let Some(rows) = self.read_rows(server).await else {
            return ServerOutcome::Skipped(SkipReason::ReadFailed);
        };
        if rows.is_empty() {
            tracing::warn!(server = %server.name, "Table still empty after writing header");
            return ServerOutcome::Skipped(SkipReason::NoRowsAfterHeader);
        }

        let data_row = data_row_index(&rows);
        let data_written = self.write(table, RowKind::Data, server, data_row, date).await;
        let footer_row = if data_written { data_row + 1 } else { data_row };
        let footer_written = self
            .write(table, RowKind::Footer, server, footer_row, date)
            .await;

        match (data_written, footer_written) {
            (true, true) => ServerOutcome::Written {
                data_row,
                footer_row,
            },
            (false, true) => ServerOutcome::FooterOnly { footer_row },
            (true, false) => ServerOutcome::DataOnly { data_row },
            (false, false) => ServerOutcome::Skipped(SkipReason::NothingWritten),
        }
    }
}
