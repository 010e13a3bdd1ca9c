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

//! In-memory [`ReportBackend`] with failure injection.
//!
//! Mirrors the observable behaviour of a spreadsheet service closely enough
//! to drive the reconciler in tests: titles are unique, reads trim trailing
//! empty rows and return `None` for an empty range, and writes grow the grid
//! as needed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::backend::{BackendResult, CellRange, ReportBackend, TableId, TableInfo};
use crate::error::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListTables,
    CreateTable,
    RenameTable,
    ReadRange,
    WriteCells,
}

#[derive(Debug, Clone)]
struct FailureRule {
    op: Operation,
    table: Option<String>,
    row: Option<usize>,
    skip: usize,
    remaining: usize,
}

impl FailureRule {
    fn matches(&self, op: Operation, table: Option<&str>, row: Option<usize>) -> bool {
        self.remaining > 0
            && self.op == op
            && self.table.as_deref().is_none_or(|t| Some(t) == table)
            && self.row.is_none_or(|r| Some(r) == row)
    }
}

#[derive(Debug, Clone)]
struct MemTable {
    info: TableInfo,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct MemState {
    tables: Vec<MemTable>,
    next_id: TableId,
    rules: Vec<FailureRule>,
    calls: HashMap<Operation, usize>,
}

pub struct MemoryBackend {
    report_id: String,
    state: Mutex<MemState>,
}

impl MemoryBackend {
    pub fn new(report_id: impl Into<String>) -> Self {
        Self {
            report_id: report_id.into(),
            state: Mutex::new(MemState {
                next_id: 1,
                ..MemState::default()
            }),
        }
    }

    /// Backend pre-populated with empty tables, in order.
    pub fn with_tables(report_id: impl Into<String>, titles: &[&str]) -> Self {
        let backend = Self::new(report_id);
        {
            let mut state = backend.lock();
            for title in titles {
                let id = state.next_id;
                state.next_id += 1;
                state.tables.push(MemTable {
                    info: TableInfo {
                        id,
                        title: title.to_string(),
                    },
                    rows: Vec::new(),
                });
            }
        }
        backend
    }

    fn lock(&self) -> MutexGuard<'_, MemState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fail the next `times` calls of `op`.
    pub fn fail(&self, op: Operation, times: usize) {
        self.push_rule(op, None, None, 0, times);
    }

    /// Let `skip` calls of `op` through, then fail the following one.
    pub fn fail_after(&self, op: Operation, skip: usize) {
        self.push_rule(op, None, None, skip, 1);
    }

    /// Fail the next `times` calls of `op` that target `table`.
    pub fn fail_for_table(&self, op: Operation, table: &str, times: usize) {
        self.push_rule(op, Some(table.to_string()), None, 0, times);
    }

    /// Fail the next `times` writes to `row` of `table`.
    pub fn fail_write_at(&self, table: &str, row: usize, times: usize) {
        self.push_rule(Operation::WriteCells, Some(table.to_string()), Some(row), 0, times);
    }

    fn push_rule(
        &self,
        op: Operation,
        table: Option<String>,
        row: Option<usize>,
        skip: usize,
        times: usize,
    ) {
        self.lock().rules.push(FailureRule {
            op,
            table,
            row,
            skip,
            remaining: times,
        });
    }

    /// Number of calls made for `op`, failed ones included.
    pub fn calls(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn titles(&self) -> Vec<String> {
        self.lock()
            .tables
            .iter()
            .map(|t| t.info.title.clone())
            .collect()
    }

    /// Raw grid of `title`, without trimming.
    pub fn rows(&self, title: &str) -> Option<Vec<Vec<String>>> {
        self.lock()
            .tables
            .iter()
            .find(|t| t.info.title == title)
            .map(|t| t.rows.clone())
    }

    /// Seed a table with existing rows, as if written by an earlier run.
    pub fn seed_rows(&self, title: &str, rows: Vec<Vec<String>>) {
        if let Some(table) = self.lock().tables.iter_mut().find(|t| t.info.title == title) {
            table.rows = rows;
        }
    }

    fn enter(
        &self,
        report_id: &str,
        op: Operation,
        table: Option<&str>,
        row: Option<usize>,
    ) -> BackendResult<MutexGuard<'_, MemState>> {
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;

        if let Some(rule) = state
            .rules
            .iter_mut()
            .find(|rule| rule.matches(op, table, row))
        {
            if rule.skip > 0 {
                rule.skip -= 1;
            } else {
                rule.remaining -= 1;
                return Err(BackendError::Injected(format!("{op:?}")));
            }
        }

        if report_id != self.report_id {
            return Err(BackendError::NotFound(format!("report {report_id}")));
        }
        Ok(state)
    }

    fn title_of(&self, id: TableId) -> Option<String> {
        self.lock()
            .tables
            .iter()
            .find(|t| t.info.id == id)
            .map(|t| t.info.title.clone())
    }
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.is_empty())
}

#[async_trait]
impl ReportBackend for MemoryBackend {
    async fn list_tables(&self, report_id: &str) -> BackendResult<Vec<TableInfo>> {
        let state = self.enter(report_id, Operation::ListTables, None, None)?;
        Ok(state.tables.iter().map(|t| t.info.clone()).collect())
    }

    async fn create_table(&self, report_id: &str, title: &str) -> BackendResult<TableId> {
        let mut state = self.enter(report_id, Operation::CreateTable, Some(title), None)?;
        if state.tables.iter().any(|t| t.info.title == title) {
            return Err(BackendError::Status {
                status: 400,
                message: format!("A sheet with the name \"{title}\" already exists"),
            });
        }
        let id = state.next_id;
        state.next_id += 1;
        state.tables.push(MemTable {
            info: TableInfo {
                id,
                title: title.to_string(),
            },
            rows: Vec::new(),
        });
        Ok(id)
    }

    async fn rename_table(&self, report_id: &str, id: TableId, title: &str) -> BackendResult<()> {
        let current = self.title_of(id);
        let mut state = self.enter(report_id, Operation::RenameTable, current.as_deref(), None)?;
        if state
            .tables
            .iter()
            .any(|t| t.info.title == title && t.info.id != id)
        {
            return Err(BackendError::Status {
                status: 400,
                message: format!("A sheet with the name \"{title}\" already exists"),
            });
        }
        let table = state
            .tables
            .iter_mut()
            .find(|t| t.info.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("table {id}")))?;
        table.info.title = title.to_string();
        Ok(())
    }

    async fn read_range(
        &self,
        report_id: &str,
        range: &CellRange,
    ) -> BackendResult<Option<Vec<Vec<String>>>> {
        let state = self.enter(report_id, Operation::ReadRange, Some(&range.table), None)?;
        let table = state
            .tables
            .iter()
            .find(|t| t.info.title == range.table)
            .ok_or_else(|| BackendError::NotFound(format!("range {}", range.to_a1())))?;

        let width = range.width();
        let mut rows: Vec<Vec<String>> = table
            .rows
            .iter()
            .map(|row| {
                let mut cells: Vec<String> = row.iter().take(width).cloned().collect();
                while cells.last().is_some_and(|c| c.is_empty()) {
                    cells.pop();
                }
                cells
            })
            .collect();
        while rows.last().is_some_and(|row| is_blank(row)) {
            rows.pop();
        }

        Ok(if rows.is_empty() { None } else { Some(rows) })
    }

    async fn write_cells(
        &self,
        report_id: &str,
        table_id: TableId,
        row: usize,
        column: usize,
        values: &[String],
    ) -> BackendResult<()> {
        let title = self.title_of(table_id);
        let mut state = self.enter(report_id, Operation::WriteCells, title.as_deref(), Some(row))?;
        let table = state
            .tables
            .iter_mut()
            .find(|t| t.info.id == table_id)
            .ok_or_else(|| BackendError::NotFound(format!("table {table_id}")))?;

        if table.rows.len() <= row {
            table.rows.resize(row + 1, Vec::new());
        }
        let cells = &mut table.rows[row];
        if cells.len() < column + values.len() {
            cells.resize(column + values.len(), String::new());
        }
        for (offset, value) in values.iter().enumerate() {
            cells[column + offset] = value.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let backend = MemoryBackend::with_tables("r", &["Sheet1"]);
        let id = backend.create_table("r", "Server1").await.unwrap();
        let tables = backend.list_tables("r").await.unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].id, id);

        let dup = backend.create_table("r", "Server1").await;
        assert!(matches!(dup, Err(BackendError::Status { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_unknown_report_is_not_found() {
        let backend = MemoryBackend::new("r");
        let err = backend.list_tables("other").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_empty_range_is_none() {
        let backend = MemoryBackend::with_tables("r", &["S"]);
        let range = CellRange::report_columns("S");
        assert_eq!(backend.read_range("r", &range).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_grows_grid_and_read_trims() {
        let backend = MemoryBackend::with_tables("r", &["S"]);
        let id = backend.list_tables("r").await.unwrap()[0].id;
        backend
            .write_cells("r", id, 2, 0, &cells(&["a", "b"]))
            .await
            .unwrap();

        let rows = backend
            .read_range("r", &CellRange::report_columns("S"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_empty());
        assert_eq!(rows[2], cells(&["a", "b"]));
    }

    #[tokio::test]
    async fn test_read_ignores_columns_outside_range() {
        let backend = MemoryBackend::with_tables("r", &["S"]);
        backend.seed_rows("S", vec![cells(&["", "", "", "", "note"])]);
        let rows = backend
            .read_range("r", &CellRange::report_columns("S"))
            .await
            .unwrap();
        assert_eq!(rows, None);
    }

    #[tokio::test]
    async fn test_failure_injection_is_counted_and_consumed() {
        let backend = MemoryBackend::with_tables("r", &["S"]);
        backend.fail(Operation::ListTables, 1);
        assert!(backend.list_tables("r").await.is_err());
        assert!(backend.list_tables("r").await.is_ok());
        assert_eq!(backend.calls(Operation::ListTables), 2);
    }

    #[tokio::test]
    async fn test_fail_after_skips_calls() {
        let backend = MemoryBackend::with_tables("r", &["S"]);
        backend.fail_after(Operation::ListTables, 1);
        assert!(backend.list_tables("r").await.is_ok());
        assert!(backend.list_tables("r").await.is_err());
        assert!(backend.list_tables("r").await.is_ok());
    }

    #[tokio::test]
    async fn test_targeted_write_failure() {
        let backend = MemoryBackend::with_tables("r", &["A", "B"]);
        let tables = backend.list_tables("r").await.unwrap();
        backend.fail_write_at("B", 1, 1);

        assert!(backend
            .write_cells("r", tables[0].id, 1, 0, &cells(&["x"]))
            .await
            .is_ok());
        assert!(backend
            .write_cells("r", tables[1].id, 0, 0, &cells(&["x"]))
            .await
            .is_ok());
        assert!(backend
            .write_cells("r", tables[1].id, 1, 0, &cells(&["x"]))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_rename_keeps_id() {
        let backend = MemoryBackend::with_tables("r", &["Sheet1"]);
        let id = backend.list_tables("r").await.unwrap()[0].id;
        backend.rename_table("r", id, "Server1").await.unwrap();
        let tables = backend.list_tables("r").await.unwrap();
        assert_eq!(tables[0].id, id);
        assert_eq!(tables[0].title, "Server1");
    }
}
