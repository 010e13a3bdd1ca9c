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

use async_trait::async_trait;

use crate::common::config::AppConfig;
use crate::error::BackendError;

pub type BackendResult<T> = Result<T, BackendError>;

/// Backend-assigned table identifier. Stable across renames and reorders.
pub type TableId = i64;

/// One table (sheet) inside a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub id: TableId,
    pub title: String,
}

/// A rectangular block of a table, addressed by title and column letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub table: String,
    pub first_column: char,
    pub last_column: char,
}

impl CellRange {
    /// Columns A..D of `table`, open-ended downwards.
    pub fn report_columns(table: &str) -> Self {
        Self {
            table: table.to_string(),
            first_column: AppConfig::FIRST_COLUMN,
            last_column: AppConfig::LAST_COLUMN,
        }
    }

    /// A1 notation with the table name always quoted, e.g. `'My db'!A1:D`.
    pub fn to_a1(&self) -> String {
        let escaped = self.table.replace('\'', "''");
        format!("'{escaped}'!{}1:{}", self.first_column, self.last_column)
    }

    pub fn width(&self) -> usize {
        (self.last_column as usize).saturating_sub(self.first_column as usize) + 1
    }
}

/// Immutable view of the report's tables taken at one point of a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSnapshot {
    tables: Vec<TableInfo>,
}

impl TableSnapshot {
    pub fn new(tables: Vec<TableInfo>) -> Self {
        Self { tables }
    }

    /// Exact, case-sensitive title match. The first match wins.
    pub fn find(&self, title: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|table| table.title == title)
    }

    pub fn contains(&self, title: &str) -> bool {
        self.find(title).is_some()
    }

    pub fn tables(&self) -> &[TableInfo] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Spreadsheet-like storage the report is written to.
///
/// Each method is a single round trip. Errors are returned, never panicked,
/// and callers decide whether a failure is fatal.
#[async_trait]
pub trait ReportBackend: Send + Sync {
    async fn list_tables(&self, report_id: &str) -> BackendResult<Vec<TableInfo>>;

    async fn create_table(&self, report_id: &str, title: &str) -> BackendResult<TableId>;

    async fn rename_table(&self, report_id: &str, id: TableId, title: &str) -> BackendResult<()>;

    /// Rows of `range`, or `None` when the range holds no values at all.
    async fn read_range(
        &self,
        report_id: &str,
        range: &CellRange,
    ) -> BackendResult<Option<Vec<Vec<String>>>>;

    /// Write one row of `values` starting at (`row`, `column`), zero based.
    async fn write_cells(
        &self,
        report_id: &str,
        table_id: TableId,
        row: usize,
        column: usize,
        values: &[String],
    ) -> BackendResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_a1_notation() {
        assert_eq!(CellRange::report_columns("Server1").to_a1(), "'Server1'!A1:D");
        assert_eq!(
            CellRange::report_columns("O'Brien db").to_a1(),
            "'O''Brien db'!A1:D"
        );
        assert_eq!(CellRange::report_columns("x").width(), 4);
    }

    #[test]
    fn test_snapshot_matching_is_exact() {
        let snapshot = TableSnapshot::new(vec![
            TableInfo {
                id: 7,
                title: "Server1".to_string(),
            },
            TableInfo {
                id: 9,
                title: "server2".to_string(),
            },
        ]);
        assert_eq!(snapshot.find("Server1").map(|t| t.id), Some(7));
        assert!(snapshot.find("Server2").is_none());
        assert!(snapshot.find("Server1 ").is_none());
        assert_eq!(snapshot.len(), 2);
    }
}
