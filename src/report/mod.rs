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

//! Report side of a cycle: the backend abstraction, its Google Sheets and
//! in-memory implementations, and the per-cycle reconciliation on top.

pub mod backend;
pub mod catalog;
pub mod memory;
pub mod reconciler;
pub mod row;
pub mod sheets;

pub use backend::{CellRange, ReportBackend, TableId, TableInfo, TableSnapshot};
pub use catalog::{CatalogOutcome, TableCatalog};
pub use memory::{MemoryBackend, Operation};
pub use reconciler::{CycleReport, ReportReconciler, ServerOutcome, SkipReason};
pub use row::{RowKind, RowWriter};
pub use sheets::{SheetsBackend, StaticToken, TokenSource};
