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

use std::sync::Arc;

use super::backend::{ReportBackend, TableInfo, TableSnapshot};
use crate::common::config::AppConfig;
use crate::error::CatalogError;
use crate::server::info::ServerDescriptor;

/// Result of one catalog reconciliation.
#[derive(Debug, Clone)]
pub struct CatalogOutcome {
    /// Tables to use for the rest of the cycle.
    pub snapshot: TableSnapshot,
    /// True when at least one create or rename succeeded.
    pub changed: bool,
    pub created: usize,
    pub renamed: bool,
    pub failures: usize,
}

/// Keeps exactly one table per monitored server in the report.
pub struct TableCatalog {
    backend: Arc<dyn ReportBackend>,
}

impl TableCatalog {
    pub fn new(backend: Arc<dyn ReportBackend>) -> Self {
        Self { backend }
    }

    /// The backend's auto-created default table, if it is still around.
    /// The localized title is preferred when both exist.
    fn find_placeholder(tables: &[TableInfo]) -> Option<&TableInfo> {
        AppConfig::PLACEHOLDER_TABLE_TITLES
            .iter()
            .find_map(|title| tables.iter().find(|t| t.title == *title))
    }

    pub async fn reconcile(
        &self,
        report_id: &str,
        servers: &[ServerDescriptor],
    ) -> Result<CatalogOutcome, CatalogError> {
        let initial = self
            .backend
            .list_tables(report_id)
            .await
            .map_err(|e| {
                tracing::error!(op = "list_tables", "{e}");
                CatalogError::List(e)
            })?;

        // Local view of the tables, patched as creates and renames succeed.
        let mut tables = initial.clone();
        let mut renamed = false;
        let mut created = 0;
        let mut failures = 0;

        if let Some(first) = servers.first() {
            let placeholder = if tables.iter().any(|t| t.title == first.name) {
                None
            } else {
                Self::find_placeholder(&tables).cloned()
            };
            if let Some(placeholder) = placeholder {
                match self
                    .backend
                    .rename_table(report_id, placeholder.id, &first.name)
                    .await
                {
                    Ok(()) => {
                        tracing::info!(
                            server = %first.name,
                            "Renamed placeholder table {:?} (id {})",
                            placeholder.title,
                            placeholder.id
                        );
                        if let Some(table) = tables.iter_mut().find(|t| t.id == placeholder.id) {
                            table.title = first.name.clone();
                        }
                        renamed = true;
                    }
                    Err(e) => {
                        tracing::error!(server = %first.name, op = "rename_table", "{e}");
                        failures += 1;
                    }
                }
            }
        }

        for server in servers {
            if tables.iter().any(|t| t.title == server.name) {
                continue;
            }
            match self.backend.create_table(report_id, &server.name).await {
                Ok(id) => {
                    tracing::info!(server = %server.name, "Created table (id {id})");
                    tables.push(TableInfo {
                        id,
                        title: server.name.clone(),
                    });
                    created += 1;
                }
                Err(e) => {
                    tracing::error!(server = %server.name, op = "create_table", "{e}");
                    failures += 1;
                }
            }
        }

        let changed = renamed || created > 0;
        let snapshot = if changed {
            match self.backend.list_tables(report_id).await {
                Ok(fresh) => TableSnapshot::new(fresh),
                Err(e) => {
                    tracing::warn!(
                        op = "list_tables",
                        "Re-listing after changes failed, using local view: {e}"
                    );
                    TableSnapshot::new(tables)
                }
            }
        } else {
            TableSnapshot::new(initial)
        };

        Ok(CatalogOutcome {
            snapshot,
            changed,
            created,
            renamed,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::memory::{MemoryBackend, Operation};
    use crate::server::info::ConnectionParams;

    fn server(name: &str) -> ServerDescriptor {
        ServerDescriptor::new(
            name,
            ConnectionParams {
                host: "db".to_string(),
                port: 5432,
                database: "app".to_string(),
                user: "u".to_string(),
                password: "p".to_string(),
            },
        )
    }

    fn catalog(backend: &Arc<MemoryBackend>) -> TableCatalog {
        TableCatalog::new(backend.clone())
    }

    #[tokio::test]
    async fn test_placeholder_renamed_to_first_server() {
        let backend = Arc::new(MemoryBackend::with_tables("r", &["Sheet1"]));
        let outcome = catalog(&backend)
            .reconcile("r", &[server("Server1")])
            .await
            .unwrap();

        assert!(outcome.renamed);
        assert!(outcome.changed);
        assert_eq!(outcome.created, 0);
        assert_eq!(backend.titles(), vec!["Server1"]);
        assert_eq!(outcome.snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_localized_placeholder_preferred() {
        let backend = Arc::new(MemoryBackend::with_tables("r", &["Sheet1", "Лист1"]));
        catalog(&backend)
            .reconcile("r", &[server("Server1")])
            .await
            .unwrap();
        assert_eq!(backend.titles(), vec!["Sheet1", "Server1"]);
    }

    #[tokio::test]
    async fn test_missing_tables_created_in_order() {
        let backend = Arc::new(MemoryBackend::with_tables("r", &["Server2"]));
        let servers = [server("Server1"), server("Server2"), server("Server3")];
        let outcome = catalog(&backend).reconcile("r", &servers).await.unwrap();

        assert_eq!(outcome.created, 2);
        assert_eq!(backend.titles(), vec!["Server2", "Server1", "Server3"]);
        assert!(servers.iter().all(|s| outcome.snapshot.contains(&s.name)));
    }

    #[tokio::test]
    async fn test_second_reconcile_is_noop() {
        let backend = Arc::new(MemoryBackend::with_tables("r", &["Sheet1"]));
        let servers = [server("Server1"), server("Server2")];
        let catalog = catalog(&backend);

        catalog.reconcile("r", &servers).await.unwrap();
        let creates = backend.calls(Operation::CreateTable);
        let renames = backend.calls(Operation::RenameTable);

        let outcome = catalog.reconcile("r", &servers).await.unwrap();
        assert!(!outcome.changed);
        assert_eq!(backend.calls(Operation::CreateTable), creates);
        assert_eq!(backend.calls(Operation::RenameTable), renames);
        assert_eq!(backend.titles(), vec!["Server1", "Server2"]);
    }

    #[tokio::test]
    async fn test_placeholder_kept_when_first_server_has_table() {
        let backend = Arc::new(MemoryBackend::with_tables("r", &["Sheet1", "Server1"]));
        let outcome = catalog(&backend)
            .reconcile("r", &[server("Server1")])
            .await
            .unwrap();
        assert!(!outcome.renamed);
        assert_eq!(backend.calls(Operation::RenameTable), 0);
        assert_eq!(backend.titles(), vec!["Sheet1", "Server1"]);
    }

    #[tokio::test]
    async fn test_rename_failure_falls_back_to_create() {
        let backend = Arc::new(MemoryBackend::with_tables("r", &["Sheet1"]));
        backend.fail(Operation::RenameTable, 1);
        let outcome = catalog(&backend)
            .reconcile("r", &[server("Server1")])
            .await
            .unwrap();

        assert!(!outcome.renamed);
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.failures, 1);
        assert_eq!(backend.titles(), vec!["Sheet1", "Server1"]);
    }

    #[tokio::test]
    async fn test_list_failure_is_error() {
        let backend = Arc::new(MemoryBackend::with_tables("r", &[]));
        backend.fail(Operation::ListTables, 1);
        let result = catalog(&backend).reconcile("r", &[server("Server1")]).await;
        assert!(matches!(result, Err(CatalogError::List(_))));
        assert_eq!(backend.calls(Operation::CreateTable), 0);
    }

    #[tokio::test]
    async fn test_partial_create_failure_recovered_next_cycle() {
        let backend = Arc::new(MemoryBackend::with_tables("r", &[]));
        backend.fail_for_table(Operation::CreateTable, "Server2", 1);
        let servers = [server("Server1"), server("Server2")];
        let catalog = catalog(&backend);

        let outcome = catalog.reconcile("r", &servers).await.unwrap();
        assert_eq!(outcome.created, 1);
        assert!(!outcome.snapshot.contains("Server2"));

        let outcome = catalog.reconcile("r", &servers).await.unwrap();
        assert_eq!(outcome.created, 1);
        assert!(outcome.snapshot.contains("Server2"));
    }

    #[tokio::test]
    async fn test_relist_failure_uses_local_view() {
        let backend = Arc::new(MemoryBackend::with_tables("r", &["Sheet1"]));
        let placeholder_id = backend.list_tables("r").await.unwrap()[0].id;
        backend.fail_after(Operation::ListTables, 1);

        let servers = [server("Server1"), server("Server2")];
        let outcome = catalog(&backend).reconcile("r", &servers).await.unwrap();

        assert!(outcome.changed);
        assert_eq!(
            outcome.snapshot.find("Server1").map(|t| t.id),
            Some(placeholder_id)
        );
        assert!(outcome.snapshot.contains("Server2"));
        assert!(!outcome.snapshot.contains("Sheet1"));
    }
}
