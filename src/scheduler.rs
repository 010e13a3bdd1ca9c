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

//! Fixed-interval cycle driver.

use std::time::Duration;

use crate::probe::{measure_all, SizeProbe};
use crate::report::{CycleReport, ReportReconciler};
use crate::server::info::ServerDescriptor;

/// Runs measure-then-reconcile cycles back to back, sleeping in between.
///
/// The next cycle only starts after the previous one returned, so cycles
/// never overlap regardless of how long the backend takes.
pub struct Scheduler {
    probe: Box<dyn SizeProbe>,
    reconciler: ReportReconciler,
    servers: Vec<ServerDescriptor>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        probe: Box<dyn SizeProbe>,
        reconciler: ReportReconciler,
        servers: Vec<ServerDescriptor>,
        interval: Duration,
    ) -> Self {
        Self {
            probe,
            reconciler,
            servers,
            interval,
        }
    }

    pub fn servers(&self) -> &[ServerDescriptor] {
        &self.servers
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One cycle: measure every server, then update the report.
    pub async fn run_cycle(&mut self) -> CycleReport {
        measure_all(self.probe.as_ref(), &mut self.servers).await;
        self.reconciler.run_cycle(&self.servers).await
    }

    /// Run cycles until the process is stopped, or a single one with `once`.
    pub async fn run(&mut self, once: bool) {
        let mut cycle: u64 = 0;
        loop {
            cycle += 1;
            tracing::info!(
                cycle,
                servers = self.servers.len(),
                report = self.reconciler.report_id(),
                "Starting cycle"
            );
            self.run_cycle().await;

            if once {
                break;
            }
            tracing::debug!("Sleeping {}s until next cycle", self.interval.as_secs());
            tokio::time::sleep(self.interval).await;
        }
    }
}
