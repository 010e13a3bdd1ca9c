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
use std::time::Duration;

use clap::Parser;
use tokio::signal;

use dbsize_report::cli::Cli;
use dbsize_report::common::config::EnvConfig;
use dbsize_report::common::logging;
use dbsize_report::common::settings::Settings;
use dbsize_report::probe::{DriverProbe, PostgresDriver};
use dbsize_report::report::{ReportReconciler, SheetsBackend, StaticToken};
use dbsize_report::scheduler::Scheduler;
use dbsize_report::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_guard = logging::init(cli.log_dir());

    // Set up signal handler for clean shutdown
    tokio::spawn(async {
        match signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupted, shutting down");
                std::process::exit(0);
            }
            Err(e) => tracing::warn!("Failed to listen for Ctrl+C: {e}"),
        }
    });

    // Also handle SIGTERM on Unix systems
    #[cfg(unix)]
    tokio::spawn(async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Terminated, shutting down");
                std::process::exit(0);
            }
            Err(e) => tracing::warn!("Failed to listen for SIGTERM: {e}"),
        }
    });

    if let Err(e) = run(cli).await {
        tracing::error!("{e}");
        eprintln!("Error: {e}");
        // Flush the log file before exiting.
        drop(log_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(&cli.config)?;
    let token = settings.resolve_token(EnvConfig::sheets_token())?;
    let interval = EnvConfig::cycle_interval_secs(cli.interval, settings.interval_secs);

    let backend = SheetsBackend::new(
        settings.report.api_base(),
        Box::new(StaticToken::new(token)),
    )?;
    let report_id = backend
        .ensure_report(settings.report.spreadsheet_id(), settings.report.title())
        .await?;
    tracing::info!(
        report = %report_id,
        servers = settings.servers.len(),
        interval_secs = interval,
        "Report ready"
    );

    let reconciler = ReportReconciler::new(Arc::new(backend), report_id);
    let probe = DriverProbe::new(PostgresDriver::new());
    let mut scheduler = Scheduler::new(
        Box::new(probe),
        reconciler,
        settings.servers,
        Duration::from_secs(interval),
    );
    scheduler.run(cli.once).await;
    Ok(())
}
