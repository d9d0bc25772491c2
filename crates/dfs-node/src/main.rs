//! # DFS Registry Node
//!
//! Reads one JSON request per line on stdin and writes one JSON response per
//! line on stdout. Logs go to stderr.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialize logging and metrics
//! 3. Open and replay the journal
//! 4. Start the notification monitor
//! 5. Serve stdin until EOF or Ctrl+C
//! 6. Write the metrics textfile when `DFS_METRICS_PATH` is set

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tracing::info;

use dfs_node::{NodeConfig, NodeRuntime};
use dfs_telemetry::init_telemetry;

/// Grace period for blocking tasks (the stdin reader) at exit.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    let config = NodeConfig::from_env().context("Failed to load node configuration")?;
    let _telemetry =
        init_telemetry(config.telemetry.clone()).context("Failed to initialize telemetry")?;

    let executor = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    let result = executor.block_on(run(config));

    // A pending stdin read would otherwise hold the process open after Ctrl+C.
    executor.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run(config: NodeConfig) -> Result<()> {
    let runtime = NodeRuntime::new(config).context("Failed to open file registry")?;
    let monitor = runtime.start();

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        served = runtime.serve(stdin, stdout) => {
            let summary = served.context("Request session failed")?;
            info!(requests = summary.requests, "Input closed");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Interrupt received");
        }
    }

    runtime.shutdown();
    let observed = monitor.await.context("Notification monitor panicked")?;
    runtime.export_metrics().context("Failed to export metrics")?;
    info!(
        observed,
        committed = runtime.service().stats().await.committed(),
        "Shutdown complete"
    );

    Ok(())
}
