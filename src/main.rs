use tracing::{error, info, Level};
use tracing_subscriber;

mod models;
mod runner;
mod state;
mod utils;

use crate::runner::workload::IdleWorkload;
use crate::state::app_state::AppState;
use crate::utils::conf_helper::{get_cached_config, init_config, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the JSON report
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // === CONFIG ===
    init_config(&config_path).await?;
    let config = get_cached_config();

    let state = AppState::new();
    info!("Run {} starting", state.run_id);

    let mut workload = IdleWorkload;
    if let Err(e) = runner::run_bench(config, &state, &mut workload).await {
        error!("[Error] Run aborted: {:#}", e);
    }

    // Whatever finished is still reported
    let report = state
        .run_report(config.sample_interval_ms, config.dwell_secs)
        .await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
