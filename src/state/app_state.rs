use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use power_bench::SessionReport;

/// Cumulative report handed to the persistence layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub sample_interval_ms: u64,
    pub dwell_secs: u64,
    pub results: Vec<SessionReport>,
}

#[derive(Clone)]
pub struct AppState {
    pub run_id: Uuid,
    // Sessions in the order they finished
    pub reports: Arc<RwLock<Vec<SessionReport>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            reports: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn record(&self, report: SessionReport) {
        self.reports.write().await.push(report);
    }

    pub async fn run_report(&self, sample_interval_ms: u64, dwell_secs: u64) -> RunReport {
        RunReport {
            run_id: self.run_id,
            generated_at: Utc::now(),
            sample_interval_ms,
            dwell_secs,
            results: self.reports.read().await.clone(),
        }
    }

    /// Logs sessions ranked by average power, lowest first, then the ones
    /// that captured nothing.
    pub async fn log_summary(&self) {
        let reports = self.reports.read().await;
        if reports.is_empty() {
            return;
        }

        let (mut ranked, missing): (Vec<_>, Vec<_>) = reports.iter().partition(|r| r.has_data);
        ranked.sort_by(|a, b| a.energy.average_power.total_cmp(&b.energy.average_power));

        info!("[Results] Overall summary:");
        if !ranked.is_empty() {
            let pad = ranked
                .iter()
                .map(|r| r.label.len())
                .max()
                .unwrap_or(0)
                .max("Application".len());
            info!(
                "[Results] {:<pad$}  {:>9}  {:>9}  {:>10}  {:>8}",
                "Application", "Avg (mW)", "Max (mW)", "Energy (mWh)", "Samples"
            );
            for r in &ranked {
                info!(
                    "[Results] {:<pad$}  {:>9.2}  {:>9}  {:>10.3}  {:>8}",
                    r.label, r.energy.average_power, r.energy.max_power, r.energy.total_energy, r.energy.sample_count
                );
            }
            let best = ranked[0];
            info!(
                "[Results] Best (lowest avg power): {} ({:.2} mW)",
                best.label, best.energy.average_power
            );
        }

        for r in missing {
            match &r.error {
                Some(e) => info!("[Results] {}: no power data captured ({})", r.label, e),
                None => info!("[Results] {}: no power data captured", r.label),
            }
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
