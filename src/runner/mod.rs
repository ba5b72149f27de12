pub mod session;
pub mod workload;

use std::time::Duration;

use tokio::process::Command;
use tokio::time::{sleep, Instant};
use tracing::info;

use power_bench::core::constants::SUDO_PROGRAM;
use power_bench::core::status::format_remaining;
use power_bench::{BenchError, LiveProgress, StatusLine};

use crate::models::bench_config::BenchConfig;
use crate::runner::workload::Workload;
use crate::state::app_state::AppState;

/// Triggers the sudo password prompt once, before any timing starts.
pub async fn ensure_privileges() -> power_bench::Result<()> {
    info!("Checking for sudo access... You may be prompted for your password.");
    let status = Command::new(SUDO_PROGRAM)
        .arg("-v")
        .status()
        .await
        .map_err(|e| BenchError::Privilege(e.to_string()))?;

    if !status.success() {
        return Err(BenchError::Privilege(format!("sudo -v exited with {}", status)));
    }
    info!("Sudo access confirmed.");
    Ok(())
}

/// Runs every configured application in order, recording one report each.
pub async fn run_bench<W: Workload>(config: &BenchConfig, state: &AppState, workload: &mut W) -> anyhow::Result<()> {
    let schedule = config.schedule();
    info!(
        "[Monitor] Planned sleeps - total: {}. Total steps: {}",
        format_remaining(schedule.planned_total()),
        schedule.total_steps()
    );

    if config.uses_sudo() {
        ensure_privileges().await?;
    }

    if config.cooldown_secs > 0 {
        info!("[Preflight] Cooling down for {}s...", config.cooldown_secs);
        sleep(Duration::from_secs(config.cooldown_secs)).await;
    }

    let started = Instant::now();
    let mut progress = LiveProgress::new(config.estimator(), StatusLine::detect());
    let mut completed = 0usize;

    for (index, app) in config.applications.iter().enumerate() {
        progress.recalibrate(schedule.remaining_from(index), completed);
        let report = session::run_session(app, config, &schedule, workload, &mut progress, &mut completed).await;
        state.record(report).await;
    }

    progress.stop();
    info!("--- All Tests Finished ---");
    info!("Total time taken: {}", format_remaining(started.elapsed()));
    state.log_summary().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use power_bench::{LogicalWindow, PhaseDelays};

    const SAMPLER_SCRIPT: &str = r#"i=0; while [ $i -lt 40 ]; do echo 'Combined Power (CPU + GPU + ANE): 100 mW'; i=$((i+1)); done; exec sleep 30"#;

    #[derive(Default)]
    struct RecordingWorkload {
        events: Vec<String>,
        fail_on: Option<String>,
    }

    impl Workload for RecordingWorkload {
        async fn launch(&mut self, app: &str) -> anyhow::Result<()> {
            self.events.push(format!("launch {app}"));
            Ok(())
        }

        async fn open(&mut self, app: &str, window: &LogicalWindow) -> anyhow::Result<()> {
            self.events.push(format!("open {app} {}", window.label));
            if self.fail_on.as_deref() == Some(window.label.as_str()) {
                bail!("navigation to {} failed", window.label);
            }
            Ok(())
        }

        async fn close(&mut self, app: &str) -> anyhow::Result<()> {
            self.events.push(format!("close {app}"));
            Ok(())
        }

        async fn quit(&mut self, app: &str) -> anyhow::Result<()> {
            self.events.push(format!("quit {app}"));
            if self.fail_on.as_deref() == Some("quit") {
                bail!("{app} refused to quit");
            }
            Ok(())
        }
    }

    fn config(command: &[&str]) -> BenchConfig {
        BenchConfig {
            applications: vec!["Alpha".to_string(), "Beta".to_string()],
            windows: vec!["a".to_string(), "b".to_string()],
            sample_interval_ms: 100,
            sampler_command: Some(command.iter().map(|s| s.to_string()).collect()),
            dwell_secs: 0,
            delays: PhaseDelays {
                // Long enough for the script to print everything; 5 samples of pre-roll
                sampler_startup_ms: 500,
                app_launch_ms: 0,
                window_close_ms: 0,
                app_quit_ms: 0,
                sampler_stop_ms: 0,
            },
            ..BenchConfig::default()
        }
    }

    #[tokio::test]
    async fn test_run_bench_records_every_session() {
        let config = config(&["sh", "-c", SAMPLER_SCRIPT]);
        let state = AppState::new();
        let mut workload = RecordingWorkload::default();

        run_bench(&config, &state, &mut workload).await.unwrap();

        assert_eq!(
            workload.events,
            vec![
                "launch Alpha", "open Alpha a", "close Alpha", "open Alpha b", "close Alpha", "quit Alpha",
                "launch Beta", "open Beta a", "close Beta", "open Beta b", "close Beta", "quit Beta",
            ]
        );

        let reports = state.reports.read().await;
        assert_eq!(reports.len(), 2);
        for report in reports.iter() {
            assert!(report.has_data);
            assert!(report.error.is_none());
            assert_eq!(report.energy.sample_count, 40);
            assert!((report.energy.average_power - 100.0).abs() < 1e-9);
            assert_eq!(report.raw_samples_per_window.len(), 2);
            assert_eq!(report.raw_samples_per_window[1].label, "b");
            assert_eq!(report.average_per_window[0].avg, 100.0);
        }
    }

    #[tokio::test]
    async fn test_workload_failure_keeps_telemetry() {
        let config = config(&["sh", "-c", SAMPLER_SCRIPT]);
        let state = AppState::new();
        let mut workload = RecordingWorkload {
            fail_on: Some("b".to_string()),
            ..RecordingWorkload::default()
        };

        run_bench(&config, &state, &mut workload).await.unwrap();

        let reports = state.reports.read().await;
        assert_eq!(reports.len(), 2);
        assert!(reports[0].has_data);
        assert!(reports[0].error.as_deref().unwrap().contains("navigation to b failed"));
        assert!(workload.events.contains(&"quit Alpha".to_string()));
        assert!(workload.events.contains(&"launch Beta".to_string()));
    }

    #[tokio::test]
    async fn test_spawn_failure_does_not_abort_run() {
        let config = config(&["/nonexistent/sampler-binary"]);
        let state = AppState::new();
        let mut workload = RecordingWorkload::default();

        run_bench(&config, &state, &mut workload).await.unwrap();

        let reports = state.reports.read().await;
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| !r.has_data && r.error.is_some()));
        assert!(workload.events.is_empty());
    }

    #[tokio::test]
    async fn test_failed_quit_is_not_retried() {
        let mut config = config(&["sh", "-c", SAMPLER_SCRIPT]);
        config.applications.truncate(1);
        let state = AppState::new();
        let mut workload = RecordingWorkload {
            fail_on: Some("quit".to_string()),
            ..RecordingWorkload::default()
        };

        run_bench(&config, &state, &mut workload).await.unwrap();

        let quits = workload.events.iter().filter(|e| e.as_str() == "quit Alpha").count();
        assert_eq!(quits, 1);

        let reports = state.reports.read().await;
        assert!(reports[0].has_data);
        assert!(reports[0].error.as_deref().unwrap().contains("refused to quit"));
    }

    #[tokio::test]
    async fn test_failure_before_quit_still_quits_once() {
        let mut config = config(&["sh", "-c", SAMPLER_SCRIPT]);
        config.applications.truncate(1);
        let state = AppState::new();
        let mut workload = RecordingWorkload {
            fail_on: Some("a".to_string()),
            ..RecordingWorkload::default()
        };

        run_bench(&config, &state, &mut workload).await.unwrap();

        assert_eq!(workload.events, vec!["launch Alpha", "open Alpha a", "quit Alpha"]);
    }
}
