use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

use power_bench::{
    averages_per_window, samples_per_window, EnergyResult, EnergyTracker, LiveProgress, RunSchedule, SessionReport,
};

use crate::models::bench_config::BenchConfig;
use crate::runner::workload::Workload;

/// Measures one application: sampler up, every window visited, sampler down.
/// Workload failures end the session early but keep the telemetry captured
/// so far. Only a sampler that cannot start yields a report without data.
pub async fn run_session<W: Workload>(
    app: &str,
    config: &BenchConfig,
    schedule: &RunSchedule,
    workload: &mut W,
    progress: &mut LiveProgress,
    completed: &mut usize,
) -> SessionReport {
    info!("--- Starting Test for: {} ---", app);

    let tracker = match EnergyTracker::start(&config.tracker_options()) {
        Ok(tracker) => tracker,
        Err(e) => {
            error!("[Error] Could not start sampler for {}: {}", app, e);
            return SessionReport::failed(app, e);
        }
    };

    // Keep the startup wait aligned with the planned pre-roll
    let startup = config.delays.sampler_startup();
    let began = Instant::now();
    if timeout(startup, tracker.ready().wait()).await.is_err() {
        debug!("[Monitor] No sample within {:?} of sampler start", startup);
    }
    sleep(startup.saturating_sub(began.elapsed())).await;

    let outcome = match drive_windows(app, config, schedule, workload, progress, completed).await {
        Ok(()) => quit_app(app, config, workload).await,
        Err(e) => {
            // Quit was never reached; still try to leave the app closed
            if let Err(quit_err) = workload.quit(app).await {
                warn!("[Error] Could not quit {} after failure: {:#}", app, quit_err);
            }
            Err(e)
        }
    };
    if let Err(e) = &outcome {
        error!("[Error] Test failed for {}: {:#}", app, e);
    }

    info!("[Monitor] Stopping sampler...");
    let energy = tracker.stop_tracking().await;
    sleep(config.delays.sampler_stop()).await;
    info!("[Monitor] Stopped.");

    let report = build_report(app, energy, config, schedule, outcome.err().map(|e| format!("{:#}", e)));
    log_session(&report);
    report
}

async fn drive_windows<W: Workload>(
    app: &str,
    config: &BenchConfig,
    schedule: &RunSchedule,
    workload: &mut W,
    progress: &mut LiveProgress,
    completed: &mut usize,
) -> anyhow::Result<()> {
    let delays = &config.delays;

    info!("[Test] Launching {}...", app);
    workload.launch(app).await?;
    sleep(delays.app_launch()).await;

    for window in config.logical_windows() {
        info!("[Test]   Opening {}...", window.label);
        workload.open(app, &window).await?;

        debug!("[Monitor]  Waiting {:?}...", schedule.dwell);
        sleep(schedule.dwell).await;

        *completed += 1;
        progress.advance(*completed, schedule.total_steps());

        debug!("[Test]   Closing window...");
        workload.close(app).await?;
        sleep(delays.window_close()).await;
    }
    Ok(())
}

async fn quit_app<W: Workload>(app: &str, config: &BenchConfig, workload: &mut W) -> anyhow::Result<()> {
    info!("[Test] Quitting {}...", app);
    workload.quit(app).await?;
    sleep(config.delays.app_quit()).await;
    Ok(())
}

fn build_report(
    app: &str,
    energy: EnergyResult,
    config: &BenchConfig,
    schedule: &RunSchedule,
    error: Option<String>,
) -> SessionReport {
    let interval = config.tracker_options().interval_ms();
    let windows = config.logical_windows();
    let pre_roll = schedule.pre_roll_samples(interval);

    SessionReport {
        label: app.to_string(),
        has_data: energy.has_data(),
        average_per_window: averages_per_window(&energy.raw_samples, &windows, pre_roll),
        raw_samples_per_window: samples_per_window(&energy.raw_samples, &windows, pre_roll),
        energy,
        error,
    }
}

fn log_session(report: &SessionReport) {
    if report.has_data {
        let energy = &report.energy;
        info!("[Results] --- {} ---", report.label);
        info!("[Results] Average Power: {:.2} mW", energy.average_power);
        info!("[Results] Max Power: {} mW", energy.max_power);
        info!("[Results] Total Energy: {:.3} mWh", energy.total_energy);
        info!(
            "[Results] Samples Taken: {} over {:?}",
            energy.sample_count,
            Duration::from_millis(energy.sample_interval * energy.sample_count as u64)
        );
    } else {
        info!("[Results] No power data captured for {}.", report.label);
    }
}
