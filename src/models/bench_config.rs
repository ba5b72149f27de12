use serde::{Deserialize, Serialize};
use std::time::Duration;

use power_bench::core::constants::*;
use power_bench::{LogicalWindow, PhaseDelays, ProgressEstimator, RunSchedule, TrackerOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Applications measured in order, one session each.
    pub applications: Vec<String>,
    /// Pages visited inside every application, one window each.
    pub windows: Vec<String>,
    pub sample_interval_ms: u64,
    pub samplers: Vec<String>,
    pub disable_sudo: bool,
    pub sampler_program: String,
    /// Replaces the generated sampler invocation entirely.
    pub sampler_command: Option<Vec<String>>,
    pub dwell_secs: u64,
    pub delays: PhaseDelays,
    pub drift_threshold_secs: u64,
    /// 0 keeps the drift threshold strict.
    pub max_silent_skips: u32,
    pub stop_timeout_ms: u64,
    pub cooldown_secs: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            applications: Vec::new(),
            windows: Vec::new(),
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            samplers: DEFAULT_SAMPLERS.iter().map(|s| s.to_string()).collect(),
            disable_sudo: false,
            sampler_program: SAMPLER_PROGRAM.to_string(),
            sampler_command: None,
            dwell_secs: DEFAULT_DWELL_SECS,
            delays: PhaseDelays::default(),
            drift_threshold_secs: DEFAULT_DRIFT_THRESHOLD.as_secs(),
            max_silent_skips: DEFAULT_MAX_SILENT_SKIPS,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT.as_millis() as u64,
            cooldown_secs: 0,
        }
    }
}

impl BenchConfig {
    pub fn dwell(&self) -> Duration {
        Duration::from_secs(self.dwell_secs)
    }

    pub fn tracker_options(&self) -> TrackerOptions {
        TrackerOptions {
            sample_interval_ms: self.sample_interval_ms,
            samplers: self.samplers.clone(),
            disable_sudo: self.disable_sudo,
            program: self.sampler_program.clone(),
            command: self.sampler_command.clone(),
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
        }
    }

    /// Whether the run needs `sudo` up front.
    pub fn uses_sudo(&self) -> bool {
        self.sampler_command.is_none() && !self.disable_sudo
    }

    pub fn schedule(&self) -> RunSchedule {
        RunSchedule::new(
            self.applications.len(),
            self.windows.len(),
            self.dwell(),
            self.delays.clone(),
        )
    }

    pub fn logical_windows(&self) -> Vec<LogicalWindow> {
        LogicalWindow::for_labels(&self.windows, self.dwell(), self.tracker_options().interval_ms())
    }

    pub fn estimator(&self) -> ProgressEstimator {
        let max_skips = (self.max_silent_skips > 0).then_some(self.max_silent_skips);
        ProgressEstimator::new(self.schedule().total_steps())
            .with_drift_threshold(Duration::from_secs(self.drift_threshold_secs))
            .with_max_silent_skips(max_skips)
    }
}
