// Planned run timeline, derived purely from configured delays

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::constants::*;
use crate::core::segment::pre_roll_samples;

/// Fixed waits around each measured unit, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseDelays {
    pub sampler_startup_ms: u64,
    pub app_launch_ms: u64,
    pub window_close_ms: u64,
    pub app_quit_ms: u64,
    pub sampler_stop_ms: u64,
}

impl Default for PhaseDelays {
    fn default() -> Self {
        Self {
            sampler_startup_ms: SAMPLER_STARTUP_DELAY_MS,
            app_launch_ms: APP_LAUNCH_DELAY_MS,
            window_close_ms: WINDOW_CLOSE_DELAY_MS,
            app_quit_ms: APP_QUIT_DELAY_MS,
            sampler_stop_ms: SAMPLER_STOP_DELAY_MS,
        }
    }
}

impl PhaseDelays {
    pub fn sampler_startup(&self) -> Duration {
        Duration::from_millis(self.sampler_startup_ms)
    }

    pub fn app_launch(&self) -> Duration {
        Duration::from_millis(self.app_launch_ms)
    }

    pub fn window_close(&self) -> Duration {
        Duration::from_millis(self.window_close_ms)
    }

    pub fn app_quit(&self) -> Duration {
        Duration::from_millis(self.app_quit_ms)
    }

    pub fn sampler_stop(&self) -> Duration {
        Duration::from_millis(self.sampler_stop_ms)
    }

    /// Waits between sampler start and the first window.
    pub fn setup(&self) -> [Duration; 2] {
        [self.sampler_startup(), self.app_launch()]
    }
}

/// The whole run: `units` applications, each visiting `windows_per_unit`
/// windows for `dwell`.
#[derive(Debug, Clone)]
pub struct RunSchedule {
    pub units: usize,
    pub windows_per_unit: usize,
    pub dwell: Duration,
    pub delays: PhaseDelays,
}

impl RunSchedule {
    pub fn new(units: usize, windows_per_unit: usize, dwell: Duration, delays: PhaseDelays) -> Self {
        Self {
            units,
            windows_per_unit,
            dwell,
            delays,
        }
    }

    pub fn total_steps(&self) -> usize {
        self.units * self.windows_per_unit
    }

    pub fn per_unit(&self) -> Duration {
        let per_window = self.dwell + self.delays.window_close();
        self.delays.sampler_startup()
            + self.delays.app_launch()
            + per_window * self.windows_per_unit as u32
            + self.delays.app_quit()
            + self.delays.sampler_stop()
    }

    pub fn planned_total(&self) -> Duration {
        self.per_unit() * self.units as u32
    }

    /// Planned time left when unit `unit_index` is about to start.
    pub fn remaining_from(&self, unit_index: usize) -> Duration {
        self.per_unit() * self.units.saturating_sub(unit_index) as u32
    }

    pub fn pre_roll_samples(&self, sample_interval_ms: u64) -> usize {
        pre_roll_samples(&self.delays.setup(), sample_interval_ms)
    }
}
