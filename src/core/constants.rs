// Sampling and scheduling constants

use std::time::Duration;

pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 500;
pub const DEFAULT_SAMPLERS: &[&str] = &["cpu_power"];
pub const SAMPLER_PROGRAM: &str = "powermetrics";
pub const SUDO_PROGRAM: &str = "sudo";

// energy (mWh) = sum(mW) * dt(ms) / MS_PER_HOUR
pub const MS_PER_HOUR: f64 = 3_600_000.0;

pub const POWER_UNIT: &str = "mW";
pub const ENERGY_UNIT: &str = "mWh";

// Bytes requested per read from the sampler's stdout
pub const READ_CHUNK_SIZE: usize = 8 * 1024;

pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

// Live status redraw cadence
pub const REDRAW_INTERVAL: Duration = Duration::from_secs(1);

pub const DEFAULT_DRIFT_THRESHOLD: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_SILENT_SKIPS: u32 = 5;

// Phase delays (ms)
pub const SAMPLER_STARTUP_DELAY_MS: u64 = 2000;
pub const APP_LAUNCH_DELAY_MS: u64 = 5000;
pub const WINDOW_CLOSE_DELAY_MS: u64 = 500;
pub const APP_QUIT_DELAY_MS: u64 = 2000;
pub const SAMPLER_STOP_DELAY_MS: u64 = 500;

pub const DEFAULT_DWELL_SECS: u64 = 10;
