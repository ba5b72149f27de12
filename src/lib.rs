// Power bench engine
// Sampler telemetry, window attribution and progress estimation

pub mod core;

// Re-export main types
pub use core::error::{BenchError, Result};
pub use core::extract::extract_milliwatts;
pub use core::format::{EnergyResult, EnergySample, LogicalWindow, SessionReport, WindowAverage, WindowSamples};
pub use core::progress::{ProgressEstimator, Recalibration};
pub use core::ready::Ready;
pub use core::schedule::{PhaseDelays, RunSchedule};
pub use core::segment::{averages_per_window, pre_roll_samples, samples_per_window};
pub use core::status::{LiveProgress, StatusLine};
pub use core::tracker::{EnergyTracker, TrackerOptions};

#[cfg(test)]
mod tests {
    #[test]
    fn test_constants() {
        use crate::core::constants::*;
        assert_eq!(SAMPLER_PROGRAM, "powermetrics");
        assert_eq!(DEFAULT_SAMPLERS, &["cpu_power"]);
        assert_eq!(MS_PER_HOUR, 3_600_000.0);
    }
}
