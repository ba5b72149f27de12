// Data structures for energy telemetry

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::constants::{ENERGY_UNIT, MS_PER_HOUR, POWER_UNIT};

/// One power reading in milliwatts. Its timestamp is implicit: the sample's
/// position in the sequence times the sampling interval.
pub type EnergySample = u32;

/// Summary of one finished tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyResult {
    pub average_power: f64,
    pub average_power_unit: String,
    pub total_energy: f64,
    pub total_energy_unit: String,
    pub max_power: EnergySample,
    pub sample_interval: u64,
    pub sample_count: usize,
    pub raw_samples: Vec<EnergySample>,
}

impl EnergyResult {
    /// The result reported when no usable telemetry was captured.
    pub fn empty() -> Self {
        Self {
            average_power: 0.0,
            average_power_unit: POWER_UNIT.to_string(),
            total_energy: 0.0,
            total_energy_unit: ENERGY_UNIT.to_string(),
            max_power: 0,
            sample_interval: 0,
            sample_count: 0,
            raw_samples: Vec::new(),
        }
    }

    pub fn from_samples(samples: Vec<EnergySample>, sample_interval_ms: u64) -> Self {
        let count = samples.len();
        if count == 0 {
            return Self::empty();
        }

        let sum_mw: u64 = samples.iter().map(|&s| u64::from(s)).sum();
        let interval = sample_interval_ms as f64;
        let total_energy = sum_mw as f64 * interval / MS_PER_HOUR;
        // Inverse of the energy formula over the observed duration
        let average_power = total_energy * MS_PER_HOUR / (count as f64 * interval);
        let max_power = samples.iter().copied().max().unwrap_or(0);

        Self {
            average_power,
            average_power_unit: POWER_UNIT.to_string(),
            total_energy,
            total_energy_unit: ENERGY_UNIT.to_string(),
            max_power,
            sample_interval: sample_interval_ms,
            sample_count: count,
            raw_samples: samples,
        }
    }

    pub fn has_data(&self) -> bool {
        self.sample_count > 0
    }

    /// Wall time covered by the samples, assuming a constant interval.
    pub fn observed_duration(&self) -> Duration {
        Duration::from_millis(self.sample_interval * self.sample_count as u64)
    }
}

/// A span of wall-clock time during which one page or site was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalWindow {
    pub index: usize,
    pub label: String,
    pub expected_samples: usize,
}

impl LogicalWindow {
    pub fn new(index: usize, label: impl Into<String>, dwell: Duration, sample_interval_ms: u64) -> Self {
        Self::with_expected(index, label, expected_samples(dwell, sample_interval_ms))
    }

    pub fn with_expected(index: usize, label: impl Into<String>, expected_samples: usize) -> Self {
        Self {
            index,
            label: label.into(),
            expected_samples: expected_samples.max(1),
        }
    }

    /// One window per label, all sharing the same dwell duration.
    pub fn for_labels<S: AsRef<str>>(labels: &[S], dwell: Duration, sample_interval_ms: u64) -> Vec<Self> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| Self::new(i, label.as_ref(), dwell, sample_interval_ms))
            .collect()
    }
}

/// Number of samples a window of `dwell` should hold, rounded, at least one.
pub fn expected_samples(dwell: Duration, sample_interval_ms: u64) -> usize {
    let interval = sample_interval_ms.max(1) as f64;
    let count = (dwell.as_millis() as f64 / interval).round() as usize;
    count.max(1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowAverage {
    pub index: usize,
    pub label: String,
    pub avg: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSamples {
    pub index: usize,
    pub label: String,
    pub samples: Vec<EnergySample>,
}

/// Everything measured for one application session, as handed to reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub label: String,
    pub has_data: bool,
    #[serde(flatten)]
    pub energy: EnergyResult,
    pub average_per_window: Vec<WindowAverage>,
    pub raw_samples_per_window: Vec<WindowSamples>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionReport {
    /// A session that never produced telemetry, e.g. because the sampler failed to start.
    pub fn failed(label: impl Into<String>, error: impl ToString) -> Self {
        Self {
            label: label.into(),
            has_data: false,
            energy: EnergyResult::empty(),
            average_per_window: Vec::new(),
            raw_samples_per_window: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}
