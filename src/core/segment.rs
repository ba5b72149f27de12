// Retroactive attribution of a flat sample stream to logical windows
//
// Slices are positional: the sampler's cadence is assumed to match the
// wall-clock dwell of every window. That holds on average, not per run, so
// the per-window figures are approximate.

use std::time::Duration;

use crate::core::format::{EnergySample, LogicalWindow, WindowAverage, WindowSamples};

/// Samples taken during setup before the first window opens.
pub fn pre_roll_samples(setup_delays: &[Duration], sample_interval_ms: u64) -> usize {
    let setup_ms: u128 = setup_delays.iter().map(Duration::as_millis).sum();
    (setup_ms as f64 / sample_interval_ms.max(1) as f64).round() as usize
}

/// Walks `windows` in order over the samples left after `pre_roll`, stopping
/// at the first window with no data.
fn segments<'a>(
    samples: &'a [EnergySample],
    windows: &'a [LogicalWindow],
    pre_roll: usize,
) -> impl Iterator<Item = (&'a LogicalWindow, &'a [EnergySample])> + 'a {
    let body = samples.get(pre_roll..).unwrap_or(&[]);
    let mut start = 0usize;

    windows.iter().map_while(move |window| {
        if start >= body.len() {
            return None;
        }
        let end = (start + window.expected_samples).min(body.len());
        let chunk = &body[start..end];
        start += window.expected_samples;
        if chunk.is_empty() {
            None
        } else {
            Some((window, chunk))
        }
    })
}

pub fn samples_per_window(samples: &[EnergySample], windows: &[LogicalWindow], pre_roll: usize) -> Vec<WindowSamples> {
    segments(samples, windows, pre_roll)
        .map(|(window, chunk)| WindowSamples {
            index: window.index,
            label: window.label.clone(),
            samples: chunk.to_vec(),
        })
        .collect()
}

pub fn averages_per_window(samples: &[EnergySample], windows: &[LogicalWindow], pre_roll: usize) -> Vec<WindowAverage> {
    segments(samples, windows, pre_roll)
        .map(|(window, chunk)| {
            let sum: u64 = chunk.iter().map(|&s| u64::from(s)).sum();
            WindowAverage {
                index: window.index,
                label: window.label.clone(),
                avg: sum as f64 / chunk.len() as f64,
                count: chunk.len(),
            }
        })
        .collect()
}
