// Drift-corrected completion estimate for a long multi-step run

use std::time::Duration;
use tokio::time::Instant;

use crate::core::constants::{DEFAULT_DRIFT_THRESHOLD, DEFAULT_MAX_SILENT_SKIPS};
use crate::core::status::format_remaining;

/// What a schedule checkpoint did to the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recalibration {
    /// No deadline existed; the schedule estimate became the deadline.
    Initialized,
    /// Drift exceeded the threshold and the deadline was replaced.
    Replaced { drift_ms: i64 },
    /// Drift stayed within the threshold; the old deadline stands.
    Kept { drift_ms: i64 },
    /// Too many consecutive small drifts; replaced without a warning.
    Forced { drift_ms: i64, skips: u32 },
}

/// Tracks completed steps and holds one completion deadline.
///
/// The deadline is fixed from the observed pace the first time a step
/// completes and afterwards only moves through [`recalibrate`]. Ticks read
/// the deadline but never recompute pace, so the countdown cannot jitter
/// upward between checkpoints.
///
/// [`recalibrate`]: ProgressEstimator::recalibrate
#[derive(Debug, Clone)]
pub struct ProgressEstimator {
    completed_steps: usize,
    total_steps: usize,
    deadline: Option<Instant>,
    drift_threshold: Duration,
    // `None` keeps the threshold strict forever
    max_silent_skips: Option<u32>,
    silent_skips: u32,
    last_displayed: Option<Duration>,
}

impl ProgressEstimator {
    pub fn new(total_steps: usize) -> Self {
        Self {
            completed_steps: 0,
            total_steps,
            deadline: None,
            drift_threshold: DEFAULT_DRIFT_THRESHOLD,
            max_silent_skips: Some(DEFAULT_MAX_SILENT_SKIPS),
            silent_skips: 0,
            last_displayed: None,
        }
    }

    pub fn with_drift_threshold(mut self, threshold: Duration) -> Self {
        self.drift_threshold = threshold;
        self
    }

    pub fn with_max_silent_skips(mut self, max: Option<u32>) -> Self {
        self.max_silent_skips = max;
        self
    }

    pub fn completed_steps(&self) -> usize {
        self.completed_steps
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn last_displayed(&self) -> Option<Duration> {
        self.last_displayed
    }

    /// Records a completed step. `elapsed` is wall time since the run began.
    /// Returns the remaining time to display, or `None` before any step.
    pub fn advance(&mut self, completed: usize, total: usize, elapsed: Duration, now: Instant) -> Option<Duration> {
        if completed == 0 {
            return None;
        }
        self.completed_steps = completed;
        self.total_steps = total;

        if self.deadline.is_none() {
            let per_step = elapsed.as_secs_f64() / completed as f64;
            let remaining_steps = total.saturating_sub(completed) as f64;
            let remaining = Duration::from_secs_f64(per_step * remaining_steps);
            self.deadline = Some(now + remaining);
        }

        self.tick(now)
    }

    /// Remaining time read off the fixed deadline, floored at zero.
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        let remaining = self.deadline?.saturating_duration_since(now);
        self.last_displayed = Some(remaining);
        Some(remaining)
    }

    /// Compares a schedule-based estimate against the held deadline and
    /// replaces it when they diverge by more than the drift threshold.
    pub fn recalibrate(&mut self, completed: usize, remaining_estimate: Duration, now: Instant) -> Recalibration {
        self.completed_steps = completed;
        let candidate = now + remaining_estimate;
        let Some(current) = self.deadline else {
            self.deadline = Some(candidate);
            self.silent_skips = 0;
            return Recalibration::Initialized;
        };

        let drift_ms = signed_millis(candidate, current);
        let drift = Duration::from_millis(drift_ms.unsigned_abs());

        if drift > self.drift_threshold {
            self.deadline = Some(candidate);
            self.silent_skips = 0;
            return Recalibration::Replaced { drift_ms };
        }

        if drift_ms != 0 {
            if let Some(max) = self.max_silent_skips.filter(|&m| m > 0) {
                if self.silent_skips >= max {
                    let skips = self.silent_skips;
                    self.deadline = Some(candidate);
                    self.silent_skips = 0;
                    return Recalibration::Forced { drift_ms, skips };
                }
                self.silent_skips += 1;
            }
        }

        Recalibration::Kept { drift_ms }
    }

    /// Clears the deadline. Nothing is displayed until a new one is set.
    pub fn stop(&mut self) {
        self.deadline = None;
        self.silent_skips = 0;
        self.last_displayed = None;
    }

    /// Status line for the current state, if a deadline exists.
    pub fn status_text(&mut self, now: Instant) -> Option<String> {
        let remaining = self.tick(now)?;
        Some(format!(
            "[Monitor]  Step {}/{} complete. ETC: {}",
            self.completed_steps,
            self.total_steps,
            format_remaining(remaining)
        ))
    }
}

fn signed_millis(a: Instant, b: Instant) -> i64 {
    if a >= b {
        (a - b).as_millis() as i64
    } else {
        -((b - a).as_millis() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn test_deadline_fixed_from_pace() {
        let start = Instant::now();
        let mut estimator = ProgressEstimator::new(10);
        assert_eq!(estimator.advance(0, 10, Duration::ZERO, start), None);

        let now = start + 50 * SEC;
        let remaining = estimator.advance(5, 10, 50 * SEC, now).unwrap();
        assert_eq!(remaining, 50 * SEC);
        assert_eq!(estimator.deadline(), Some(now + 50 * SEC));

        // A slower later step does not move the deadline
        let later = now + 30 * SEC;
        let remaining = estimator.advance(6, 10, 80 * SEC, later).unwrap();
        assert_eq!(remaining, 20 * SEC);
        assert_eq!(estimator.deadline(), Some(now + 50 * SEC));
        assert_eq!(estimator.completed_steps(), 6);
    }

    #[test]
    fn test_ticks_never_increase() {
        let start = Instant::now();
        let mut estimator = ProgressEstimator::new(4);
        estimator.advance(1, 4, 10 * SEC, start);

        let mut previous = estimator.tick(start).unwrap();
        for i in 1..40 {
            let shown = estimator.tick(start + i * SEC).unwrap();
            assert!(shown <= previous);
            previous = shown;
        }
        assert_eq!(previous, Duration::ZERO);
    }

    #[test]
    fn test_recalibration_threshold() {
        let now = Instant::now();
        let mut estimator = ProgressEstimator::new(10).with_max_silent_skips(None);
        estimator.advance(5, 10, 50 * SEC, now);

        // |40 - 50| = 10s > 3s
        let outcome = estimator.recalibrate(5, 40 * SEC, now);
        assert_eq!(outcome, Recalibration::Replaced { drift_ms: -10_000 });
        assert_eq!(estimator.deadline(), Some(now + 40 * SEC));

        let outcome = estimator.recalibrate(5, 42 * SEC, now);
        assert_eq!(outcome, Recalibration::Kept { drift_ms: 2_000 });
        assert_eq!(estimator.deadline(), Some(now + 40 * SEC));

        // Exactly the threshold is not enough
        let outcome = estimator.recalibrate(5, 43 * SEC, now);
        assert_eq!(outcome, Recalibration::Kept { drift_ms: 3_000 });

        let mut wide = ProgressEstimator::new(10).with_drift_threshold(15 * SEC);
        wide.advance(5, 10, 50 * SEC, now);
        assert_eq!(wide.recalibrate(5, 40 * SEC, now), Recalibration::Kept { drift_ms: -10_000 });
        assert_eq!(wide.deadline(), Some(now + 50 * SEC));
    }

    #[test]
    fn test_recalibrate_without_deadline() {
        let now = Instant::now();
        let mut estimator = ProgressEstimator::new(3);
        assert_eq!(estimator.recalibrate(0, 90 * SEC, now), Recalibration::Initialized);
        assert_eq!(estimator.tick(now), Some(90 * SEC));
    }

    #[test]
    fn test_silent_skips_are_bounded() {
        let now = Instant::now();
        let mut estimator = ProgressEstimator::new(10).with_max_silent_skips(Some(2));
        estimator.recalibrate(0, 100 * SEC, now);

        assert!(matches!(estimator.recalibrate(0, 101 * SEC, now), Recalibration::Kept { .. }));
        assert!(matches!(estimator.recalibrate(0, 101 * SEC, now), Recalibration::Kept { .. }));
        assert_eq!(
            estimator.recalibrate(0, 101 * SEC, now),
            Recalibration::Forced { drift_ms: 1_000, skips: 2 }
        );
        assert_eq!(estimator.deadline(), Some(now + 101 * SEC));

        // Zero drift never counts as a skip
        for _ in 0..5 {
            assert_eq!(estimator.recalibrate(0, 101 * SEC, now), Recalibration::Kept { drift_ms: 0 });
        }
    }

    #[test]
    fn test_recalibrate_records_completed() {
        let now = Instant::now();
        let mut estimator = ProgressEstimator::new(8);
        estimator.recalibrate(4, 60 * SEC, now);
        assert_eq!(estimator.completed_steps(), 4);
        assert_eq!(
            estimator.status_text(now).unwrap(),
            "[Monitor]  Step 4/8 complete. ETC: 1m"
        );
    }

    #[test]
    fn test_default_stays_strict_until_skip_bound() {
        let now = Instant::now();
        let mut estimator = ProgressEstimator::new(10);
        estimator.recalibrate(0, 100 * SEC, now);

        // Within-threshold drifts keep the deadline for the first five checkpoints
        for _ in 0..DEFAULT_MAX_SILENT_SKIPS {
            assert_eq!(
                estimator.recalibrate(0, 102 * SEC, now),
                Recalibration::Kept { drift_ms: 2_000 }
            );
            assert_eq!(estimator.deadline(), Some(now + 100 * SEC));
        }

        assert_eq!(
            estimator.recalibrate(0, 102 * SEC, now),
            Recalibration::Forced { drift_ms: 2_000, skips: DEFAULT_MAX_SILENT_SKIPS }
        );
        assert_eq!(estimator.deadline(), Some(now + 102 * SEC));
    }

    #[test]
    fn test_stop_clears_deadline() {
        let now = Instant::now();
        let mut estimator = ProgressEstimator::new(2);
        estimator.advance(1, 2, 5 * SEC, now);
        assert!(estimator.status_text(now).is_some());

        estimator.stop();
        assert_eq!(estimator.deadline(), None);
        assert_eq!(estimator.tick(now), None);
        assert_eq!(estimator.status_text(now), None);
    }

    #[test]
    fn test_status_text() {
        let now = Instant::now();
        let mut estimator = ProgressEstimator::new(10);
        estimator.advance(5, 10, 50 * SEC, now);
        assert_eq!(
            estimator.status_text(now).unwrap(),
            "[Monitor]  Step 5/10 complete. ETC: 50s"
        );
    }
}
