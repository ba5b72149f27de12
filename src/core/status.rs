// Single live status line with a periodic countdown redraw

use std::io::{IsTerminal, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::constants::REDRAW_INTERVAL;
use crate::core::progress::{ProgressEstimator, Recalibration};

/// Human-readable duration. Above one hour only hours and minutes are shown.
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        return if minutes > 0 {
            format!("{}h {}m", hours, minutes)
        } else {
            format!("{}h", hours)
        };
    }
    if minutes > 0 {
        return if seconds > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}m", minutes)
        };
    }
    format!("{}s", seconds)
}

/// One line kept at the bottom of stderr and rewritten in place. When stderr
/// is not a terminal, announcements become ordinary log lines and redraws
/// are dropped.
#[derive(Debug)]
pub struct StatusLine {
    interactive: bool,
}

impl StatusLine {
    pub fn detect() -> Self {
        Self {
            interactive: std::io::stderr().is_terminal(),
        }
    }

    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Shows a new status.
    pub fn announce(&self, text: &str) {
        if self.interactive {
            self.write_in_place(text);
        } else {
            info!("{}", text);
        }
    }

    /// Refreshes the line; no-op off a terminal.
    pub fn redraw(&self, text: &str) {
        if self.interactive {
            self.write_in_place(text);
        }
    }

    pub fn clear(&self) {
        if self.interactive {
            let mut err = std::io::stderr().lock();
            let _ = write!(err, "\x1b[2K\r");
            let _ = err.flush();
        }
    }

    fn write_in_place(&self, text: &str) {
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\x1b[2K\r{}", text);
        let _ = err.flush();
    }
}

/// Drives a [`ProgressEstimator`] for a running workflow and keeps the
/// status line ticking once per second while a deadline exists.
pub struct LiveProgress {
    estimator: Arc<Mutex<ProgressEstimator>>,
    status: Arc<StatusLine>,
    ticker: Option<JoinHandle<()>>,
    started: Instant,
}

impl LiveProgress {
    pub fn new(estimator: ProgressEstimator, status: StatusLine) -> Self {
        Self {
            estimator: Arc::new(Mutex::new(estimator)),
            status: Arc::new(status),
            ticker: None,
            started: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProgressEstimator> {
        lock_estimator(&self.estimator)
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.lock().tick(Instant::now())
    }

    pub fn snapshot(&self) -> ProgressEstimator {
        self.lock().clone()
    }

    pub fn advance(&mut self, completed: usize, total: usize) {
        let now = Instant::now();
        let text = {
            let mut estimator = self.lock();
            estimator.advance(completed, total, now - self.started, now);
            estimator.status_text(now)
        };
        if let Some(text) = text {
            self.status.announce(&text);
            self.ensure_ticker();
        }
    }

    /// Checkpoint against a schedule estimate of the time left.
    pub fn recalibrate(&mut self, remaining_estimate: Duration, completed: usize) -> Recalibration {
        let now = Instant::now();
        let (outcome, text) = {
            let mut estimator = self.lock();
            let outcome = estimator.recalibrate(completed, remaining_estimate, now);
            (outcome, estimator.status_text(now))
        };

        match outcome {
            Recalibration::Replaced { drift_ms } => {
                warn!(
                    "[Monitor] ETC drift {:+}s vs previous estimate. Recalibrating.",
                    drift_secs(drift_ms)
                );
            }
            Recalibration::Forced { drift_ms, skips } => {
                debug!("ETC replaced after {} small drifts (last {:+} ms)", skips, drift_ms);
            }
            Recalibration::Initialized | Recalibration::Kept { .. } => {}
        }

        if let Some(text) = text {
            self.status.announce(&text);
            self.ensure_ticker();
        }
        outcome
    }

    /// Clears the deadline, cancels the redraw task and wipes the line.
    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.lock().stop();
        self.status.clear();
    }

    fn ensure_ticker(&mut self) {
        if self.is_ticking() {
            return;
        }
        let estimator = self.estimator.clone();
        let status = self.status.clone();
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(REDRAW_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                let text = lock_estimator(&estimator).status_text(Instant::now());
                if let Some(text) = text {
                    status.redraw(&text);
                }
            }
        }));
    }
}

impl Drop for LiveProgress {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

/// Drift in whole seconds, rounded to nearest.
fn drift_secs(drift_ms: i64) -> i64 {
    (drift_ms as f64 / 1000.0).round() as i64
}

fn lock_estimator(estimator: &Mutex<ProgressEstimator>) -> MutexGuard<'_, ProgressEstimator> {
    estimator.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
