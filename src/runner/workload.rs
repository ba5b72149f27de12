use tracing::debug;

use power_bench::LogicalWindow;

/// The OS-automation side of a measured session: whatever launches the
/// application, navigates it, and shuts it down. Only the timing of these
/// calls matters to the measurement.
#[allow(async_fn_in_trait)]
pub trait Workload {
    async fn launch(&mut self, app: &str) -> anyhow::Result<()>;

    async fn open(&mut self, app: &str, window: &LogicalWindow) -> anyhow::Result<()>;

    async fn close(&mut self, app: &str) -> anyhow::Result<()>;

    async fn quit(&mut self, app: &str) -> anyhow::Result<()>;
}

/// Drives nothing. Every window measures whatever the machine does on its own.
#[derive(Debug, Default)]
pub struct IdleWorkload;

impl Workload for IdleWorkload {
    async fn launch(&mut self, app: &str) -> anyhow::Result<()> {
        debug!("[Test] (idle) launch {}", app);
        Ok(())
    }

    async fn open(&mut self, app: &str, window: &LogicalWindow) -> anyhow::Result<()> {
        debug!("[Test] (idle) {} open {}", app, window.label);
        Ok(())
    }

    async fn close(&mut self, app: &str) -> anyhow::Result<()> {
        debug!("[Test] (idle) {} close window", app);
        Ok(())
    }

    async fn quit(&mut self, app: &str) -> anyhow::Result<()> {
        debug!("[Test] (idle) quit {}", app);
        Ok(())
    }
}
