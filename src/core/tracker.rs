// Energy tracker - owns one sampler process and its stdout reader

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::constants::*;
use crate::core::error::{BenchError, Result};
use crate::core::format::EnergyResult;
use crate::core::ready::{Ready, ReadySignal};
use crate::core::sample_log::SampleLog;

#[derive(Debug, Clone)]
pub struct TrackerOptions {
    /// Requested spacing between samples, passed to the sampler as `-i`.
    pub sample_interval_ms: u64,
    /// Sampler set passed as `--samplers`. Combined power lives in `cpu_power`.
    pub samplers: Vec<String>,
    /// Run the sampler without `sudo`. Usually fails unless the user holds
    /// the needed entitlements.
    pub disable_sudo: bool,
    pub program: String,
    /// Full argv that replaces the generated invocation when set.
    pub command: Option<Vec<String>>,
    /// Upper bound on each teardown wait (process exit, stream drain).
    pub stop_timeout: Duration,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            samplers: DEFAULT_SAMPLERS.iter().map(|s| s.to_string()).collect(),
            disable_sudo: false,
            program: SAMPLER_PROGRAM.to_string(),
            command: None,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

impl TrackerOptions {
    pub fn interval_ms(&self) -> u64 {
        self.sample_interval_ms.max(1)
    }

    pub fn argv(&self) -> Vec<String> {
        if let Some(command) = &self.command {
            return command.clone();
        }

        let samplers = if self.samplers.is_empty() {
            DEFAULT_SAMPLERS.join(",")
        } else {
            self.samplers.join(",")
        };

        let mut argv = Vec::with_capacity(6);
        if !self.disable_sudo {
            argv.push(SUDO_PROGRAM.to_string());
        }
        argv.extend([
            self.program.clone(),
            "--samplers".to_string(),
            samplers,
            "-i".to_string(),
            self.interval_ms().to_string(),
        ]);
        argv
    }
}

/// What teardown managed to do. Failures are logged, never returned.
#[derive(Debug, Clone, Default)]
pub struct DrainOutcome {
    pub exit_status: Option<ExitStatus>,
    pub reader_finished: bool,
}

/// A running tracking session.
pub struct EnergyTracker {
    child: Child,
    reader: Option<JoinHandle<()>>,
    log: Arc<SampleLog>,
    ready: ReadySignal,
    sample_interval_ms: u64,
    stop_timeout: Duration,
    pid: Option<u32>,
}

impl EnergyTracker {
    /// Spawns the sampler and starts consuming its stdout. Must be called
    /// from within a Tokio runtime.
    pub fn start(options: &TrackerOptions) -> Result<Self> {
        let argv = options.argv();
        let (program, args) = argv.split_first().ok_or(BenchError::EmptyCommand)?;

        let mut command = Command::new(program);
        command.args(args);

        Self::spawn(command, program, options.interval_ms(), options.stop_timeout)
    }

    fn spawn(mut command: Command, program: &str, sample_interval_ms: u64, stop_timeout: Duration) -> Result<Self> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| BenchError::Spawn {
            program: program.to_string(),
            source,
        })?;
        let pid = child.id();

        let log = Arc::new(SampleLog::new());
        let ready = ReadySignal::new();

        let reader = match child.stdout.take() {
            Some(stdout) => {
                let log = log.clone();
                let ready = ready.clone();
                Some(tokio::spawn(async move {
                    if let Err(e) = pump_stdout(stdout, &log, &ready).await {
                        warn!("Sampler stream read failed: {}", e);
                    }
                    // Resolve even with zero samples so waiters never hang
                    ready.fire();
                }))
            }
            None => {
                ready.fire();
                None
            }
        };

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        info!("Sampler started (PID: {:?}, interval {} ms)", pid, sample_interval_ms);

        Ok(Self {
            child,
            reader,
            log,
            ready,
            sample_interval_ms,
            stop_timeout,
            pid,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn sample_interval_ms(&self) -> u64 {
        self.sample_interval_ms
    }

    /// Resolves on the first sample, or when the stream ends without one.
    pub fn ready(&self) -> Ready {
        self.ready.subscribe()
    }

    pub fn sample_count(&self) -> usize {
        self.log.len()
    }

    /// Terminates the sampler and summarizes what it produced. Never fails:
    /// teardown problems leave a partial (or empty) result.
    pub async fn stop_tracking(mut self) -> EnergyResult {
        self.ready.fire();

        let outcome = drain_best_effort(&mut self.child, self.reader.take(), self.stop_timeout).await;
        debug!(
            "Sampler teardown: exit={:?}, reader_finished={}",
            outcome.exit_status, outcome.reader_finished
        );

        self.log.flush();
        let samples = self.log.take();
        info!("Sampler stopped with {} samples", samples.len());

        EnergyResult::from_samples(samples, self.sample_interval_ms)
    }
}

/// Reads `stdout` to the end, feeding every chunk through the sample log.
pub async fn pump_stdout<R>(mut stdout: R, log: &SampleLog, ready: &ReadySignal) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let n = stdout.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        if log.ingest(&chunk[..n]) > 0 {
            ready.fire();
        }
    }

    // Last line without a trailing newline
    if log.flush() > 0 {
        ready.fire();
    }
    Ok(())
}

async fn forward_stderr<R>(stderr: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("sampler stderr: {}", line);
    }
}

/// Tries to stop the sampler and let its reader finish, giving each step at
/// most `timeout`. Logs and moves on when a step fails.
pub async fn drain_best_effort(child: &mut Child, reader: Option<JoinHandle<()>>, timeout: Duration) -> DrainOutcome {
    let mut outcome = DrainOutcome::default();

    if let Err(e) = request_termination(child) {
        debug!("Sampler termination request failed (already exited?): {}", e);
    }

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => outcome.exit_status = Some(status),
        Ok(Err(e)) => warn!("Waiting for sampler exit failed: {}", e),
        Err(_) => warn!("Sampler did not exit within {:?}", timeout),
    }

    if let Some(mut handle) = reader {
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(())) => outcome.reader_finished = true,
            Ok(Err(e)) => warn!("Sampler reader task failed: {}", e),
            Err(_) => {
                warn!("Sampler stream did not drain within {:?}", timeout);
                handle.abort();
            }
        }
    }

    outcome
}

// SIGTERM lets sudo relay the signal to the sampler it started.
#[cfg(unix)]
fn request_termination(child: &mut Child) -> std::io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}
