use chrono::{DateTime, TimeDelta, Utc};
use std::path::Path;
use std::thread;
use std::time::Instant;

use crate::models::{LifecycleState, ProcessRecord, ProcessStats, ProcessStatus, ProjectIdentity, ServerConfig};
use crate::services::{process_checker, spawner, LifecycleError, Registry, StatsCollector};
use crate::settings::Settings;

/// OS primitives the lifecycle manager drives
pub trait ProcessOps {
    fn spawn(
        &self,
        command: &[String],
        working_dir: &Path,
        env: &[(String, String)],
        log_path: &Path,
    ) -> Result<(u32, DateTime<Utc>), LifecycleError>;

    /// Must not fail for a pid that no longer exists
    fn is_alive(&self, pid: u32) -> bool;

    fn signal_stop(&self, pid: u32) -> Result<(), LifecycleError>;

    /// When `pid` started; `None` when the OS cannot tell
    fn start_time(&self, pid: u32) -> Option<DateTime<Utc>>;

    /// Best effort; `MetricsUnavailable` when the OS cannot report
    fn metrics(&self, pid: u32) -> Result<ProcessStats, LifecycleError>;
}

/// [`ProcessOps`] backed by the real process table
#[derive(Default)]
pub struct SystemProcesses {
    stats: StatsCollector,
}

impl ProcessOps for SystemProcesses {
    fn spawn(
        &self,
        command: &[String],
        working_dir: &Path,
        env: &[(String, String)],
        log_path: &Path,
    ) -> Result<(u32, DateTime<Utc>), LifecycleError> {
        spawner::spawn_detached(command, working_dir, env, log_path)
    }

    fn is_alive(&self, pid: u32) -> bool {
        process_checker::is_alive(pid)
    }

    fn signal_stop(&self, pid: u32) -> Result<(), LifecycleError> {
        spawner::signal_stop(pid)
    }

    fn start_time(&self, pid: u32) -> Option<DateTime<Utc>> {
        process_checker::start_time(pid)
    }

    fn metrics(&self, pid: u32) -> Result<ProcessStats, LifecycleError> {
        self.stats
            .collect_stats(pid)
            .ok_or(LifecycleError::MetricsUnavailable { pid })
    }
}

/// Largest gap between a record's `started_at` and the OS start time of its
/// pid that still counts as the same process
const START_TIME_SLACK_SECS: i64 = 10;

/// Starts, stops and reports on one server per project.
///
/// The registry record is only a hint: every operation re-checks liveness
/// with the OS and deletes records whose process is gone.
pub struct LifecycleManager<P = SystemProcesses> {
    registry: Registry,
    ops: P,
    settings: Settings,
}

impl LifecycleManager<SystemProcesses> {
    pub fn new(settings: Settings) -> Self {
        Self::with_ops(settings, SystemProcesses::default())
    }
}

impl<P: ProcessOps> LifecycleManager<P> {
    pub fn with_ops(settings: Settings, ops: P) -> Self {
        Self {
            registry: Registry::new(settings.state_dir_name.clone()),
            ops,
            settings,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Spawn the server and record it
    pub fn start(&self, identity: &ProjectIdentity, config: &ServerConfig) -> Result<ProcessRecord, LifecycleError> {
        if let Some(record) = self.registry.load(identity)? {
            if self.owns_live_process(&record) {
                return Err(LifecycleError::AlreadyRunning { pid: record.pid });
            }
            log::warn!("Removing stale record for '{}' (PID {} is gone or reused)", identity.name, record.pid);
            self.registry.delete(identity)?;
        }

        self.transition(identity, LifecycleState::Stopped, LifecycleState::Starting);

        let command = config.command_line();
        let log_path = self.registry.log_path(identity);
        let (pid, started_at) = self.ops.spawn(&command, identity.root(), &config.env(), &log_path)?;

        if !self.settings.startup_grace.is_zero() {
            thread::sleep(self.settings.startup_grace);
        }
        if !self.ops.is_alive(pid) {
            return Err(LifecycleError::Spawn {
                command: command.join(" "),
                source: std::io::Error::other(format!(
                    "process exited immediately, see {}",
                    log_path.display()
                )),
            });
        }

        let record = ProcessRecord::new(identity, pid, started_at, config, command);
        if let Err(err) = self.registry.save(&record) {
            // An unrecorded server could never be stopped through us
            if let Err(stop_err) = self.ops.signal_stop(pid) {
                log::warn!("Failed to stop unrecorded PID {}: {}", pid, stop_err);
            }
            return Err(err);
        }

        self.transition(identity, LifecycleState::Starting, LifecycleState::Running);
        Ok(record)
    }

    /// Terminate the server and forget it; returns the record it had
    pub fn stop(&self, identity: &ProjectIdentity) -> Result<ProcessRecord, LifecycleError> {
        let record = self.registry.load(identity)?.ok_or(LifecycleError::NotRunning)?;

        if !self.owns_live_process(&record) {
            log::warn!("Removing stale record for '{}' (PID {} is gone or reused)", identity.name, record.pid);
            self.registry.delete(identity)?;
            return Err(LifecycleError::NotRunning);
        }

        self.transition(identity, LifecycleState::Running, LifecycleState::Stopping);
        self.ops.signal_stop(record.pid)?;

        if !self.wait_for_exit(record.pid) {
            // Record stays: the server is still accurately running
            return Err(LifecycleError::StopTimeout {
                pid: record.pid,
                waited: self.settings.stop_timeout,
            });
        }

        self.registry.delete(identity)?;
        self.transition(identity, LifecycleState::Stopping, LifecycleState::Stopped);
        Ok(record)
    }

    /// Fresh status; never cached
    pub fn status(&self, identity: &ProjectIdentity) -> Result<ProcessStatus, LifecycleError> {
        let Some(record) = self.registry.load(identity)? else {
            return Ok(ProcessStatus::stopped());
        };

        if !self.owns_live_process(&record) {
            log::warn!("Removing stale record for '{}' (PID {} is gone or reused)", identity.name, record.pid);
            self.registry.delete(identity)?;
            return Ok(ProcessStatus::stopped());
        }

        let uptime = record.uptime(Utc::now());
        let stats = match self.ops.metrics(record.pid) {
            Ok(stats) => Some(stats),
            Err(LifecycleError::MetricsUnavailable { pid }) => {
                log::debug!("Metrics unavailable for PID {}", pid);
                None
            }
            Err(err) => return Err(err),
        };

        Ok(ProcessStatus::running(record.pid, uptime, stats))
    }

    /// Poll with doubling backoff until `pid` exits or the stop timeout elapses.
    /// A timeout too large to represent as an instant waits without a deadline.
    fn wait_for_exit(&self, pid: u32) -> bool {
        let deadline = Instant::now().checked_add(self.settings.stop_timeout);
        let mut delay = self.settings.poll_interval;

        loop {
            if !self.ops.is_alive(pid) {
                return true;
            }
            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        log::warn!("PID {} still alive after {:?}", pid, self.settings.stop_timeout);
                        return false;
                    }
                    delay.min(deadline - now)
                }
                None => delay,
            };
            thread::sleep(pause);
            delay = delay.saturating_mul(2).min(self.settings.max_poll_interval);
        }
    }

    /// The record's pid is alive and is still the process the record was
    /// written for. A recycled pid with a different start time is not.
    fn owns_live_process(&self, record: &ProcessRecord) -> bool {
        if !self.ops.is_alive(record.pid) {
            return false;
        }
        match self.ops.start_time(record.pid) {
            Some(actual) => {
                let drift = actual - record.started_at;
                if drift.abs() > TimeDelta::seconds(START_TIME_SLACK_SECS) {
                    log::warn!(
                        "PID {} was reused: it started at {}, the record says {}",
                        record.pid,
                        actual,
                        record.started_at
                    );
                    return false;
                }
                true
            }
            None => {
                log::debug!("No start time for PID {}; trusting the pid alone", record.pid);
                true
            }
        }
    }

    fn transition(&self, identity: &ProjectIdentity, from: LifecycleState, to: LifecycleState) {
        log::debug!("'{}': {:?} -> {:?}", identity.name, from, to);
    }
}
