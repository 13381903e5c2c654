use crate::models::ProcessStats;
use std::sync::Mutex;
use std::thread;
use sysinfo::{Pid, ProcessesToUpdate, System, MINIMUM_CPU_UPDATE_INTERVAL};

pub struct StatsCollector {
    system: Mutex<System>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    /// Sample memory and CPU for `pid`.
    ///
    /// CPU usage is a rate, so the process is refreshed twice with
    /// `MINIMUM_CPU_UPDATE_INTERVAL` in between. Returns `None` when the OS
    /// has no entry for the pid at either sample.
    pub fn collect_stats(&self, pid: u32) -> Option<ProcessStats> {
        let mut sys = self.system.lock().ok()?;

        let sysinfo_pid = Pid::from_u32(pid);
        let targets = [sysinfo_pid];

        sys.refresh_processes(ProcessesToUpdate::Some(&targets), true);
        sys.process(sysinfo_pid)?;

        thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_processes(ProcessesToUpdate::Some(&targets), true);

        let process = sys.process(sysinfo_pid)?;

        Some(ProcessStats {
            cpu_usage: process.cpu_usage(),
            memory_bytes: process.memory(),
        })
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}
