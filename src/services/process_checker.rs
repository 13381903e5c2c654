use chrono::{DateTime, Utc};
use sysinfo::{Pid, ProcessStatus as OsProcessStatus, ProcessesToUpdate, System};

/// Check whether `pid` refers to a live process.
///
/// Never fails: a pid the OS does not know is simply not alive. Zombies and
/// dead entries count as not alive, since an exited child that nobody has
/// reaped yet still occupies its slot in the process table.
pub fn is_alive(pid: u32) -> bool {
    // pid 0 addresses the caller's process group, not a process
    if pid == 0 {
        return false;
    }

    let sysinfo_pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[sysinfo_pid]), true);

    match sys.process(sysinfo_pid) {
        Some(process) => {
            let status = process.status();
            log::debug!("PID {} status: {:?}", pid, status);
            !matches!(status, OsProcessStatus::Zombie | OsProcessStatus::Dead)
        }
        None => false,
    }
}

/// When `pid` started, to the second. `None` if the process is unknown or
/// the platform does not report start times.
pub fn start_time(pid: u32) -> Option<DateTime<Utc>> {
    if pid == 0 {
        return None;
    }

    let sysinfo_pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[sysinfo_pid]), true);

    let secs = sys.process(sysinfo_pid)?.start_time();
    if secs == 0 {
        return None;
    }
    DateTime::from_timestamp(i64::try_from(secs).ok()?, 0)
}
