use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::services::error::LifecycleError;

/// Launch `command` as a detached background process.
///
/// The child gets its own session (unix) so it survives the invoking CLI and
/// terminal hang-ups, reads from `/dev/null` and appends stdout and stderr to
/// `log_path`. It is never waited on.
pub fn spawn_detached(
    command: &[String],
    working_dir: &Path,
    env: &[(String, String)],
    log_path: &Path,
) -> Result<(u32, DateTime<Utc>), LifecycleError> {
    let display = command.join(" ");
    let spawn_err = |source: io::Error| LifecycleError::Spawn {
        command: display.clone(),
        source,
    };

    let (program, args) = command
        .split_first()
        .ok_or_else(|| spawn_err(io::Error::new(io::ErrorKind::InvalidInput, "empty command")))?;

    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).map_err(spawn_err)?;
    }
    let stdout = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(spawn_err)?;
    let stderr = stdout.try_clone().map_err(spawn_err)?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(working_dir)
        .envs(env.iter().map(|(key, value)| (key, value)))
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // SAFETY: setsid is async-signal-safe and touches no parent state
        unsafe {
            cmd.pre_exec(|| nix::unistd::setsid().map(|_| ()).map_err(io::Error::from));
        }
    }

    let started_at = Utc::now();
    let child = cmd.spawn().map_err(spawn_err)?;
    let pid = child.id();
    log::info!("Spawned `{}` as PID {} in {}", display, pid, working_dir.display());

    Ok((pid, started_at))
}

/// Ask `pid` (and its process group) to terminate gracefully.
///
/// A process that is already gone is not an error.
#[cfg(unix)]
pub fn signal_stop(pid: u32) -> Result<(), LifecycleError> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    // pid 0 and out-of-range values would address whole groups
    let Ok(raw) = i32::try_from(pid) else {
        return Ok(());
    };
    if raw <= 0 {
        return Ok(());
    }
    let target = Pid::from_raw(raw);
    let signal_err = |errno: Errno| LifecycleError::Signal {
        pid,
        source: io::Error::from(errno),
    };

    match killpg(target, Signal::SIGTERM) {
        Ok(()) => {
            log::debug!("Sent SIGTERM to process group {}", pid);
            Ok(())
        }
        // Not a group leader, or nothing left: fall back to the process itself
        Err(Errno::ESRCH) => match kill(target, Signal::SIGTERM) {
            Ok(()) => {
                log::debug!("Sent SIGTERM to PID {}", pid);
                Ok(())
            }
            Err(Errno::ESRCH) => {
                log::debug!("PID {} already exited", pid);
                Ok(())
            }
            Err(errno) => Err(signal_err(errno)),
        },
        Err(errno) => Err(signal_err(errno)),
    }
}

#[cfg(not(unix))]
pub fn signal_stop(pid: u32) -> Result<(), LifecycleError> {
    use sysinfo::{Pid, ProcessesToUpdate, System};

    let sysinfo_pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[sysinfo_pid]), true);

    match sys.process(sysinfo_pid) {
        None => Ok(()),
        Some(process) if process.kill() => Ok(()),
        Some(_) => Err(LifecycleError::Signal {
            pid,
            source: io::Error::new(io::ErrorKind::PermissionDenied, "termination refused"),
        }),
    }
}
