//! Liveness probe for the process that gates shutdown

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use watcher::ProcessProbe;

/// Probes a process id with the null signal
#[derive(Debug, Clone, Copy)]
pub struct PidProbe {
    pid: Pid,
}

impl PidProbe {
    pub fn new(pid: i32) -> Self {
        Self {
            pid: Pid::from_raw(pid),
        }
    }
}

impl ProcessProbe for PidProbe {
    fn is_alive(&self) -> bool {
        // Signal 0 checks existence without delivering anything
        match kill(self.pid, None) {
            Ok(()) => true,
            Err(Errno::ESRCH) => false,
            // Permission denied or other - assume alive
            Err(_) => true,
        }
    }
}
