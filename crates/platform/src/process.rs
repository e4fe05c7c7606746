//! Per-process attribution: CPU share and resident memory of the target.

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::types::ProcessTarget;

/// Tracks the monitored process through `sysinfo`.
///
/// CPU usage in `sysinfo` is computed between two refreshes, so the probe
/// refreshes once at construction to establish a baseline. Every later
/// call covers the time since the previous one, which for the sampling
/// loop is one sampling interval.
pub struct ProcessProbe {
    system: System,
    pid: Pid,
}

impl ProcessProbe {
    pub fn new(target: ProcessTarget) -> Self {
        let mut probe = Self {
            system: System::new(),
            pid: Pid::from_u32(target.pid()),
        };
        probe.refresh_cpu();
        probe
    }

    pub fn pid(&self) -> u32 {
        self.pid.as_u32()
    }

    /// Returns `true` while the target process exists.
    pub fn is_alive(&mut self) -> bool {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing(),
        );
        self.system.process(self.pid).is_some()
    }

    fn refresh_cpu(&mut self) {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cpu(),
        );
    }

    /// Share of all CPU usage that belongs to the target process.
    pub fn cpu_share(&mut self) -> f64 {
        self.refresh_cpu();

        let mut total = 0.0f64;
        let mut target = 0.0f64;
        for (pid, process) in self.system.processes() {
            // PID 0 is the idle task on Windows; counting it would swamp
            // every other process.
            if pid.as_u32() == 0 {
                continue;
            }
            let usage = f64::from(process.cpu_usage());
            total += usage;
            if *pid == self.pid {
                target += usage;
            }
        }

        cpu_share(target, total)
    }

    /// Resident set size of the target process in bytes, or `None` if it has
    /// exited.
    pub fn resident_bytes(&mut self) -> Option<u64> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        self.system.process(self.pid).map(|p| p.memory())
    }
}

/// `process / total`, clamped to `[0, 1]`, and `0.0` when nothing ran.
pub fn cpu_share(process_usage: f64, total_usage: f64) -> f64 {
    if total_usage > 0.0 && process_usage.is_finite() {
        (process_usage / total_usage).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
