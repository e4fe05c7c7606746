use std::io;
use std::thread;
use std::time::{Duration, Instant};

use color_eyre::eyre::{bail, Result};
use joule_core::{Monitor, MonitorConfig, ProcessTarget};
use joule_platform::ProcessProbe;
use tracing::info;

use crate::config::UserConfig;
use crate::report::EnergyReport;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Monitors an existing process until it exits or `duration` elapses.
pub fn run(config: &UserConfig, pid: u32, duration: Option<Duration>, json: bool) -> Result<()> {
    let mut probe = ProcessProbe::new(ProcessTarget::Pid(pid));
    if !probe.is_alive() {
        bail!("no process with PID {pid}");
    }

    let request = config.component_request()?;
    let monitor_config = MonitorConfig::default()
        .with_sample_interval(config.sample_interval())
        .with_target(ProcessTarget::Pid(pid));

    let mut monitor = Monitor::with_config(&request, monitor_config)?;
    let started = Instant::now();
    monitor.start()?;

    loop {
        thread::sleep(POLL_INTERVAL);
        if !probe.is_alive() {
            info!(pid, "process exited");
            break;
        }
        if duration.is_some_and(|limit| started.elapsed() >= limit) {
            info!(pid, "watch duration reached");
            break;
        }
    }

    monitor.end()?;
    let report = EnergyReport::from_monitor(&monitor, pid, started.elapsed());
    report.emit(json, &mut io::stdout().lock(), &mut io::stderr().lock())?;

    Ok(())
}
