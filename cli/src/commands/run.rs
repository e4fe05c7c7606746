use std::io;
use std::process::Command;
use std::time::Instant;

use color_eyre::eyre::{bail, Result, WrapErr};
use joule_core::{Monitor, MonitorConfig, ProcessTarget};
use tracing::{info, warn};

use crate::config::UserConfig;
use crate::report::EnergyReport;

/// Runs `command`, monitoring its process until it exits.
///
/// Returns the exit code the `joule` process should exit with.
pub fn run(config: &UserConfig, command: &[String], json: bool) -> Result<i32> {
    let Some((program, args)) = command.split_first() else {
        bail!("no command given; usage: joule run -- <command> [args...]");
    };

    let request = config.component_request()?;

    let mut child = Command::new(program)
        .args(args)
        .spawn()
        .wrap_err_with(|| format!("failed to start `{program}`"))?;
    let pid = child.id();
    info!(pid, program = %program, "command started");

    let monitor_config = MonitorConfig::default()
        .with_sample_interval(config.sample_interval())
        .with_target(ProcessTarget::Pid(pid));

    let mut monitor = match Monitor::with_config(&request, monitor_config) {
        Ok(monitor) => monitor,
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e).wrap_err("failed to set up energy monitoring");
        }
    };

    let started = Instant::now();
    if let Err(e) = monitor.start() {
        let _ = child.kill();
        let _ = child.wait();
        return Err(e).wrap_err("failed to start energy monitoring");
    }

    let status = child.wait().wrap_err("failed to wait for command")?;
    monitor.end()?;
    let elapsed = started.elapsed();

    let exit_code = status.code();
    if exit_code.is_none() {
        warn!(pid, "command terminated by a signal");
    }

    let report = EnergyReport::from_monitor(&monitor, pid, elapsed)
        .with_command(command.join(" "), exit_code);
    report.emit(json, &mut io::stdout().lock(), &mut io::stderr().lock())?;

    Ok(exit_code.unwrap_or(1))
}
