use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::read_sysfs_u64;
use crate::error::{PlatformError, Result};
use crate::identify::identify_cpu;
use crate::power::{validate_watts, PowerSource, SourceInfo};
use crate::process::ProcessProbe;
use crate::types::{ComponentKind, ProcessTarget};

const POWERCAP_PATH: &str = "/sys/class/powercap";

/// Window between the two counter reads of a power sample.
const SETTLE_WINDOW: Duration = Duration::from_millis(100);

/// A RAPL package domain (`/sys/class/powercap/intel-rapl:N`).
///
/// AMD processors expose the same interface, so this covers both vendors.
#[derive(Debug, Clone)]
pub struct RaplDomain {
    path: PathBuf,
    name: String,
    max_energy_range_uj: u64,
}

impl RaplDomain {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn energy_uj(&self) -> Result<u64> {
        read_sysfs_u64(&self.path.join("energy_uj"))
    }
}

/// CPU package power from RAPL, scaled by the target's CPU share.
pub struct LinuxCpu {
    info: SourceInfo,
    domains: Vec<RaplDomain>,
    probe: ProcessProbe,
    settle: Duration,
}

impl LinuxCpu {
    pub fn new(target: ProcessTarget) -> Result<Self> {
        let info = identify_cpu()?;
        Self::with_powercap_root(info, Path::new(POWERCAP_PATH), target)
    }

    /// Builds the source against an arbitrary powercap tree.
    pub fn with_powercap_root(
        info: SourceInfo,
        root: &Path,
        target: ProcessTarget,
    ) -> Result<Self> {
        let domains = discover_rapl_domains(root);
        if domains.is_empty() {
            return Err(PlatformError::ResourceUnavailable {
                component: ComponentKind::Cpu,
                detail: format!("no RAPL package domain under {}", root.display()),
            });
        }

        for domain in &domains {
            if let Err(e) = domain.energy_uj() {
                let denied = matches!(
                    &e,
                    PlatformError::Io { source, .. } if source.kind() == ErrorKind::PermissionDenied
                );
                let detail = if denied {
                    format!(
                        "permission denied reading {}/energy_uj (run as root)",
                        domain.path.display()
                    )
                } else {
                    e.to_string()
                };
                return Err(PlatformError::ResourceUnavailable {
                    component: ComponentKind::Cpu,
                    detail,
                });
            }
        }

        debug!(
            cpu = info.name.as_deref().unwrap_or("unknown"),
            domains = ?domains.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
            "RAPL package domains discovered"
        );

        Ok(Self {
            info,
            domains,
            probe: ProcessProbe::new(target),
            settle: SETTLE_WINDOW,
        })
    }

    pub fn domains(&self) -> &[RaplDomain] {
        &self.domains
    }
}

impl PowerSource for LinuxCpu {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn read_power(&mut self) -> Result<f64> {
        let watts = sample_package_watts(&self.domains, self.settle)?;
        validate_watts(ComponentKind::Cpu, watts)
    }

    fn process_share(&mut self) -> f64 {
        self.probe.cpu_share()
    }
}

/// Finds package domains below a powercap root, one per package name.
pub(crate) fn discover_rapl_domains(root: &Path) -> Vec<RaplDomain> {
    let mut domains: Vec<RaplDomain> = Vec::new();

    let Ok(entries) = fs::read_dir(root) else {
        return domains;
    };

    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        if !path.join("energy_uj").exists() {
            continue;
        }

        let name = fs::read_to_string(path.join("name"))
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        // intel-rapl and intel-rapl-mmio can both expose "package-0".
        if !name.starts_with("package") || domains.iter().any(|d| d.name == name) {
            continue;
        }

        let max_energy_range_uj = read_sysfs_u64(&path.join("max_energy_range_uj")).unwrap_or(0);

        domains.push(RaplDomain {
            path,
            name,
            max_energy_range_uj,
        });
    }

    domains
}

/// Energy consumed between two counter reads, accounting for one wrap of the
/// counter at `max_range_uj`.
pub(crate) fn energy_delta_uj(previous: u64, current: u64, max_range_uj: u64) -> u64 {
    if current >= previous {
        current - previous
    } else if max_range_uj > previous {
        max_range_uj - previous + current
    } else {
        current
    }
}

fn sample_package_watts(domains: &[RaplDomain], settle: Duration) -> Result<f64> {
    let read_all = || -> Result<Vec<u64>> {
        domains
            .iter()
            .map(|d| {
                d.energy_uj()
                    .map_err(|e| PlatformError::power_read(ComponentKind::Cpu, e.to_string()))
            })
            .collect()
    };

    let before = read_all()?;
    let start = Instant::now();
    thread::sleep(settle);
    let after = read_all()?;
    let elapsed_us = start.elapsed().as_micros();

    if elapsed_us == 0 {
        return Ok(0.0);
    }

    let total_uj: u64 = domains
        .iter()
        .zip(before.iter().zip(after.iter()))
        .map(|(domain, (prev, now))| energy_delta_uj(*prev, *now, domain.max_energy_range_uj))
        .sum();

    // µJ / µs = W
    Ok(total_uj as f64 / elapsed_us as f64)
}
