//! Memory power model.
//!
//! DRAM has no per-process power counter on either supported OS. The draw
//! attributed to the target is estimated from its resident set: each
//! installed module is assumed to draw [`WATTS_PER_MODULE`] when fully
//! used, so one GiB costs `WATTS_PER_MODULE * modules / GiB per module`.

use crate::error::{PlatformError, Result};
use crate::power::{validate_watts, PowerSource, SourceInfo};
use crate::process::ProcessProbe;
use crate::types::{ComponentKind, ProcessTarget};

/// Nominal draw of one DDR module under load.
pub const WATTS_PER_MODULE: f64 = 5.0;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Installed memory modules, as reported by DMI / WMI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryLayout {
    /// Number of populated slots.
    pub modules: u32,
    /// Capacity of a single module in GiB.
    pub gib_per_module: f64,
}

impl MemoryLayout {
    /// Validates module metadata read from a backend.
    pub fn new(modules: u32, gib_per_module: f64) -> Result<Self> {
        if modules == 0 {
            return Err(PlatformError::ResourceUnavailable {
                component: ComponentKind::Memory,
                detail: "no populated memory modules reported".to_string(),
            });
        }
        if !(gib_per_module.is_finite() && gib_per_module > 0.0) {
            return Err(PlatformError::NameIdentification {
                component: ComponentKind::Memory,
                detail: format!("invalid module size {gib_per_module} GiB"),
            });
        }
        Ok(Self {
            modules,
            gib_per_module,
        })
    }

    /// Estimated draw per GiB of resident memory.
    pub fn watts_per_gib(&self) -> f64 {
        WATTS_PER_MODULE * f64::from(self.modules) / self.gib_per_module
    }

    /// Display name such as `"2 x 16 GiB"`.
    pub fn label(&self) -> String {
        format!("{} x {} GiB", self.modules, self.gib_per_module)
    }
}

/// Memory power source for a target process.
pub struct MemorySource {
    info: SourceInfo,
    layout: MemoryLayout,
    probe: ProcessProbe,
}

impl MemorySource {
    pub fn new(layout: MemoryLayout, target: ProcessTarget) -> Self {
        Self {
            info: SourceInfo::new(ComponentKind::Memory).with_name(layout.label()),
            layout,
            probe: ProcessProbe::new(target),
        }
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }
}

impl PowerSource for MemorySource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn read_power(&mut self) -> Result<f64> {
        let rss = self.probe.resident_bytes().ok_or_else(|| {
            PlatformError::power_read(
                ComponentKind::Memory,
                format!("process {} is no longer running", self.probe.pid()),
            )
        })?;

        let watts = rss as f64 / BYTES_PER_GIB * self.layout.watts_per_gib();
        validate_watts(ComponentKind::Memory, watts)
    }
}
