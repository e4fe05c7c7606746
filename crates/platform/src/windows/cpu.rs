use tracing::debug;

use super::lhm::{self, SensorGroup};
use crate::error::{PlatformError, Result};
use crate::identify::identify_cpu;
use crate::power::{validate_watts, PowerSource, SourceInfo};
use crate::process::ProcessProbe;
use crate::types::{ComponentKind, ProcessTarget};

/// Intel reports "CPU Package", AMD reports "Package".
const PACKAGE_SENSORS: [&str; 2] = ["CPU Package", "Package"];

/// CPU package power from LibreHardwareMonitor, scaled by the target's
/// CPU share.
pub struct WindowsCpu {
    info: SourceInfo,
    probe: ProcessProbe,
    opened: bool,
}

impl WindowsCpu {
    pub fn new(target: ProcessTarget) -> Result<Self> {
        let info = identify_cpu()?;

        lhm::enable_group(SensorGroup::Cpu);
        let watts = lhm::read_power_sensor(ComponentKind::Cpu, &PACKAGE_SENSORS, None).map_err(
            |e| PlatformError::ResourceUnavailable {
                component: ComponentKind::Cpu,
                detail: e.to_string(),
            },
        )?;
        debug!(
            cpu = info.name.as_deref().unwrap_or("unknown"),
            watts, "CPU package sensor found"
        );

        Ok(Self {
            info,
            probe: ProcessProbe::new(target),
            opened: false,
        })
    }
}

impl PowerSource for WindowsCpu {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn read_power(&mut self) -> Result<f64> {
        let watts = lhm::read_power_sensor(ComponentKind::Cpu, &PACKAGE_SENSORS, None)?;
        validate_watts(ComponentKind::Cpu, watts)
    }

    fn process_share(&mut self) -> f64 {
        self.probe.cpu_share()
    }

    fn open(&mut self) -> Result<()> {
        if !self.opened {
            lhm::acquire(ComponentKind::Cpu)?;
            self.opened = true;
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.opened {
            lhm::release();
            self.opened = false;
        }
    }
}
