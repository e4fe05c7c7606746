use tracing::debug;

use super::lhm::{self, LhmHardware, SensorGroup};
use crate::error::{PlatformError, Result};
use crate::power::{validate_watts, PowerSource, SourceInfo};
use crate::types::{ComponentKind, GpuManufacturer};

const POWER_SENSORS: [&str; 2] = ["GPU Power", "GPU Package"];

/// Only discrete cards report dedicated video memory.
const DEDICATED_MEMORY_SENSOR: &str = "D3D Dedicated Memory Used";

/// Dedicated GPU power from LibreHardwareMonitor.
pub struct WindowsGpu {
    info: SourceInfo,
    identifier: String,
    opened: bool,
}

impl WindowsGpu {
    pub fn new() -> Result<Self> {
        lhm::enable_group(SensorGroup::Gpu);

        let mut candidates = Vec::new();
        for hw in lhm::hardware(ComponentKind::Gpu)? {
            if !hw.hardware_type.as_deref().is_some_and(|t| t.starts_with("Gpu")) {
                continue;
            }
            let dedicated = match hw.identifier.as_deref() {
                Some(id) => lhm::sensors_of(ComponentKind::Gpu, id)?
                    .iter()
                    .any(|s| s.name.as_deref() == Some(DEDICATED_MEMORY_SENSOR)),
                None => false,
            };
            candidates.push((hw, dedicated));
        }

        let (manufacturer, hw) = select_dedicated(&candidates)?;
        let identifier = hw.identifier.clone().unwrap_or_default();
        let name = hw.name.clone().ok_or_else(|| PlatformError::NameIdentification {
            component: ComponentKind::Gpu,
            detail: format!("hardware {identifier} has no name"),
        })?;

        debug!(gpu = %name, identifier = %identifier, "dedicated GPU identified");

        Ok(Self {
            info: SourceInfo::new(ComponentKind::Gpu)
                .with_manufacturer(manufacturer)
                .with_name(name),
            identifier,
            opened: false,
        })
    }
}

/// Picks the first dedicated GPU from a supported vendor.
pub(crate) fn select_dedicated(
    candidates: &[(LhmHardware, bool)],
) -> Result<(GpuManufacturer, &LhmHardware)> {
    if candidates.is_empty() {
        return Err(PlatformError::ResourceUnavailable {
            component: ComponentKind::Gpu,
            detail: "no GPU reported by LibreHardwareMonitor".to_string(),
        });
    }

    let dedicated: Vec<&LhmHardware> = candidates
        .iter()
        .filter(|(_, dedicated)| *dedicated)
        .map(|(hw, _)| hw)
        .collect();

    if dedicated.is_empty() {
        return Err(PlatformError::ResourceUnavailable {
            component: ComponentKind::Gpu,
            detail: "no dedicated GPU found".to_string(),
        });
    }

    dedicated
        .iter()
        .find_map(|hw| {
            hw.hardware_type
                .as_deref()
                .and_then(GpuManufacturer::from_hardware_type)
                .map(|m| (m, *hw))
        })
        .ok_or_else(|| {
            let types: Vec<&str> = dedicated
                .iter()
                .filter_map(|hw| hw.hardware_type.as_deref())
                .collect();
            PlatformError::ManufacturerIdentification {
                component: ComponentKind::Gpu,
                detail: format!("unsupported dedicated GPU ({})", types.join(", ")),
            }
        })
}

impl PowerSource for WindowsGpu {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn read_power(&mut self) -> Result<f64> {
        let watts =
            lhm::read_power_sensor(ComponentKind::Gpu, &POWER_SENSORS, Some(&self.identifier))?;
        validate_watts(ComponentKind::Gpu, watts)
    }

    fn open(&mut self) -> Result<()> {
        if !self.opened {
            lhm::acquire(ComponentKind::Gpu)?;
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
