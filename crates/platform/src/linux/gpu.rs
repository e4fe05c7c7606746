use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use nvml_wrapper::Nvml;
use tracing::debug;

use super::{read_sysfs_string, read_sysfs_u64};
use crate::error::{PlatformError, Result};
use crate::power::{validate_watts, PowerSource, SourceInfo};
use crate::types::{ComponentKind, GpuManufacturer};

const DRM_PATH: &str = "/sys/class/drm";
const HWMON_PATH: &str = "/sys/class/hwmon";

enum GpuBackend {
    /// NVML power usage, summed over every device.
    Nvidia { nvml: Nvml, device_count: u32 },
    /// `amdgpu` hwmon power file in microwatts.
    Amd { power_path: PathBuf },
}

/// Dedicated GPU power on Linux.
pub struct LinuxGpu {
    info: SourceInfo,
    backend: GpuBackend,
}

impl LinuxGpu {
    pub fn new() -> Result<Self> {
        let vendors = discover_drm_vendors(Path::new(DRM_PATH));
        match select_manufacturer(&vendors)? {
            GpuManufacturer::Nvidia => Self::nvidia(),
            GpuManufacturer::Amd => {
                let name = lspci_gpu_name()?;
                Self::amd_with_hwmon_root(Path::new(HWMON_PATH), name)
            }
        }
    }

    fn nvidia() -> Result<Self> {
        let unavailable = |detail: String| PlatformError::ResourceUnavailable {
            component: ComponentKind::Gpu,
            detail,
        };

        let nvml = Nvml::init().map_err(|e| unavailable(format!("NVML unavailable: {e}")))?;
        let device_count = nvml
            .device_count()
            .map_err(|e| unavailable(format!("NVML device count: {e}")))?;
        if device_count == 0 {
            return Err(unavailable("NVML reports no devices".to_string()));
        }

        let name = nvml
            .device_by_index(0)
            .and_then(|device| device.name())
            .map_err(|e| PlatformError::NameIdentification {
                component: ComponentKind::Gpu,
                detail: e.to_string(),
            })?;

        debug!(gpu = %name, device_count, "NVIDIA GPU identified");

        Ok(Self {
            info: SourceInfo::new(ComponentKind::Gpu)
                .with_manufacturer(GpuManufacturer::Nvidia)
                .with_name(name),
            backend: GpuBackend::Nvidia { nvml, device_count },
        })
    }

    pub(crate) fn amd_with_hwmon_root(root: &Path, name: String) -> Result<Self> {
        let power_path =
            find_amdgpu_power_file(root).ok_or_else(|| PlatformError::ResourceUnavailable {
                component: ComponentKind::Gpu,
                detail: format!("no amdgpu power sensor under {}", root.display()),
            })?;

        debug!(gpu = %name, path = %power_path.display(), "AMD GPU identified");

        Ok(Self {
            info: SourceInfo::new(ComponentKind::Gpu)
                .with_manufacturer(GpuManufacturer::Amd)
                .with_name(name),
            backend: GpuBackend::Amd { power_path },
        })
    }
}

impl PowerSource for LinuxGpu {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn read_power(&mut self) -> Result<f64> {
        let watts = match &self.backend {
            GpuBackend::Nvidia { nvml, device_count } => {
                let mut total_mw = 0u64;
                for index in 0..*device_count {
                    let milliwatts = nvml
                        .device_by_index(index)
                        .and_then(|device| device.power_usage())
                        .map_err(|e| {
                            PlatformError::power_read(
                                ComponentKind::Gpu,
                                format!("NVML device {index}: {e}"),
                            )
                        })?;
                    total_mw += u64::from(milliwatts);
                }
                total_mw as f64 / 1000.0
            }
            GpuBackend::Amd { power_path } => {
                let microwatts = read_sysfs_u64(power_path)
                    .map_err(|e| PlatformError::power_read(ComponentKind::Gpu, e.to_string()))?;
                microwatts as f64 / 1_000_000.0
            }
        };

        validate_watts(ComponentKind::Gpu, watts)
    }
}

/// PCI vendor ids of every DRM card (`cardN`, connectors excluded).
pub(crate) fn discover_drm_vendors(root: &Path) -> Vec<u16> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };

    let mut vendors = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let is_card = name
            .strip_prefix("card")
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
        if !is_card {
            continue;
        }

        let vendor_path = entry.path().join("device").join("vendor");
        if let Some(vendor) = read_sysfs_string(&vendor_path)
            .ok()
            .and_then(|v| u16::from_str_radix(v.trim_start_matches("0x"), 16).ok())
        {
            vendors.push(vendor);
        }
    }

    vendors
}

/// NVIDIA wins over AMD on hybrid machines; anything else is unidentified.
pub(crate) fn select_manufacturer(vendors: &[u16]) -> Result<GpuManufacturer> {
    if vendors.is_empty() {
        return Err(PlatformError::ResourceUnavailable {
            component: ComponentKind::Gpu,
            detail: format!("no GPU found under {DRM_PATH}"),
        });
    }

    let found: Vec<GpuManufacturer> = vendors
        .iter()
        .filter_map(|v| GpuManufacturer::from_pci_vendor(*v))
        .collect();

    if found.contains(&GpuManufacturer::Nvidia) {
        Ok(GpuManufacturer::Nvidia)
    } else if found.contains(&GpuManufacturer::Amd) {
        Ok(GpuManufacturer::Amd)
    } else {
        let ids: Vec<String> = vendors.iter().map(|v| format!("{v:#06x}")).collect();
        Err(PlatformError::ManufacturerIdentification {
            component: ComponentKind::Gpu,
            detail: format!("no NVIDIA or AMD GPU (vendor ids: {})", ids.join(", ")),
        })
    }
}

/// Locates the `amdgpu` hwmon power file, preferring the averaged reading.
pub(crate) fn find_amdgpu_power_file(root: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(root).ok()?;
    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();

    paths
        .into_iter()
        .filter(|path| {
            read_sysfs_string(&path.join("name"))
                .map(|name| name == "amdgpu")
                .unwrap_or(false)
        })
        .find_map(|path| {
            ["power1_average", "power1_input"]
                .iter()
                .map(|file| path.join(file))
                .find(|p| p.exists())
        })
}

fn lspci_gpu_name() -> Result<String> {
    let output = Command::new("lspci")
        .output()
        .map_err(|e| PlatformError::NameIdentification {
            component: ComponentKind::Gpu,
            detail: format!("failed to run lspci: {e}"),
        })?;

    if !output.status.success() {
        return Err(PlatformError::NameIdentification {
            component: ComponentKind::Gpu,
            detail: format!("lspci exited with {}", output.status),
        });
    }

    parse_lspci_gpu_name(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        PlatformError::NameIdentification {
            component: ComponentKind::Gpu,
            detail: "no AMD display controller in lspci output".to_string(),
        }
    })
}

/// Extracts the AMD display controller description from `lspci` output.
pub(crate) fn parse_lspci_gpu_name(output: &str) -> Option<String> {
    output
        .lines()
        .filter(|line| {
            line.contains(" VGA ") || line.contains(" 3D ") || line.contains(" Display ")
        })
        .filter(|line| {
            let upper = line.to_uppercase();
            upper.contains("AMD") || upper.contains("ATI")
        })
        .find_map(|line| {
            let (_, description) = line.split_once(": ")?;
            let description = match description.rfind(" (rev ") {
                Some(idx) => &description[..idx],
                None => description,
            };
            Some(description.trim().to_string())
        })
}
