//! Linux backends: RAPL powercap, DRM/hwmon, NVML and DMI.

mod cpu;
mod gpu;
mod memory;

pub use cpu::{LinuxCpu, RaplDomain};
pub use gpu::LinuxGpu;
pub use memory::{parse_dmidecode, read_memory_layout};

use std::fs;
use std::path::Path;

use crate::error::{PlatformError, Result};

pub(crate) fn read_sysfs_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| PlatformError::Io {
            path: path.display().to_string(),
            source: e,
        })
}

pub(crate) fn read_sysfs_u64(path: &Path) -> Result<u64> {
    let content = read_sysfs_string(path)?;
    content.parse::<u64>().map_err(|_| PlatformError::Io {
        path: path.display().to_string(),
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("expected integer, got '{content}'"),
        ),
    })
}
