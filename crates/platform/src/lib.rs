//! Hardware identification and power-reading backends for joule.
//!
//! Every monitored component is a [`PowerSource`]: something that was
//! identified once at construction and can then report an instantaneous
//! draw in watts. Backends are chosen per operating system:
//!
//! | Component | Linux                          | Windows                         |
//! |-----------|--------------------------------|---------------------------------|
//! | CPU       | RAPL powercap (`energy_uj`)    | LibreHardwareMonitor over WMI   |
//! | GPU       | NVML (NVIDIA), hwmon (AMD)     | LibreHardwareMonitor over WMI   |
//! | Memory    | `dmidecode` module layout      | `Win32_PhysicalMemory` layout   |
//!
//! # Example
//!
//! ```ignore
//! use joule_platform::{PowerSource, ProcessTarget};
//!
//! #[cfg(target_os = "linux")]
//! let mut cpu = joule_platform::linux::LinuxCpu::new(ProcessTarget::Current)?;
//! let watts = cpu.read_power()? * cpu.process_share();
//! ```

mod error;
mod identify;
mod memory;
mod power;
mod process;
mod types;

pub use error::{PlatformError, Result};
pub use identify::{classify_cpu, identify_cpu};
pub use memory::{MemoryLayout, MemorySource, WATTS_PER_MODULE};
pub use power::{validate_watts, PowerSource, SourceInfo};
pub use process::{cpu_share, ProcessProbe};
pub use types::{
    ComponentKind, CpuManufacturer, GpuManufacturer, Manufacturer, OperatingSystemKind,
    ProcessTarget,
};

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "windows")]
pub mod windows;
