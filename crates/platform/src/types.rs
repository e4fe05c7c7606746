//! Shared types for hardware identification and power monitoring.

use std::fmt;

use serde::Serialize;

use crate::error::PlatformError;

/// Hardware class a power reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Central processing unit (package power)
    Cpu,
    /// Dedicated graphics card
    Gpu,
    /// Main memory (DRAM)
    Memory,
}

impl ComponentKind {
    /// Every kind, in reporting order.
    pub const ALL: [ComponentKind; 3] = [
        ComponentKind::Cpu,
        ComponentKind::Gpu,
        ComponentKind::Memory,
    ];

    /// Returns the lowercase key used in requests and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Cpu => "cpu",
            ComponentKind::Gpu => "gpu",
            ComponentKind::Memory => "memory",
        }
    }

    /// Returns a human-readable label for the component kind.
    pub fn label(&self) -> &'static str {
        match self {
            ComponentKind::Cpu => "CPU",
            ComponentKind::Gpu => "GPU",
            ComponentKind::Memory => "Memory",
        }
    }

    /// Parses a request key. Keys are matched exactly, so `"CPU"` is not a
    /// valid key.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "cpu" => Some(ComponentKind::Cpu),
            "gpu" => Some(ComponentKind::Gpu),
            "memory" => Some(ComponentKind::Memory),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Operating system family, which decides the backend for every component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystemKind {
    Windows,
    Linux,
}

impl OperatingSystemKind {
    /// Detects the operating system this binary runs on.
    ///
    /// Anything other than Linux or Windows is an error rather than a
    /// silent fallback.
    pub fn detect() -> Result<Self, PlatformError> {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Maps a `std::env::consts::OS` style name to an operating system kind.
    pub fn from_os_name(name: &str) -> Result<Self, PlatformError> {
        match name {
            "linux" => Ok(OperatingSystemKind::Linux),
            "windows" => Ok(OperatingSystemKind::Windows),
            other => Err(PlatformError::UnsupportedOperatingSystem(other.to_string())),
        }
    }

    /// Returns a human-readable label for the operating system.
    pub fn label(&self) -> &'static str {
        match self {
            OperatingSystemKind::Windows => "Windows",
            OperatingSystemKind::Linux => "Linux",
        }
    }
}

impl fmt::Display for OperatingSystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// CPU vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuManufacturer {
    Intel,
    Amd,
}

impl CpuManufacturer {
    /// Classifies a CPUID vendor string (`GenuineIntel`, `AuthenticAMD`).
    pub fn from_vendor_id(vendor_id: &str) -> Option<Self> {
        match vendor_id.trim() {
            "GenuineIntel" => Some(CpuManufacturer::Intel),
            "AuthenticAMD" => Some(CpuManufacturer::Amd),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CpuManufacturer::Intel => "Intel",
            CpuManufacturer::Amd => "AMD",
        }
    }
}

/// GPU vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuManufacturer {
    Nvidia,
    Amd,
}

impl GpuManufacturer {
    const PCI_VENDOR_NVIDIA: u16 = 0x10de;
    const PCI_VENDOR_AMD: u16 = 0x1002;

    /// Classifies a PCI vendor id.
    pub fn from_pci_vendor(vendor: u16) -> Option<Self> {
        match vendor {
            Self::PCI_VENDOR_NVIDIA => Some(GpuManufacturer::Nvidia),
            Self::PCI_VENDOR_AMD => Some(GpuManufacturer::Amd),
            _ => None,
        }
    }

    /// Classifies a LibreHardwareMonitor hardware type (`GpuNvidia`, `GpuAmd`).
    pub fn from_hardware_type(hardware_type: &str) -> Option<Self> {
        match hardware_type {
            "GpuNvidia" => Some(GpuManufacturer::Nvidia),
            "GpuAmd" => Some(GpuManufacturer::Amd),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GpuManufacturer::Nvidia => "NVIDIA",
            GpuManufacturer::Amd => "AMD",
        }
    }
}

/// Identified vendor of a monitored component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Manufacturer {
    Cpu(CpuManufacturer),
    Gpu(GpuManufacturer),
}

impl Manufacturer {
    pub fn label(&self) -> &'static str {
        match self {
            Manufacturer::Cpu(m) => m.label(),
            Manufacturer::Gpu(m) => m.label(),
        }
    }
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<CpuManufacturer> for Manufacturer {
    fn from(m: CpuManufacturer) -> Self {
        Manufacturer::Cpu(m)
    }
}

impl From<GpuManufacturer> for Manufacturer {
    fn from(m: GpuManufacturer) -> Self {
        Manufacturer::Gpu(m)
    }
}

/// Process whose share of the hardware is attributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessTarget {
    /// The process running the monitor
    #[default]
    Current,
    /// Another process, by PID
    Pid(u32),
}

impl ProcessTarget {
    /// Resolves the target to a concrete PID.
    pub fn pid(&self) -> u32 {
        match self {
            ProcessTarget::Current => std::process::id(),
            ProcessTarget::Pid(pid) => *pid,
        }
    }
}
