//! CPU identification shared by every OS backend.

use sysinfo::System;

use crate::error::{PlatformError, Result};
use crate::power::SourceInfo;
use crate::types::{ComponentKind, CpuManufacturer};

/// Identifies the host CPU from the CPUID vendor and brand strings that
/// `sysinfo` exposes on both Linux and Windows.
pub fn identify_cpu() -> Result<SourceInfo> {
    let mut system = System::new();
    system.refresh_cpu_all();

    let cpu = system
        .cpus()
        .first()
        .ok_or_else(|| PlatformError::ManufacturerIdentification {
            component: ComponentKind::Cpu,
            detail: "no processor reported by the operating system".to_string(),
        })?;

    classify_cpu(cpu.vendor_id(), cpu.brand())
}

/// Builds the CPU identity from raw vendor and brand strings.
pub fn classify_cpu(vendor_id: &str, brand: &str) -> Result<SourceInfo> {
    let manufacturer = CpuManufacturer::from_vendor_id(vendor_id).ok_or_else(|| {
        PlatformError::ManufacturerIdentification {
            component: ComponentKind::Cpu,
            detail: format!("unrecognized vendor id '{}'", vendor_id.trim()),
        }
    })?;

    let info = SourceInfo::new(ComponentKind::Cpu)
        .with_manufacturer(manufacturer)
        .with_name(brand);

    if info.name.is_none() {
        return Err(PlatformError::NameIdentification {
            component: ComponentKind::Cpu,
            detail: "processor brand string is empty".to_string(),
        });
    }

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Manufacturer;

    #[test]
    fn test_classify_intel() {
        let info =
            classify_cpu("GenuineIntel", "Intel(R) Core(TM) i9-9900K CPU @ 3.60GHz").unwrap();
        assert_eq!(
            info.manufacturer,
            Some(Manufacturer::Cpu(CpuManufacturer::Intel))
        );
        assert_eq!(
            info.name.as_deref(),
            Some("Intel(R) Core(TM) i9-9900K CPU @ 3.60GHz")
        );
    }

    #[test]
    fn test_classify_amd() {
        let info = classify_cpu("AuthenticAMD", "AMD Ryzen 9 5950X 16-Core Processor").unwrap();
        assert_eq!(info.manufacturer, Some(Manufacturer::Cpu(CpuManufacturer::Amd)));
    }

    #[test]
    fn test_classify_unknown_vendor() {
        let err = classify_cpu("HygonGenuine", "Hygon C86 3185").unwrap_err();
        assert!(matches!(
            err,
            PlatformError::ManufacturerIdentification {
                component: ComponentKind::Cpu,
                ..
            }
        ));
        assert!(err.to_string().contains("HygonGenuine"));
    }

    #[test]
    fn test_classify_missing_brand() {
        let err = classify_cpu("GenuineIntel", "").unwrap_err();
        assert!(matches!(err, PlatformError::NameIdentification { .. }));
    }
}
