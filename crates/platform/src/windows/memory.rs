use serde::Deserialize;
use tracing::debug;
use wmi::WMIConnection;

use crate::error::{PlatformError, Result};
use crate::memory::MemoryLayout;
use crate::types::ComponentKind;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct PhysicalMemory {
    /// uint64 properties arrive as strings over WMI.
    capacity: Option<String>,
}

/// Reads the installed module layout from `Win32_PhysicalMemory`.
pub fn read_memory_layout() -> Result<MemoryLayout> {
    let unavailable = |detail: String| PlatformError::ResourceUnavailable {
        component: ComponentKind::Memory,
        detail,
    };

    let conn = WMIConnection::new().map_err(|e| unavailable(format!("WMI unavailable: {e}")))?;
    let modules: Vec<PhysicalMemory> = conn
        .raw_query("SELECT Capacity FROM Win32_PhysicalMemory")
        .map_err(|e| unavailable(format!("Win32_PhysicalMemory query failed: {e}")))?;

    let capacities: Vec<Option<String>> = modules.into_iter().map(|m| m.capacity).collect();
    let layout = layout_from_capacities(&capacities)?;
    debug!(
        modules = layout.modules,
        gib_per_module = layout.gib_per_module,
        "memory layout read from WMI"
    );
    Ok(layout)
}

pub(crate) fn layout_from_capacities(capacities: &[Option<String>]) -> Result<MemoryLayout> {
    let bytes: Vec<u64> = capacities
        .iter()
        .filter_map(|c| c.as_deref()?.trim().parse::<u64>().ok())
        .filter(|b| *b > 0)
        .collect();

    let Some(first) = bytes.first() else {
        return Err(PlatformError::ResourceUnavailable {
            component: ComponentKind::Memory,
            detail: "no populated memory modules reported".to_string(),
        });
    };

    MemoryLayout::new(bytes.len() as u32, *first as f64 / (1u64 << 30) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_capacities() {
        let caps = vec![
            Some("17179869184".to_string()),
            Some("17179869184".to_string()),
            None,
        ];
        let layout = layout_from_capacities(&caps).unwrap();
        assert_eq!(layout.modules, 2);
        assert_eq!(layout.gib_per_module, 16.0);
    }

    #[test]
    fn test_layout_from_no_modules() {
        assert!(layout_from_capacities(&[None]).is_err());
    }
}
