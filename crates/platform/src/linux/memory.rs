use std::process::Command;

use tracing::debug;

use crate::error::{PlatformError, Result};
use crate::memory::MemoryLayout;
use crate::types::ComponentKind;

/// Reads the installed module layout from `dmidecode -t memory`.
///
/// Requires root; SMBIOS tables are not readable otherwise.
pub fn read_memory_layout() -> Result<MemoryLayout> {
    let output = Command::new("dmidecode")
        .args(["-t", "memory"])
        .output()
        .map_err(|e| PlatformError::Command {
            program: "dmidecode".to_string(),
            detail: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PlatformError::Command {
            program: "dmidecode".to_string(),
            detail: format!("{}: {}", output.status, stderr.trim()),
        });
    }

    let layout = parse_dmidecode(&String::from_utf8_lossy(&output.stdout))?;
    debug!(
        modules = layout.modules,
        gib_per_module = layout.gib_per_module,
        "memory layout read from DMI"
    );
    Ok(layout)
}

/// Parses the `Memory Device` sections of `dmidecode` output.
///
/// Empty slots report `Size: No Module Installed` and are skipped. The
/// module size is taken from the first populated slot.
pub fn parse_dmidecode(output: &str) -> Result<MemoryLayout> {
    let sizes: Vec<f64> = output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Size:"))
        .filter_map(|value| parse_size_gib(value.trim()))
        .collect();

    let Some(first) = sizes.first() else {
        return Err(PlatformError::ResourceUnavailable {
            component: ComponentKind::Memory,
            detail: "dmidecode reported no populated memory modules".to_string(),
        });
    };

    MemoryLayout::new(sizes.len() as u32, *first)
}

fn parse_size_gib(value: &str) -> Option<f64> {
    let mut parts = value.split_whitespace();
    let amount: f64 = parts.next()?.parse().ok()?;
    let gib = match parts.next()? {
        "kB" | "KB" => amount / (1024.0 * 1024.0),
        "MB" => amount / 1024.0,
        "GB" => amount,
        "TB" => amount * 1024.0,
        _ => return None,
    };
    Some(gib)
}
