//! Power source trait and descriptive metadata.

use crate::error::Result;
use crate::types::{ComponentKind, Manufacturer};

/// Identification captured once, when a backend is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Hardware class the source measures.
    pub kind: ComponentKind,

    /// Vendor, for components that have one.
    pub manufacturer: Option<Manufacturer>,

    /// Marketing or model name (e.g., "AMD Ryzen 7 5800X").
    pub name: Option<String>,
}

impl SourceInfo {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            manufacturer: None,
            name: None,
        }
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<Manufacturer>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            self.name = Some(trimmed.to_string());
        }
        self
    }
}

/// Something that can report an instantaneous power draw.
///
/// Implementations are built by a factory that already identified the
/// hardware; nothing here re-derives the vendor or name. All methods take
/// `&mut self` because only the sampling thread drives a source.
pub trait PowerSource: Send {
    /// Identification captured at construction.
    fn info(&self) -> &SourceInfo;

    /// Reads the current power draw in watts.
    ///
    /// Backends may block briefly (around 100 ms) to let sensors settle.
    fn read_power(&mut self) -> Result<f64>;

    /// Fraction of the measured draw attributable to the monitored process,
    /// in `[0, 1]`.
    ///
    /// Only process-scoped sources override this; the default attributes the
    /// whole reading.
    fn process_share(&mut self) -> f64 {
        1.0
    }

    /// Acquires any backend handle needed for reading.
    ///
    /// Called from the sampling thread before the first read. Stateless
    /// backends keep the default no-op.
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    /// Releases whatever `open` acquired. Must be safe to call more than once.
    fn close(&mut self) {}
}

/// Power readings must be finite and non-negative to keep energy totals
/// monotonic.
pub fn validate_watts(kind: ComponentKind, watts: f64) -> Result<f64> {
    if watts.is_finite() && watts >= 0.0 {
        Ok(watts)
    } else {
        Err(crate::error::PlatformError::power_read(
            kind,
            format!("backend returned invalid reading {watts}"),
        ))
    }
}
