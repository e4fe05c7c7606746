//! A power source paired with its energy total.

use std::time::Duration;

use joule_platform::{validate_watts, ComponentKind, Manufacturer, PowerSource};
use serde::Serialize;
use tracing::{error, warn};

use crate::energy::{energy_kwh, EnergyAccumulator, EnergyReader};

/// Read-only description of a monitored component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentSummary {
    pub kind: ComponentKind,
    pub name: Option<String>,
    pub manufacturer: Option<Manufacturer>,
}

/// Owned by the sampler; moves into the sampling thread with its
/// accumulator so nothing else can write the total.
pub(crate) struct MonitoredComponent {
    kind: ComponentKind,
    source: Box<dyn PowerSource>,
    energy: EnergyAccumulator,
}

impl MonitoredComponent {
    pub(crate) fn new(kind: ComponentKind, source: Box<dyn PowerSource>) -> Self {
        Self {
            kind,
            source,
            energy: EnergyAccumulator::new(),
        }
    }

    pub(crate) fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub(crate) fn reader(&self) -> EnergyReader {
        self.energy.reader()
    }

    pub(crate) fn summary(&self) -> ComponentSummary {
        let info = self.source.info();
        ComponentSummary {
            kind: self.kind,
            name: info.name.clone(),
            manufacturer: info.manufacturer,
        }
    }

    pub(crate) fn source_mut(&mut self) -> &mut dyn PowerSource {
        self.source.as_mut()
    }

    /// Instantaneous draw, or 0 W when the backend fails. A failure that is
    /// not a one-off read error means the backend itself went away.
    pub(crate) fn power_watts(&mut self) -> f64 {
        match self
            .source
            .read_power()
            .and_then(|watts| validate_watts(self.kind, watts))
        {
            Ok(watts) => watts,
            Err(e) if e.is_transient() => {
                warn!(component = %self.kind, error = %e, "power read failed, counting 0 W");
                0.0
            }
            Err(e) => {
                error!(component = %self.kind, error = %e, "power backend failed, counting 0 W");
                0.0
            }
        }
    }

    /// Share of the draw attributed to the target. Only the CPU is scaled.
    pub(crate) fn scale(&mut self) -> f64 {
        if self.kind != ComponentKind::Cpu {
            return 1.0;
        }
        let share = self.source.process_share();
        if share.is_finite() {
            share.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Reads, scales and accumulates one interval. Returns the kWh added.
    pub(crate) fn sample(&mut self, elapsed: Duration) -> f64 {
        let watts = self.power_watts();
        let scale = self.scale();
        let kwh = energy_kwh(watts * scale, elapsed);
        self.energy.add_kwh(kwh);
        kwh
    }
}
