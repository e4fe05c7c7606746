//! Energy sampling engine for joule.
//!
//! A [`Monitor`] is built from a validated [`ComponentRequest`]. Each
//! requested component gets a [`PowerSource`] from its
//! [`ComponentFactory`], and a background thread integrates the sources'
//! power draw into per-component energy totals (kWh) until the monitor is
//! ended.

mod component;
mod config;
mod energy;
mod error;
mod factory;
mod monitor;
mod request;
mod sampler;

pub use component::ComponentSummary;
pub use config::{MonitorConfig, DEFAULT_SAMPLE_INTERVAL, MIN_SAMPLE_INTERVAL};
pub use energy::{
    energy_kwh, kwh_to_joules, EnergyAccumulator, EnergyReader, JOULES_PER_KWH,
};
pub use error::{MonitorError, Result};
pub use factory::{ComponentFactory, CpuFactory, FactorySet, GpuFactory, MemoryFactory};
pub use monitor::{Monitor, MonitorState};
pub use request::{ComponentRequest, MAX_COMPONENTS};

pub use joule_platform::{
    ComponentKind, Manufacturer, OperatingSystemKind, PlatformError, PowerSource,
    ProcessTarget, SourceInfo,
};
