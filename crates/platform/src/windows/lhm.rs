//! LibreHardwareMonitor WMI bridge.
//!
//! LibreHardwareMonitor publishes its hardware tree in the
//! `root\LibreHardwareMonitor` namespace while it is running. `WMIConnection`
//! is neither `Send` nor `Sync`, so the connection lives in a thread local
//! of whichever thread samples. Sources call [`acquire`] from `open` and
//! [`release`] from `close`; the connection is dropped with the last release.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use tracing::debug;
use wmi::WMIConnection;

use crate::error::{PlatformError, Result};
use crate::types::ComponentKind;

const NAMESPACE: &str = "root\\LibreHardwareMonitor";

const POWER_SENSOR_QUERY: &str =
    "SELECT Name, SensorType, Value, Parent FROM Sensor WHERE SensorType='Power'";

thread_local! {
    static CONNECTION: RefCell<Option<(WMIConnection, usize)>> = const { RefCell::new(None) };
}

static CPU_GROUP: AtomicBool = AtomicBool::new(false);
static GPU_GROUP: AtomicBool = AtomicBool::new(false);

/// Hardware groups whose sensors are listed and read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorGroup {
    Cpu,
    Gpu,
}

/// Enables a hardware group for every later query in this process.
pub fn enable_group(group: SensorGroup) {
    match group {
        SensorGroup::Cpu => CPU_GROUP.store(true, Ordering::Release),
        SensorGroup::Gpu => GPU_GROUP.store(true, Ordering::Release),
    }
}

fn group_enabled(group: SensorGroup) -> bool {
    match group {
        SensorGroup::Cpu => CPU_GROUP.load(Ordering::Acquire),
        SensorGroup::Gpu => GPU_GROUP.load(Ordering::Acquire),
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LhmHardware {
    pub identifier: Option<String>,
    pub name: Option<String>,
    pub hardware_type: Option<String>,
}

impl LhmHardware {
    fn group(&self) -> Option<SensorGroup> {
        match self.hardware_type.as_deref()? {
            "Cpu" => Some(SensorGroup::Cpu),
            "GpuNvidia" | "GpuAmd" | "GpuIntel" => Some(SensorGroup::Gpu),
            _ => None,
        }
    }
}

/// Group of a hardware identifier such as `/intelcpu/0` or `/gpu-nvidia/0`.
fn identifier_group(identifier: &str) -> Option<SensorGroup> {
    let root = identifier.trim_start_matches('/').split('/').next()?;
    match root {
        "intelcpu" | "amdcpu" => Some(SensorGroup::Cpu),
        gpu if gpu.starts_with("gpu-") => Some(SensorGroup::Gpu),
        _ => None,
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LhmSensor {
    pub name: Option<String>,
    #[allow(dead_code)]
    pub sensor_type: Option<String>,
    pub value: Option<f32>,
    #[serde(default)]
    pub parent: Option<String>,
}

fn connect(component: ComponentKind) -> Result<WMIConnection> {
    WMIConnection::with_namespace_path(NAMESPACE).map_err(|e| PlatformError::ResourceUnavailable {
        component,
        detail: format!("LibreHardwareMonitor WMI namespace unavailable ({e}); is it running?"),
    })
}

/// Opens (or shares) this thread's connection.
pub(crate) fn acquire(component: ComponentKind) -> Result<()> {
    CONNECTION.with(|cell| {
        let mut slot = cell.borrow_mut();
        match slot.as_mut() {
            Some((_, refs)) => *refs += 1,
            None => {
                *slot = Some((connect(component)?, 1));
                debug!("LibreHardwareMonitor connection opened");
            }
        }
        Ok(())
    })
}

/// Drops one reference to this thread's connection.
pub(crate) fn release() {
    CONNECTION.with(|cell| {
        let mut slot = cell.borrow_mut();
        if let Some((_, refs)) = slot.as_mut() {
            *refs -= 1;
            if *refs == 0 {
                *slot = None;
                debug!("LibreHardwareMonitor connection closed");
            }
        }
    });
}

/// Runs `f` on this thread's connection, or on a short-lived one when no
/// source on this thread has been opened (construction happens elsewhere).
fn with_connection<T>(
    component: ComponentKind,
    f: impl FnOnce(&WMIConnection) -> Result<T>,
) -> Result<T> {
    CONNECTION.with(|cell| match cell.borrow().as_ref() {
        Some((conn, _)) => f(conn),
        None => f(&connect(component)?),
    })
}

/// Hardware entries of the enabled groups.
pub(crate) fn hardware(component: ComponentKind) -> Result<Vec<LhmHardware>> {
    let all: Vec<LhmHardware> = with_connection(component, |conn| {
        conn.raw_query("SELECT Identifier, Name, HardwareType FROM Hardware")
            .map_err(|e| PlatformError::ResourceUnavailable {
                component,
                detail: format!("hardware query failed: {e}"),
            })
    })?;

    Ok(all
        .into_iter()
        .filter(|hw| hw.group().is_some_and(group_enabled))
        .collect())
}

/// Sensors attached to one hardware entry.
pub(crate) fn sensors_of(component: ComponentKind, identifier: &str) -> Result<Vec<LhmSensor>> {
    let query = format!(
        "SELECT Name, SensorType, Value, Parent FROM Sensor WHERE Parent='{}'",
        identifier.replace('\'', "")
    );
    with_connection(component, |conn| {
        conn.raw_query(&query)
            .map_err(|e| PlatformError::ResourceUnavailable {
                component,
                detail: format!("sensor query failed: {e}"),
            })
    })
}

/// Reads the first power sensor, in `names` order, among hardware of the
/// enabled groups, optionally restricted to one parent identifier.
pub(crate) fn read_power_sensor(
    component: ComponentKind,
    names: &[&str],
    parent: Option<&str>,
) -> Result<f64> {
    let sensors: Vec<LhmSensor> = with_connection(component, |conn| {
        conn.raw_query(POWER_SENSOR_QUERY).map_err(|e| {
            PlatformError::power_read(component, format!("sensor query failed: {e}"))
        })
    })?;
    let sensors = retain_groups(sensors, group_enabled);

    select_power(&sensors, names, parent).ok_or_else(|| {
        PlatformError::power_read(component, format!("no {} sensor reported", names.join(" / ")))
    })
}

fn retain_groups(
    mut sensors: Vec<LhmSensor>,
    enabled: impl Fn(SensorGroup) -> bool,
) -> Vec<LhmSensor> {
    sensors.retain(|s| {
        s.parent
            .as_deref()
            .and_then(identifier_group)
            .is_some_and(&enabled)
    });
    sensors
}

pub(crate) fn select_power(
    sensors: &[LhmSensor],
    names: &[&str],
    parent: Option<&str>,
) -> Option<f64> {
    names.iter().find_map(|wanted| {
        sensors
            .iter()
            .filter(|s| parent.is_none() || s.parent.as_deref() == parent)
            .find(|s| s.name.as_deref() == Some(*wanted))
            .and_then(|s| s.value)
            .map(f64::from)
    })
}
