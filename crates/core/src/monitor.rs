//! The energy monitor: construction, lifecycle and queries.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use joule_platform::{ComponentKind, OperatingSystemKind};
use serde::Serialize;
use tracing::{debug, info};

use crate::component::{ComponentSummary, MonitoredComponent};
use crate::config::MonitorConfig;
use crate::energy::EnergyReader;
use crate::error::{MonitorError, Result};
use crate::factory::FactorySet;
use crate::request::ComponentRequest;
use crate::sampler::{Sampler, SamplerStats, StopSignal};

/// Lifecycle of a [`Monitor`]. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Created,
    Running,
    Stopped,
}

impl MonitorState {
    pub fn label(&self) -> &'static str {
        match self {
            MonitorState::Created => "created",
            MonitorState::Running => "running",
            MonitorState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

enum Lifecycle {
    Created(Sampler),
    Running {
        handle: JoinHandle<Sampler>,
        stop: Arc<StopSignal>,
    },
    Stopped,
}

/// Samples power draw of the requested components in the background and
/// integrates it into energy.
///
/// ```ignore
/// let request = ComponentRequest::from_flags([("cpu", true), ("memory", true)])?;
/// let mut monitor = Monitor::new(&request)?;
/// monitor.start()?;
/// run_workload();
/// monitor.end()?;
/// println!("{:?}", monitor.energy_consumed_by_components());
/// ```
pub struct Monitor {
    os: OperatingSystemKind,
    config: MonitorConfig,
    summaries: Vec<ComponentSummary>,
    readers: BTreeMap<ComponentKind, EnergyReader>,
    stats: Arc<SamplerStats>,
    lifecycle: Lifecycle,
}

impl Monitor {
    /// Builds a monitor for the current OS with the default configuration.
    pub fn new(request: &ComponentRequest) -> Result<Self> {
        Self::with_config(request, MonitorConfig::default())
    }

    pub fn with_config(request: &ComponentRequest, config: MonitorConfig) -> Result<Self> {
        let os = OperatingSystemKind::detect()
            .map_err(|e| MonitorError::UnsupportedOperatingSystem(e.to_string()))?;
        Self::from_factories(request, config, os, &FactorySet::platform())
    }

    /// Builds every requested component with `factories`.
    ///
    /// Any failure aborts construction; no partially built monitor is
    /// returned.
    pub fn from_factories(
        request: &ComponentRequest,
        config: MonitorConfig,
        os: OperatingSystemKind,
        factories: &FactorySet,
    ) -> Result<Self> {
        let mut components = Vec::with_capacity(request.len());
        for kind in request.kinds() {
            let source = factories
                .create(kind, os, config.target)
                .map_err(|source| MonitorError::ObjectCreation { kind, source })?;
            let component = MonitoredComponent::new(kind, source);
            let summary = component.summary();
            info!(
                component = %kind,
                name = summary.name.as_deref().unwrap_or("unknown"),
                manufacturer = ?summary.manufacturer,
                "component ready"
            );
            components.push(component);
        }

        let summaries = components.iter().map(|c| c.summary()).collect();
        let readers = components.iter().map(|c| (c.kind(), c.reader())).collect();
        let stats = Arc::new(SamplerStats::default());

        Ok(Self {
            os,
            config,
            summaries,
            readers,
            stats: Arc::clone(&stats),
            lifecycle: Lifecycle::Created(Sampler::new(components, stats)),
        })
    }

    /// Launches the sampling thread.
    ///
    /// Blocks until backend handles are open. Fails with `AlreadyStarted`
    /// while running and `AlreadyStopped` once ended.
    pub fn start(&mut self) -> Result<()> {
        let sampler = match std::mem::replace(&mut self.lifecycle, Lifecycle::Stopped) {
            Lifecycle::Created(sampler) => sampler,
            running @ Lifecycle::Running { .. } => {
                self.lifecycle = running;
                return Err(MonitorError::AlreadyStarted);
            }
            Lifecycle::Stopped => return Err(MonitorError::AlreadyStopped),
        };

        let stop = Arc::new(StopSignal::default());
        let loop_stop = Arc::clone(&stop);
        let interval = self.config.sample_interval;
        let (ready_tx, ready_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("joule-sampler".to_string())
            .spawn(move || sampler.run(interval, &loop_stop, ready_tx))
            .map_err(MonitorError::Spawn)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!(
                    interval = %format_interval(interval),
                    components = self.readers.len(),
                    "monitor started"
                );
                self.lifecycle = Lifecycle::Running { handle, stop };
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(MonitorError::SamplerPanicked)
            }
        }
    }

    /// Stops sampling and waits for the loop to exit and close its handles.
    ///
    /// The cycle in progress is completed first. Calling `end` again, or on
    /// a monitor that never started, is a no-op that leaves it `Stopped`.
    pub fn end(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.lifecycle, Lifecycle::Stopped) {
            Lifecycle::Created(_) => {
                debug!("monitor ended before start");
                Ok(())
            }
            Lifecycle::Running { handle, stop } => {
                stop.request();
                handle.join().map_err(|_| MonitorError::SamplerPanicked)?;
                info!(
                    cycles = self.stats.cycles(),
                    total_kwh = self.total_energy_consumed(),
                    "monitor stopped"
                );
                Ok(())
            }
            Lifecycle::Stopped => Ok(()),
        }
    }

    /// Runs one cycle on the calling thread, integrating `elapsed`.
    ///
    /// Only valid before `start`; lets callers drive sampling themselves.
    pub fn sample_once(&mut self, elapsed: Duration) -> Result<()> {
        match &mut self.lifecycle {
            Lifecycle::Created(sampler) => {
                sampler.cycle(elapsed);
                Ok(())
            }
            Lifecycle::Running { .. } => Err(MonitorError::AlreadyStarted),
            Lifecycle::Stopped => Err(MonitorError::AlreadyStopped),
        }
    }

    pub fn state(&self) -> MonitorState {
        match self.lifecycle {
            Lifecycle::Created(_) => MonitorState::Created,
            Lifecycle::Running { .. } => MonitorState::Running,
            Lifecycle::Stopped => MonitorState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == MonitorState::Running
    }

    pub fn operating_system(&self) -> OperatingSystemKind {
        self.os
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Energy per monitored component in kWh. Unmonitored kinds are absent.
    pub fn energy_consumed_by_components(&self) -> BTreeMap<ComponentKind, f64> {
        self.readers
            .iter()
            .map(|(kind, reader)| (*kind, reader.kwh()))
            .collect()
    }

    /// Energy of one component in kWh, or `None` if it is not monitored.
    pub fn energy_consumed(&self, kind: ComponentKind) -> Option<f64> {
        self.readers.get(&kind).map(EnergyReader::kwh)
    }

    /// Handle on one component's total that other threads can poll without
    /// borrowing the monitor, including while `end` is joining the sampler.
    pub fn energy_reader(&self, kind: ComponentKind) -> Option<EnergyReader> {
        self.readers.get(&kind).cloned()
    }

    pub fn energy_readers(&self) -> BTreeMap<ComponentKind, EnergyReader> {
        self.readers.clone()
    }

    /// Sum over every monitored component, in kWh.
    pub fn total_energy_consumed(&self) -> f64 {
        self.readers.values().map(EnergyReader::kwh).sum()
    }

    pub fn monitored_components(&self) -> &[ComponentSummary] {
        &self.summaries
    }

    /// Completed sampling cycles.
    pub fn cycles(&self) -> u64 {
        self.stats.cycles()
    }

    pub fn last_sample_time(&self) -> Option<DateTime<Utc>> {
        self.stats.last_sample_time()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.end();
        }
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("os", &self.os)
            .field("config", &self.config)
            .field("state", &self.state())
            .field("components", &self.summaries)
            .field("cycles", &self.cycles())
            .finish()
    }
}

fn format_interval(interval: Duration) -> String {
    if interval.subsec_millis() == 0 {
        format!("{}s", interval.as_secs())
    } else {
        format!("{}ms", interval.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(Duration::from_secs(10)), "10s");
        assert_eq!(format_interval(Duration::from_millis(250)), "250ms");
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(MonitorState::Running.to_string(), "running");
        assert_eq!(MonitorState::Stopped.label(), "stopped");
    }
}
