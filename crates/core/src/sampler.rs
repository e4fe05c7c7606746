//! The sampling loop.
//!
//! Each cycle sleeps for the configured interval, measures how long it
//! actually slept, and integrates every component's draw over that
//! duration. The sleep is a condvar wait, so a stop request wakes the loop
//! early; the shortened cycle is still accumulated before the loop exits.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::component::MonitoredComponent;
use crate::error::{MonitorError, Result};

const NO_SAMPLE: i64 = i64::MIN;

/// Counters shared between the sampler and the monitor.
#[derive(Debug)]
pub(crate) struct SamplerStats {
    cycles: AtomicU64,
    last_sample_ms: AtomicI64,
}

impl Default for SamplerStats {
    fn default() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            last_sample_ms: AtomicI64::new(NO_SAMPLE),
        }
    }
}

impl SamplerStats {
    pub(crate) fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Acquire)
    }

    pub(crate) fn last_sample_time(&self) -> Option<DateTime<Utc>> {
        match self.last_sample_ms.load(Ordering::Acquire) {
            NO_SAMPLE => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }

    fn record(&self, at: DateTime<Utc>) {
        self.last_sample_ms.store(at.timestamp_millis(), Ordering::Release);
        self.cycles.fetch_add(1, Ordering::AcqRel);
    }
}

/// Cooperative stop flag with a wakeup for the sleeping loop.
#[derive(Debug, Default)]
pub(crate) struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    pub(crate) fn request(&self) {
        let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        *stopped = true;
        self.wake.notify_all();
    }

    /// Sleeps up to `timeout`. Returns `true` if a stop was requested.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        let stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        let (stopped, _) = self
            .wake
            .wait_timeout_while(stopped, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *stopped
    }
}

/// Components plus the bookkeeping for one monitor's cycles.
pub(crate) struct Sampler {
    components: Vec<MonitoredComponent>,
    stats: Arc<SamplerStats>,
}

impl Sampler {
    pub(crate) fn new(components: Vec<MonitoredComponent>, stats: Arc<SamplerStats>) -> Self {
        Self { components, stats }
    }

    /// Integrates one interval of `elapsed` into every component.
    ///
    /// Readings are taken in component order and share the same `elapsed`.
    pub(crate) fn cycle(&mut self, elapsed: Duration) {
        for component in &mut self.components {
            let kwh = component.sample(elapsed);
            debug!(
                component = %component.kind(),
                kwh,
                elapsed_ms = elapsed.as_millis() as u64,
                "sample accumulated"
            );
        }
        self.stats.record(Utc::now());
    }

    /// Opens every backend. On failure the ones already opened are closed.
    pub(crate) fn open_all(&mut self) -> Result<()> {
        for index in 0..self.components.len() {
            let component = &mut self.components[index];
            let kind = component.kind();
            if let Err(source) = component.source_mut().open() {
                warn!(component = %kind, error = %source, "failed to open backend");
                for opened in &mut self.components[..index] {
                    opened.source_mut().close();
                }
                return Err(MonitorError::ResourceOpen { kind, source });
            }
        }
        Ok(())
    }

    pub(crate) fn close_all(&mut self) {
        for component in &mut self.components {
            component.source_mut().close();
        }
    }

    /// Body of the sampling thread.
    ///
    /// Handles are opened here, not by the caller, because some backends
    /// are bound to the thread that opened them. The open result is sent on
    /// `ready` before the first cycle.
    pub(crate) fn run(
        mut self,
        interval: Duration,
        stop: &StopSignal,
        ready: Sender<Result<()>>,
    ) -> Self {
        if let Err(e) = self.open_all() {
            let _ = ready.send(Err(e));
            return self;
        }
        if ready.send(Ok(())).is_err() {
            self.close_all();
            return self;
        }

        loop {
            let started = Instant::now();
            let stop_requested = stop.wait(interval);
            self.cycle(started.elapsed());
            if stop_requested {
                break;
            }
        }

        self.close_all();
        debug!(cycles = self.stats.cycles(), "sampling loop exited");
        self
    }
}
