use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use joule_core::{
    ComponentFactory, ComponentKind, ComponentRequest, EnergyReader, FactorySet, Monitor,
    MonitorConfig, MonitorError, MonitorState, OperatingSystemKind, PlatformError, PowerSource,
    ProcessTarget, SourceInfo,
};
use joule_platform::{classify_cpu, GpuManufacturer};
use pretty_assertions::assert_eq;

const KWH: f64 = 3_600_000.0;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-15_f64.max(b.abs() * 1e-9)
}

#[derive(Default)]
struct Probe {
    creates: AtomicUsize,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

/// Replays `readings` in order, then repeats the last one.
struct Scripted {
    info: SourceInfo,
    readings: Vec<Option<f64>>,
    next: usize,
    share: f64,
    fail_open: bool,
    read_delay: Duration,
    probe: Arc<Probe>,
}

impl PowerSource for Scripted {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn read_power(&mut self) -> joule_platform::Result<f64> {
        if !self.read_delay.is_zero() {
            thread::sleep(self.read_delay);
        }
        let index = self.next.min(self.readings.len() - 1);
        self.next += 1;
        self.readings[index].ok_or_else(|| PlatformError::PowerRead {
            component: self.info.kind,
            detail: "sensor timeout".to_string(),
        })
    }

    fn process_share(&mut self) -> f64 {
        self.share
    }

    fn open(&mut self) -> joule_platform::Result<()> {
        if self.fail_open {
            return Err(PlatformError::ResourceUnavailable {
                component: self.info.kind,
                detail: "hardware monitor service is not running".to_string(),
            });
        }
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
    }
}

struct ScriptedFactory {
    kind: ComponentKind,
    readings: Vec<Option<f64>>,
    share: f64,
    fail_open: bool,
    read_delay: Duration,
    probe: Arc<Probe>,
}

impl ScriptedFactory {
    fn new(kind: ComponentKind, watts: f64) -> Self {
        Self {
            kind,
            readings: vec![Some(watts)],
            share: 1.0,
            fail_open: false,
            read_delay: Duration::ZERO,
            probe: Arc::default(),
        }
    }

    fn readings(mut self, readings: Vec<Option<f64>>) -> Self {
        self.readings = readings;
        self
    }

    fn share(mut self, share: f64) -> Self {
        self.share = share;
        self
    }

    fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    fn slow_reads(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    fn probe(mut self, probe: &Arc<Probe>) -> Self {
        self.probe = Arc::clone(probe);
        self
    }
}

impl ComponentFactory for ScriptedFactory {
    fn kind(&self) -> ComponentKind {
        self.kind
    }

    fn create(
        &self,
        _os: OperatingSystemKind,
        _target: ProcessTarget,
    ) -> Result<Box<dyn PowerSource>, PlatformError> {
        self.probe.creates.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Scripted {
            info: SourceInfo::new(self.kind).with_name(format!("test {}", self.kind.as_str())),
            readings: self.readings.clone(),
            next: 0,
            share: self.share,
            fail_open: self.fail_open,
            read_delay: self.read_delay,
            probe: Arc::clone(&self.probe),
        }))
    }
}

/// Identifies the CPU from a fixed CPUID vendor string.
struct VendorFactory(&'static str);

impl ComponentFactory for VendorFactory {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Cpu
    }

    fn create(
        &self,
        _os: OperatingSystemKind,
        _target: ProcessTarget,
    ) -> Result<Box<dyn PowerSource>, PlatformError> {
        let info = classify_cpu(self.0, "Test Processor")?;
        Ok(Box::new(Scripted {
            info,
            readings: vec![Some(10.0)],
            next: 0,
            share: 1.0,
            fail_open: false,
            read_delay: Duration::ZERO,
            probe: Arc::default(),
        }))
    }
}

fn build(request: &ComponentRequest, factories: &FactorySet) -> Result<Monitor, MonitorError> {
    Monitor::from_factories(
        request,
        MonitorConfig::default(),
        OperatingSystemKind::Linux,
        factories,
    )
}

#[test]
fn test_cpu_and_memory_scenario() {
    let request =
        ComponentRequest::from_flags([("cpu", true), ("gpu", false), ("memory", true)]).unwrap();
    let factories = FactorySet::platform()
        .with(ScriptedFactory::new(ComponentKind::Cpu, 20.0).share(0.5))
        .with(ScriptedFactory::new(ComponentKind::Memory, 5.0));

    let mut monitor = build(&request, &factories).unwrap();
    for _ in 0..3 {
        monitor.sample_once(Duration::from_secs(10)).unwrap();
    }

    let energy = monitor.energy_consumed_by_components();
    assert_eq!(
        energy.keys().copied().collect::<Vec<_>>(),
        vec![ComponentKind::Cpu, ComponentKind::Memory]
    );
    assert!(approx(energy[&ComponentKind::Cpu], 3.0 * 20.0 * 0.5 * 10.0 / KWH));
    assert!(approx(energy[&ComponentKind::Memory], 3.0 * 5.0 * 10.0 / KWH));
    assert_eq!(monitor.energy_consumed(ComponentKind::Gpu), None);
    assert!(approx(
        monitor.total_energy_consumed(),
        (300.0 + 150.0) / KWH
    ));
    assert_eq!(monitor.cycles(), 3);
    assert!(monitor.last_sample_time().is_some());
}

#[test]
fn test_share_only_scales_cpu() {
    let request = ComponentRequest::of([ComponentKind::Cpu, ComponentKind::Gpu]);
    let factories = FactorySet::platform()
        .with(ScriptedFactory::new(ComponentKind::Cpu, 100.0).share(0.25))
        .with(ScriptedFactory::new(ComponentKind::Gpu, 100.0).share(0.25));

    let mut monitor = build(&request, &factories).unwrap();
    monitor.sample_once(Duration::from_secs(36)).unwrap();

    let energy = monitor.energy_consumed_by_components();
    assert!(approx(energy[&ComponentKind::Cpu], 0.00025));
    assert!(approx(energy[&ComponentKind::Gpu], 0.001));
}

#[test]
fn test_invalid_key_rejected_before_any_factory() {
    let probe = Arc::new(Probe::default());
    let factories = FactorySet::platform()
        .with(ScriptedFactory::new(ComponentKind::Gpu, 50.0).probe(&probe));

    let flags = HashMap::from([("gpu", true), ("banana", true)]);
    let result = ComponentRequest::from_flags(flags).and_then(|request| build(&request, &factories));

    assert!(matches!(result, Err(MonitorError::InvalidComponentSet(_))));
    assert_eq!(probe.creates.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unknown_vendor_aborts_construction() {
    let probe = Arc::new(Probe::default());
    let request = ComponentRequest::of([ComponentKind::Cpu, ComponentKind::Memory]);
    let factories = FactorySet::platform()
        .with(VendorFactory("CentaurHauls"))
        .with(ScriptedFactory::new(ComponentKind::Memory, 5.0).probe(&probe));

    let err = build(&request, &factories).unwrap_err();
    match err {
        MonitorError::ObjectCreation {
            kind: ComponentKind::Cpu,
            source: PlatformError::ManufacturerIdentification { ref detail, .. },
        } => assert!(detail.contains("CentaurHauls")),
        other => panic!("unexpected error: {other:?}"),
    }
    // CPU is built first, so memory is never probed.
    assert_eq!(probe.creates.load(Ordering::SeqCst), 0);
}

#[test]
fn test_known_vendor_summary() {
    let request = ComponentRequest::of([ComponentKind::Cpu]);
    let factories = FactorySet::platform().with(VendorFactory("AuthenticAMD"));

    let monitor = build(&request, &factories).unwrap();
    let summaries = monitor.monitored_components();

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].kind, ComponentKind::Cpu);
    assert_eq!(summaries[0].name.as_deref(), Some("Test Processor"));
    assert_eq!(
        summaries[0].manufacturer.map(|m| m.label()),
        Some("AMD")
    );
}

#[test]
fn test_gpu_failure_is_object_creation() {
    struct NoGpu;
    impl ComponentFactory for NoGpu {
        fn kind(&self) -> ComponentKind {
            ComponentKind::Gpu
        }
        fn create(
            &self,
            _os: OperatingSystemKind,
            _target: ProcessTarget,
        ) -> Result<Box<dyn PowerSource>, PlatformError> {
            Err(PlatformError::ResourceUnavailable {
                component: ComponentKind::Gpu,
                detail: format!("no {} card", GpuManufacturer::Nvidia.label()),
            })
        }
    }

    let request = ComponentRequest::of([ComponentKind::Gpu]);
    let factories = FactorySet::platform().with(NoGpu);

    let err = build(&request, &factories).unwrap_err();
    assert!(matches!(
        err,
        MonitorError::ObjectCreation {
            kind: ComponentKind::Gpu,
            source: PlatformError::ResourceUnavailable { .. },
        }
    ));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_failed_reads_count_as_zero_and_stay_monotonic() {
    let request = ComponentRequest::of([ComponentKind::Gpu]);
    let readings = vec![
        Some(10.0),
        None,
        Some(-4.0),
        Some(f64::NAN),
        Some(0.0),
        Some(f64::INFINITY),
        Some(250.0),
    ];
    let factories = FactorySet::platform()
        .with(ScriptedFactory::new(ComponentKind::Gpu, 0.0).readings(readings.clone()));

    let mut monitor = build(&request, &factories).unwrap();
    let mut last = 0.0;
    for _ in 0..readings.len() {
        monitor.sample_once(Duration::from_secs(1)).unwrap();
        let now = monitor.total_energy_consumed();
        assert!(now >= last);
        last = now;
    }

    assert!(approx(last, 260.0 / KWH));
    assert_eq!(monitor.cycles(), readings.len() as u64);
}

#[test]
fn test_empty_request_builds_empty_monitor() {
    let monitor = build(&ComponentRequest::default(), &FactorySet::platform()).unwrap();
    assert!(monitor.energy_consumed_by_components().is_empty());
    assert_eq!(monitor.total_energy_consumed(), 0.0);
}

fn running_config() -> MonitorConfig {
    MonitorConfig::default().with_sample_interval(Duration::from_millis(10))
}

#[test]
fn test_background_loop_lifecycle() {
    let probe = Arc::new(Probe::default());
    let request = ComponentRequest::of([ComponentKind::Memory]);
    let factories =
        FactorySet::platform().with(ScriptedFactory::new(ComponentKind::Memory, 3600.0).probe(&probe));

    let mut monitor = Monitor::from_factories(
        &request,
        running_config(),
        OperatingSystemKind::Linux,
        &factories,
    )
    .unwrap();
    assert_eq!(monitor.state(), MonitorState::Created);

    monitor.start().unwrap();
    assert!(monitor.is_running());
    assert_eq!(probe.opens.load(Ordering::SeqCst), 1);

    let mut last = 0.0;
    for _ in 0..10 {
        thread::sleep(Duration::from_millis(10));
        let now = monitor.total_energy_consumed();
        assert!(now >= last);
        last = now;
    }

    monitor.end().unwrap();
    assert_eq!(monitor.state(), MonitorState::Stopped);
    assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
    assert!(monitor.cycles() >= 1);

    let frozen = monitor.energy_consumed_by_components();
    assert!(frozen[&ComponentKind::Memory] > 0.0);

    thread::sleep(Duration::from_millis(30));
    monitor.end().unwrap();
    assert_eq!(monitor.energy_consumed_by_components(), frozen);
    assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_double_start_fails() {
    let request = ComponentRequest::of([ComponentKind::Cpu]);
    let factories = FactorySet::platform().with(ScriptedFactory::new(ComponentKind::Cpu, 1.0));
    let mut monitor = Monitor::from_factories(
        &request,
        running_config(),
        OperatingSystemKind::Linux,
        &factories,
    )
    .unwrap();

    monitor.start().unwrap();
    assert!(matches!(monitor.start(), Err(MonitorError::AlreadyStarted)));
    assert!(monitor.is_running());
    assert!(matches!(
        monitor.sample_once(Duration::from_secs(1)),
        Err(MonitorError::AlreadyStarted)
    ));

    monitor.end().unwrap();
    assert!(matches!(monitor.start(), Err(MonitorError::AlreadyStopped)));
}

#[test]
fn test_end_before_start() {
    let request = ComponentRequest::of([ComponentKind::Cpu]);
    let factories = FactorySet::platform().with(ScriptedFactory::new(ComponentKind::Cpu, 1.0));
    let mut monitor = build(&request, &factories).unwrap();

    monitor.end().unwrap();
    assert_eq!(monitor.state(), MonitorState::Stopped);
    assert_eq!(monitor.cycles(), 0);
    assert!(matches!(monitor.start(), Err(MonitorError::AlreadyStopped)));
}

#[test]
fn test_end_interrupts_long_interval() {
    let request = ComponentRequest::of([ComponentKind::Gpu]);
    let factories = FactorySet::platform().with(ScriptedFactory::new(ComponentKind::Gpu, 100.0));
    let mut monitor = Monitor::from_factories(
        &request,
        MonitorConfig::default().with_sample_interval(Duration::from_secs(3600)),
        OperatingSystemKind::Linux,
        &factories,
    )
    .unwrap();

    monitor.start().unwrap();
    thread::sleep(Duration::from_millis(20));

    let started = Instant::now();
    monitor.end().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    // The interrupted cycle is still accumulated.
    assert_eq!(monitor.cycles(), 1);
    assert!(monitor.total_energy_consumed() > 0.0);
}

#[test]
fn test_open_failure_stops_monitor() {
    let probe = Arc::new(Probe::default());
    let request = ComponentRequest::of([ComponentKind::Cpu, ComponentKind::Gpu]);
    let factories = FactorySet::platform()
        .with(ScriptedFactory::new(ComponentKind::Cpu, 1.0).probe(&probe))
        .with(ScriptedFactory::new(ComponentKind::Gpu, 1.0).failing_open());

    let mut monitor = build(&request, &factories).unwrap();
    let err = monitor.start().unwrap_err();

    assert!(matches!(
        err,
        MonitorError::ResourceOpen {
            kind: ComponentKind::Gpu,
            ..
        }
    ));
    assert_eq!(monitor.state(), MonitorState::Stopped);
    assert_eq!(probe.opens.load(Ordering::SeqCst), 1);
    assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_drop_ends_running_monitor() {
    let probe = Arc::new(Probe::default());
    let request = ComponentRequest::of([ComponentKind::Memory]);
    let factories =
        FactorySet::platform().with(ScriptedFactory::new(ComponentKind::Memory, 1.0).probe(&probe));

    let mut monitor = Monitor::from_factories(
        &request,
        running_config(),
        OperatingSystemKind::Linux,
        &factories,
    )
    .unwrap();
    monitor.start().unwrap();
    drop(monitor);

    assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_readers_poll_without_lock_while_ending() {
    assert_send_sync::<EnergyReader>();

    let request = ComponentRequest::of([ComponentKind::Cpu, ComponentKind::Memory]);
    let factories = FactorySet::platform()
        .with(
            ScriptedFactory::new(ComponentKind::Cpu, 50.0).slow_reads(Duration::from_millis(300)),
        )
        .with(ScriptedFactory::new(ComponentKind::Memory, 5.0));
    let mut monitor = Monitor::from_factories(
        &request,
        running_config(),
        OperatingSystemKind::Linux,
        &factories,
    )
    .unwrap();

    let readers = monitor.energy_readers();
    let cpu = monitor.energy_reader(ComponentKind::Cpu).unwrap();
    assert!(monitor.energy_reader(ComponentKind::Gpu).is_none());

    monitor.start().unwrap();
    // Let the loop enter its first slow read before ending.
    thread::sleep(Duration::from_millis(50));

    let ender = thread::spawn(move || {
        monitor.end().unwrap();
        monitor
    });

    let mut last = 0.0;
    let mut slowest = Duration::ZERO;
    while !ender.is_finished() {
        let started = Instant::now();
        let now: f64 = readers.values().map(EnergyReader::kwh).sum();
        slowest = slowest.max(started.elapsed());
        assert!(now >= last);
        last = now;
        thread::sleep(Duration::from_millis(1));
    }
    let monitor = ender.join().unwrap();

    assert!(slowest < Duration::from_millis(100), "query blocked for {slowest:?}");
    assert!(!monitor.is_running());
    assert_eq!(cpu.kwh(), monitor.energy_consumed(ComponentKind::Cpu).unwrap());
    assert!(approx(
        readers.values().map(EnergyReader::kwh).sum(),
        monitor.total_energy_consumed()
    ));
}

#[test]
fn test_queries_from_other_threads() {
    let request = ComponentRequest::of([ComponentKind::Cpu]);
    let factories = FactorySet::platform().with(ScriptedFactory::new(ComponentKind::Cpu, 50.0));
    let mut monitor = Monitor::from_factories(
        &request,
        running_config(),
        OperatingSystemKind::Linux,
        &factories,
    )
    .unwrap();
    monitor.start().unwrap();

    let pollers: Vec<_> = (0..4)
        .map(|_| {
            let reader = monitor.energy_reader(ComponentKind::Cpu).unwrap();
            thread::spawn(move || {
                let mut last = 0.0;
                for _ in 0..20 {
                    let now = reader.kwh();
                    assert!(now >= last);
                    last = now;
                    thread::sleep(Duration::from_millis(2));
                }
                last
            })
        })
        .collect();
    let seen: Vec<f64> = pollers.into_iter().map(|p| p.join().unwrap()).collect();

    monitor.end().unwrap();
    assert!(!monitor.is_running());
    let total = monitor.total_energy_consumed();
    assert!(seen.iter().all(|kwh| *kwh <= total));
}
