//! Construction of power sources, one factory per component kind.
//!
//! A factory performs all hardware identification up front and picks the
//! backend for the operating system it is given. Backends that were not
//! compiled into this build report [`PlatformError::BackendUnavailable`].

use std::collections::BTreeMap;

use joule_platform::{
    ComponentKind, OperatingSystemKind, PlatformError, PowerSource, ProcessTarget,
};

type SourceResult = std::result::Result<Box<dyn PowerSource>, PlatformError>;

/// Builds the [`PowerSource`] for one component kind.
pub trait ComponentFactory: Send + Sync {
    /// Kind of source this factory builds.
    fn kind(&self) -> ComponentKind;

    /// Identifies the hardware and builds a source for `os`.
    ///
    /// Fails with `ManufacturerIdentification` when the vendor is not
    /// supported and `ResourceUnavailable` when the hardware is absent.
    fn create(&self, os: OperatingSystemKind, target: ProcessTarget) -> SourceResult;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CpuFactory;

impl ComponentFactory for CpuFactory {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Cpu
    }

    fn create(&self, os: OperatingSystemKind, target: ProcessTarget) -> SourceResult {
        match os {
            OperatingSystemKind::Linux => backends::linux_cpu(target),
            OperatingSystemKind::Windows => backends::windows_cpu(target),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GpuFactory;

impl ComponentFactory for GpuFactory {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Gpu
    }

    fn create(&self, os: OperatingSystemKind, _target: ProcessTarget) -> SourceResult {
        match os {
            OperatingSystemKind::Linux => backends::linux_gpu(),
            OperatingSystemKind::Windows => backends::windows_gpu(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryFactory;

impl ComponentFactory for MemoryFactory {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Memory
    }

    fn create(&self, os: OperatingSystemKind, target: ProcessTarget) -> SourceResult {
        match os {
            OperatingSystemKind::Linux => backends::linux_memory(target),
            OperatingSystemKind::Windows => backends::windows_memory(target),
        }
    }
}

/// One factory per component kind.
pub struct FactorySet {
    factories: BTreeMap<ComponentKind, Box<dyn ComponentFactory>>,
}

impl Default for FactorySet {
    fn default() -> Self {
        Self::platform()
    }
}

impl FactorySet {
    /// Factories backed by this build's OS backends.
    pub fn platform() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
        .with(CpuFactory)
        .with(GpuFactory)
        .with(MemoryFactory)
    }

    /// Replaces the factory for `factory.kind()`.
    pub fn with(mut self, factory: impl ComponentFactory + 'static) -> Self {
        self.factories.insert(factory.kind(), Box::new(factory));
        self
    }

    pub fn get(&self, kind: ComponentKind) -> Option<&dyn ComponentFactory> {
        self.factories.get(&kind).map(|f| f.as_ref())
    }

    pub(crate) fn create(
        &self,
        kind: ComponentKind,
        os: OperatingSystemKind,
        target: ProcessTarget,
    ) -> SourceResult {
        match self.get(kind) {
            Some(factory) => factory.create(os, target),
            None => Err(PlatformError::BackendUnavailable {
                component: kind,
                os: os.label().to_string(),
            }),
        }
    }
}

mod backends {
    use super::SourceResult;
    use joule_platform::{ComponentKind, MemorySource, PlatformError, ProcessTarget};

    fn unavailable(component: ComponentKind, os: &str) -> SourceResult {
        Err(PlatformError::BackendUnavailable {
            component,
            os: os.to_string(),
        })
    }

    #[cfg(target_os = "linux")]
    pub(super) fn linux_cpu(target: ProcessTarget) -> SourceResult {
        Ok(Box::new(joule_platform::linux::LinuxCpu::new(target)?))
    }

    #[cfg(not(target_os = "linux"))]
    pub(super) fn linux_cpu(_target: ProcessTarget) -> SourceResult {
        unavailable(ComponentKind::Cpu, "Linux")
    }

    #[cfg(target_os = "linux")]
    pub(super) fn linux_gpu() -> SourceResult {
        Ok(Box::new(joule_platform::linux::LinuxGpu::new()?))
    }

    #[cfg(not(target_os = "linux"))]
    pub(super) fn linux_gpu() -> SourceResult {
        unavailable(ComponentKind::Gpu, "Linux")
    }

    #[cfg(target_os = "linux")]
    pub(super) fn linux_memory(target: ProcessTarget) -> SourceResult {
        let layout = joule_platform::linux::read_memory_layout()?;
        Ok(Box::new(MemorySource::new(layout, target)))
    }

    #[cfg(not(target_os = "linux"))]
    pub(super) fn linux_memory(_target: ProcessTarget) -> SourceResult {
        unavailable(ComponentKind::Memory, "Linux")
    }

    #[cfg(target_os = "windows")]
    pub(super) fn windows_cpu(target: ProcessTarget) -> SourceResult {
        Ok(Box::new(joule_platform::windows::WindowsCpu::new(target)?))
    }

    #[cfg(not(target_os = "windows"))]
    pub(super) fn windows_cpu(_target: ProcessTarget) -> SourceResult {
        unavailable(ComponentKind::Cpu, "Windows")
    }

    #[cfg(target_os = "windows")]
    pub(super) fn windows_gpu() -> SourceResult {
        Ok(Box::new(joule_platform::windows::WindowsGpu::new()?))
    }

    #[cfg(not(target_os = "windows"))]
    pub(super) fn windows_gpu() -> SourceResult {
        unavailable(ComponentKind::Gpu, "Windows")
    }

    #[cfg(target_os = "windows")]
    pub(super) fn windows_memory(target: ProcessTarget) -> SourceResult {
        let layout = joule_platform::windows::read_memory_layout()?;
        Ok(Box::new(MemorySource::new(layout, target)))
    }

    #[cfg(not(target_os = "windows"))]
    pub(super) fn windows_memory(_target: ProcessTarget) -> SourceResult {
        unavailable(ComponentKind::Memory, "Windows")
    }
}
