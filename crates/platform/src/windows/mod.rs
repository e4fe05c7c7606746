//! Windows backends: LibreHardwareMonitor sensors over WMI and
//! `Win32_PhysicalMemory`.

mod cpu;
mod gpu;
pub mod lhm;
mod memory;

pub use cpu::WindowsCpu;
pub use gpu::WindowsGpu;
pub use memory::read_memory_layout;
