//! Error types for hardware identification and power reads.

use crate::types::ComponentKind;

/// Errors raised by power backends.
///
/// Identification and availability errors only occur while a backend is
/// being constructed. `PowerRead` is the only error a constructed backend
/// returns while sampling, and callers are expected to recover from it.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The vendor of the hardware could not be classified.
    #[error("{component}: unable to identify hardware manufacturer ({detail})")]
    ManufacturerIdentification {
        component: ComponentKind,
        detail: String,
    },

    /// The model name of the hardware could not be read.
    #[error("{component}: unable to identify hardware name ({detail})")]
    NameIdentification {
        component: ComponentKind,
        detail: String,
    },

    /// The hardware class was requested but is not present.
    #[error("{component}: resource not found ({detail})")]
    ResourceUnavailable {
        component: ComponentKind,
        detail: String,
    },

    /// A transient failure while reading instantaneous power.
    #[error("{component}: failed to read power ({detail})")]
    PowerRead {
        component: ComponentKind,
        detail: String,
    },

    /// The operating system is neither Linux nor Windows.
    #[error("unable to identify operating system: {0}")]
    UnsupportedOperatingSystem(String),

    /// No backend for this component was compiled for the requested OS.
    #[error("{component}: no {os} backend in this build")]
    BackendUnavailable { component: ComponentKind, os: String },

    /// Failed to read a sysfs or procfs file.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// An external tool could not be run or exited unsuccessfully.
    #[error("command `{program}` failed: {detail}")]
    Command { program: String, detail: String },
}

impl PlatformError {
    pub(crate) fn power_read(component: ComponentKind, detail: impl Into<String>) -> Self {
        PlatformError::PowerRead {
            component,
            detail: detail.into(),
        }
    }

    /// Returns `true` for errors that only affect a single sample.
    pub fn is_transient(&self) -> bool {
        matches!(self, PlatformError::PowerRead { .. })
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;
