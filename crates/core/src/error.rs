//! Errors raised while building or controlling a [`Monitor`](crate::Monitor).

use joule_platform::{ComponentKind, PlatformError};

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The request named an unknown component or too many components.
    #[error("invalid component set: {0}")]
    InvalidComponentSet(String),

    /// A factory failed to identify or reach the hardware.
    #[error("failed to create {kind} component")]
    ObjectCreation {
        kind: ComponentKind,
        #[source]
        source: PlatformError,
    },

    #[error("unsupported operating system: {0}")]
    UnsupportedOperatingSystem(String),

    #[error("monitor is already running")]
    AlreadyStarted,

    #[error("monitor has already been stopped")]
    AlreadyStopped,

    /// A stateful backend handle could not be opened in the sampling thread.
    #[error("failed to open {kind} backend")]
    ResourceOpen {
        kind: ComponentKind,
        #[source]
        source: PlatformError,
    },

    #[error("failed to spawn sampling thread")]
    Spawn(#[source] std::io::Error),

    #[error("sampling thread panicked")]
    SamplerPanicked,
}

pub type Result<T> = std::result::Result<T, MonitorError>;
