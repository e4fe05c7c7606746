//! Monitor configuration.

use std::time::Duration;

use joule_platform::ProcessTarget;

/// Time between two samples when nothing else is configured.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(10);

/// Shortest interval accepted; anything below is raised to this.
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Sleep between sampling cycles.
    pub sample_interval: Duration,
    /// Process whose share of CPU and memory is attributed.
    pub target: ProcessTarget,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            target: ProcessTarget::Current,
        }
    }
}

impl MonitorConfig {
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval.max(MIN_SAMPLE_INTERVAL);
        self
    }

    pub fn with_target(mut self, target: ProcessTarget) -> Self {
        self.target = target;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.sample_interval, Duration::from_secs(10));
        assert_eq!(config.target, ProcessTarget::Current);
    }

    #[test]
    fn test_builder() {
        let config = MonitorConfig::default()
            .with_sample_interval(Duration::from_millis(250))
            .with_target(ProcessTarget::Pid(1234));
        assert_eq!(config.sample_interval, Duration::from_millis(250));
        assert_eq!(config.target, ProcessTarget::Pid(1234));
    }

    #[test]
    fn test_zero_interval_is_raised() {
        let config = MonitorConfig::default().with_sample_interval(Duration::ZERO);
        assert_eq!(config.sample_interval, MIN_SAMPLE_INTERVAL);
    }
}
