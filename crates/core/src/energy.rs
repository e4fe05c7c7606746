//! Energy integration.
//!
//! Each monitored component owns one [`EnergyAccumulator`]. The accumulator
//! is the only handle that can add energy and it is not `Clone`, so the
//! sampling thread that owns it is the single writer. Any number of
//! [`EnergyReader`]s observe the running total without locking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Joules in one kilowatt-hour.
pub const JOULES_PER_KWH: f64 = 3_600_000.0;

/// Energy in kWh drawn at a constant `watts` for `elapsed`.
pub fn energy_kwh(watts: f64, elapsed: Duration) -> f64 {
    watts * elapsed.as_secs_f64() / JOULES_PER_KWH
}

pub fn kwh_to_joules(kwh: f64) -> f64 {
    kwh * JOULES_PER_KWH
}

/// Writer half of a component's running energy total, in kWh.
#[derive(Debug)]
pub struct EnergyAccumulator {
    total: Arc<AtomicU64>,
}

impl Default for EnergyAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl EnergyAccumulator {
    pub fn new() -> Self {
        Self {
            total: Arc::new(AtomicU64::new(0.0f64.to_bits())),
        }
    }

    pub fn reader(&self) -> EnergyReader {
        EnergyReader {
            total: Arc::clone(&self.total),
        }
    }

    /// Adds `kwh` to the total. Non-positive and non-finite amounts are
    /// ignored so the total never decreases.
    pub fn add_kwh(&mut self, kwh: f64) {
        if !(kwh.is_finite() && kwh > 0.0) {
            return;
        }
        // Single writer: a plain load/store pair cannot race.
        let current = f64::from_bits(self.total.load(Ordering::Acquire));
        self.total.store((current + kwh).to_bits(), Ordering::Release);
    }

    pub fn kwh(&self) -> f64 {
        f64::from_bits(self.total.load(Ordering::Acquire))
    }
}

/// Read-only view of an [`EnergyAccumulator`].
#[derive(Debug, Clone)]
pub struct EnergyReader {
    total: Arc<AtomicU64>,
}

impl EnergyReader {
    pub fn kwh(&self) -> f64 {
        f64::from_bits(self.total.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_kwh() {
        // 1 kW for one hour
        assert_eq!(energy_kwh(1000.0, Duration::from_secs(3600)), 1.0);
        // 20 W for 10 s
        let kwh = energy_kwh(20.0, Duration::from_secs(10));
        assert!((kwh - 200.0 / 3_600_000.0).abs() < 1e-18);
        assert!((kwh_to_joules(kwh) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_accumulator_starts_at_zero() {
        let acc = EnergyAccumulator::new();
        assert_eq!(acc.kwh(), 0.0);
        assert_eq!(acc.reader().kwh(), 0.0);
    }

    #[test]
    fn test_reader_sees_writes() {
        let mut acc = EnergyAccumulator::new();
        let reader = acc.reader();
        let clone = reader.clone();

        acc.add_kwh(0.5);
        acc.add_kwh(0.25);

        assert_eq!(reader.kwh(), 0.75);
        assert_eq!(clone.kwh(), 0.75);
    }

    #[test]
    fn test_accumulator_is_monotonic() {
        let mut acc = EnergyAccumulator::new();
        let reader = acc.reader();
        let mut last = 0.0;

        for amount in [0.1, 0.0, -5.0, f64::NAN, f64::INFINITY, 1e-12, 3.0] {
            acc.add_kwh(amount);
            let now = reader.kwh();
            assert!(now >= last, "{now} < {last} after adding {amount}");
            assert!(now.is_finite());
            last = now;
        }
        assert!((last - (3.1 + 1e-12)).abs() < 1e-9);
    }

    #[test]
    fn test_reader_across_threads() {
        let mut acc = EnergyAccumulator::new();
        let reader = acc.reader();

        let handle = std::thread::spawn(move || {
            for _ in 0..1000 {
                acc.add_kwh(0.001);
            }
            acc
        });

        let mut last = 0.0;
        while !handle.is_finished() {
            let now = reader.kwh();
            assert!(now >= last);
            last = now;
        }
        let acc = handle.join().unwrap();
        assert!((acc.kwh() - 1.0).abs() < 1e-9);
        assert_eq!(reader.kwh(), acc.kwh());
    }
}
