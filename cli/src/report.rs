//! Energy report printed when a monitoring session ends.

use std::fmt::Write as _;
use std::io;
use std::time::Duration;

use chrono::{DateTime, Utc};
use joule_core::{kwh_to_joules, ComponentKind, Manufacturer, Monitor, OperatingSystemKind};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentEnergy {
    pub component: ComponentKind,
    pub name: Option<String>,
    pub manufacturer: Option<Manufacturer>,
    pub kwh: f64,
    pub joules: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyReport {
    pub timestamp: DateTime<Utc>,
    pub operating_system: OperatingSystemKind,
    pub pid: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_secs: f64,
    pub cycles: u64,
    pub components: Vec<ComponentEnergy>,
    pub total_kwh: f64,
    pub total_joules: f64,
}

impl EnergyReport {
    /// Snapshot of a monitor's totals.
    pub fn from_monitor(monitor: &Monitor, pid: u32, duration: Duration) -> Self {
        let energy = monitor.energy_consumed_by_components();
        let components: Vec<ComponentEnergy> = monitor
            .monitored_components()
            .iter()
            .map(|summary| {
                let kwh = energy.get(&summary.kind).copied().unwrap_or(0.0);
                ComponentEnergy {
                    component: summary.kind,
                    name: summary.name.clone(),
                    manufacturer: summary.manufacturer,
                    kwh,
                    joules: kwh_to_joules(kwh),
                }
            })
            .collect();

        let total_kwh = monitor.total_energy_consumed();

        Self {
            timestamp: monitor.last_sample_time().unwrap_or_else(Utc::now),
            operating_system: monitor.operating_system(),
            pid,
            command: None,
            exit_code: None,
            duration_secs: duration.as_secs_f64(),
            cycles: monitor.cycles(),
            components,
            total_kwh,
            total_joules: kwh_to_joules(total_kwh),
        }
    }

    pub fn with_command(mut self, command: impl Into<String>, exit_code: Option<i32>) -> Self {
        self.command = Some(command.into());
        self.exit_code = exit_code;
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes JSON to `out` and the text table to `diag`. The table goes to
    /// the diagnostic stream so a monitored command's stdout stays its own.
    pub fn emit(
        &self,
        json: bool,
        out: &mut impl io::Write,
        diag: &mut impl io::Write,
    ) -> io::Result<()> {
        if json {
            writeln!(out, "{}", self.to_json()?)
        } else {
            write!(diag, "{}", self.render_text())
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let duration = Duration::from_millis((self.duration_secs * 1000.0).round() as u64);

        let _ = writeln!(out, "joule energy report");
        let _ = writeln!(out, "{}", "=".repeat(60));
        if let Some(command) = &self.command {
            let _ = writeln!(out, "Command:   {command}");
        }
        let _ = writeln!(out, "PID:       {}", self.pid);
        if let Some(code) = self.exit_code {
            let _ = writeln!(out, "Exit code: {code}");
        }
        let _ = writeln!(out, "OS:        {}", self.operating_system);
        let _ = writeln!(
            out,
            "Duration:  {} ({} cycles)",
            humantime::format_duration(duration),
            self.cycles
        );
        let _ = writeln!(out);

        for c in &self.components {
            let name = c.name.as_deref().unwrap_or("unknown");
            let _ = writeln!(
                out,
                "{:<8} {:>14.9} kWh {:>12.3} J  {}",
                c.component.label(),
                c.kwh,
                c.joules,
                name
            );
        }
        if self.components.is_empty() {
            let _ = writeln!(out, "(no components monitored)");
        }

        let _ = writeln!(out, "{}", "-".repeat(60));
        let _ = writeln!(
            out,
            "{:<8} {:>14.9} kWh {:>12.3} J",
            "Total", self.total_kwh, self.total_joules
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use joule_platform::CpuManufacturer;

    fn sample_report() -> EnergyReport {
        EnergyReport {
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            operating_system: OperatingSystemKind::Linux,
            pid: 4242,
            command: None,
            exit_code: None,
            duration_secs: 30.0,
            cycles: 3,
            components: vec![ComponentEnergy {
                component: ComponentKind::Cpu,
                name: Some("AMD Ryzen 7 5800X 8-Core Processor".to_string()),
                manufacturer: Some(CpuManufacturer::Amd.into()),
                kwh: 300.0 / 3_600_000.0,
                joules: 300.0,
            }],
            total_kwh: 300.0 / 3_600_000.0,
            total_joules: 300.0,
        }
    }

    #[test]
    fn test_render_text() {
        let report = sample_report().with_command("make test", Some(0));
        let text = report.render_text();

        assert!(text.contains("Command:   make test"));
        assert!(text.contains("Exit code: 0"));
        assert!(text.contains("30s (3 cycles)"));
        assert!(text.contains("AMD Ryzen 7 5800X"));
        assert!(text.contains("300.000 J"));
    }

    #[test]
    fn test_json_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&sample_report().to_json().unwrap()).unwrap();

        assert_eq!(json["pid"], 4242);
        assert_eq!(json["operating_system"], "linux");
        assert_eq!(json["components"][0]["component"], "cpu");
        assert_eq!(json["components"][0]["manufacturer"], "amd");
        assert_eq!(json["total_joules"], 300.0);
        assert!(json.get("command").is_none());
        assert!(json["timestamp"].as_str().unwrap().starts_with("2023-11-14"));
    }

    #[test]
    fn test_emit_streams() {
        let report = sample_report();

        let (mut out, mut diag) = (Vec::new(), Vec::new());
        report.emit(false, &mut out, &mut diag).unwrap();
        assert!(out.is_empty());
        assert_eq!(String::from_utf8(diag).unwrap(), report.render_text());

        let (mut out, mut diag) = (Vec::new(), Vec::new());
        report.emit(true, &mut out, &mut diag).unwrap();
        assert!(diag.is_empty());
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["pid"], 4242);
    }

    #[test]
    fn test_empty_report() {
        let mut report = sample_report();
        report.components.clear();
        assert!(report.render_text().contains("(no components monitored)"));
    }
}
