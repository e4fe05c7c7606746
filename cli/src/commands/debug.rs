use std::time::Duration;

use bytesize::ByteSize;
use color_eyre::eyre::Result;
use joule_core::{ComponentKind, FactorySet, OperatingSystemKind, PowerSource, ProcessTarget};
use joule_platform::ProcessProbe;

use crate::config::{config_path, UserConfig};
use crate::logging::log_dir;

pub fn run() -> Result<()> {
    println!("joule debug information");
    println!("{}", "=".repeat(60));

    println!("\n--- System Info ---");
    let os = match OperatingSystemKind::detect() {
        Ok(os) => os,
        Err(e) => {
            println!("Operating system: {e}");
            return Ok(());
        }
    };
    println!("Operating system: {os}");

    let mut probe = ProcessProbe::new(ProcessTarget::Current);
    if let Some(rss) = probe.resident_bytes() {
        println!("joule resident memory: {}", ByteSize::b(rss));
    }

    println!("\n--- Components ---");
    let factories = FactorySet::platform();
    for kind in ComponentKind::ALL {
        let Some(factory) = factories.get(kind) else {
            continue;
        };
        match factory.create(os, ProcessTarget::Current) {
            Ok(mut source) => print_source(kind, source.as_mut()),
            Err(e) => println!("{:<8} unavailable: {e}", kind.label()),
        }
    }

    println!("\n--- Config Paths ---");
    println!("Config: {}", config_path().display());
    println!("Logs: {}", log_dir().display());

    println!("\n--- Current Config ---");
    let config = UserConfig::load();
    println!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}

fn print_source(kind: ComponentKind, source: &mut dyn PowerSource) {
    let info = source.info().clone();
    println!(
        "{:<8} {} ({})",
        kind.label(),
        info.name.as_deref().unwrap_or("unknown"),
        info.manufacturer
            .map(|m| m.label())
            .unwrap_or("no manufacturer")
    );

    if let Err(e) = source.open() {
        println!("         open failed: {e}");
        return;
    }

    // Prime the process share so the second reading covers a real window.
    let _ = source.process_share();
    std::thread::sleep(Duration::from_millis(500));

    match source.read_power() {
        Ok(watts) => {
            let share = source.process_share();
            println!("         power: {watts:.2} W (process share {:.1}%)", share * 100.0);
        }
        Err(e) => println!("         power read failed: {e}"),
    }
    source.close();
}
