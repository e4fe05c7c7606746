use std::fs;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};

use crate::config::{config_path, UserConfig};

pub fn run(path: bool, reset: bool) -> Result<()> {
    let config_file = config_path();

    if path {
        println!("{}", config_file.display());
    } else if reset {
        reset_at(&config_file)?;
        println!("Config reset to defaults at: {}", config_file.display());
    } else {
        print!("{}", describe(&config_file)?);
    }
    Ok(())
}

fn reset_at(config_file: &Path) -> Result<()> {
    if let Some(dir) = config_file.parent() {
        fs::create_dir_all(dir)?;
    }
    UserConfig::default()
        .save_to(config_file)
        .wrap_err_with(|| format!("failed to write {}", config_file.display()))
}

/// The stored settings followed by the values a session would use.
fn describe(config_file: &Path) -> Result<String> {
    let config = UserConfig::load_from(config_file);

    let mut lines = vec![format!("Config file: {}", config_file.display())];
    if !config_file.exists() {
        lines.push("(not created yet, showing defaults)".to_string());
    }
    lines.push(String::new());
    lines.push(toml::to_string_pretty(&config)?);

    lines.push(format!(
        "Sampling every {}",
        humantime::format_duration(config.sample_interval())
    ));
    lines.push(match config.component_request() {
        Ok(request) => {
            let kinds: Vec<&str> = request.kinds().map(|k| k.as_str()).collect();
            format!("Monitoring {}", kinds.join(", "))
        }
        Err(e) => format!("Components rejected: {e}"),
    });

    Ok(lines.join("\n") + "\n")
}
