mod commands;
mod config;
mod logging;
mod report;

use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;

use config::{ensure_dirs, LogLevel, UserConfig};
use logging::LogMode;

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a command and report the energy it consumed
    Run {
        /// Components to monitor (comma-separated: cpu,gpu,memory)
        #[arg(short, long)]
        components: Option<String>,

        /// Sampling interval (e.g. 10s, 500ms)
        #[arg(short, long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,

        /// Print the report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Command to run, after `--`
        #[arg(trailing_var_arg = true, required = true, num_args = 1..)]
        command: Vec<String>,
    },

    /// Monitor a running process until it exits
    Watch {
        /// Process to monitor
        #[arg(short, long)]
        pid: u32,

        /// Stop after this long even if the process is still running
        #[arg(short, long, value_parser = humantime::parse_duration)]
        duration: Option<Duration>,

        /// Components to monitor (comma-separated: cpu,gpu,memory)
        #[arg(short, long)]
        components: Option<String>,

        /// Sampling interval (e.g. 10s, 500ms)
        #[arg(short, long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print detected hardware and one power reading per component
    Debug,

    /// Show, locate or reset the configuration
    Config {
        /// Print config file path
        #[arg(long)]
        path: bool,

        /// Reset config to defaults
        #[arg(long)]
        reset: bool,
    },
}

/// Measure the energy a process draws from the CPU, GPU and memory.
#[derive(Debug, Parser)]
#[command(name = "joule", version, verbatim_doc_comment)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = ensure_dirs();

    let cli = Cli::parse();
    let mut config = UserConfig::load();
    let log_level_override = cli.log_level.as_deref().map(LogLevel::from_str);
    let _guard = logging::init(
        config.log_level,
        LogMode::from_config(config.log_to_file),
        log_level_override,
    );

    match cli.command {
        Commands::Run {
            components,
            interval,
            json,
            command,
        } => {
            config.merge_with_args(components.as_deref(), interval);
            let code = commands::run::run(&config, &command, json)?;
            drop(_guard);
            std::process::exit(code);
        }
        Commands::Watch {
            pid,
            duration,
            components,
            interval,
            json,
        } => {
            config.merge_with_args(components.as_deref(), interval);
            commands::watch::run(&config, pid, duration, json)
        }
        Commands::Debug => commands::debug::run(),
        Commands::Config { path, reset } => commands::config::run(path, reset),
    }
}
