//! adguard-daemon: keeps the target app's ads suppressed.
//!
//! ## Subcommands
//!
//! - `run` (default): supervise forever
//! - `resolve`: print where the target executable was found
//! - `locate`: print the running target's window handle
//! - `diagnose`: JSON report of every discovery source

mod logging;

use adguard_core::{
    load_config, AdguardConfig, CancellationToken, CommandLauncher, CommandProbe, ExecutablePath,
    PathResolver, ProcessLocator, Supervisor, SystemProcessTable, SystemRegistry,
    TracingPresenter,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "adguard-daemon")]
#[command(about = "Finds, launches and de-ads the target desktop app")]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config_dir>/adguard/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Supervise the target until killed
    Run,

    /// Resolve the target executable path once
    Resolve,

    /// Find the running target's main window once
    Locate {
        /// Executable to look for instead of resolving one
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Print a JSON report of discovery results
    Diagnose,
}

#[derive(Serialize)]
struct SourceReport {
    source: &'static str,
    path: Option<String>,
}

#[derive(Serialize)]
struct DiagnoseReport {
    version: &'static str,
    config_path: Option<String>,
    sources: Vec<SourceReport>,
    resolved: Option<String>,
    window: Option<String>,
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to load config");
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config),
        Commands::Resolve => match resolver(&config).resolve() {
            Some(path) => println!("{}", path),
            None => {
                eprintln!("Target installation not found");
                std::process::exit(1);
            }
        },
        Commands::Locate { path } => {
            let Some(path) = path
                .map(ExecutablePath::new)
                .or_else(|| resolver(&config).resolve())
            else {
                eprintln!("Target installation not found");
                std::process::exit(1);
            };
            match locator(&config).locate_window(&path) {
                Some(window) => println!("{}", window),
                None => {
                    eprintln!("No running process for {}", path);
                    std::process::exit(1);
                }
            }
        }
        Commands::Diagnose => diagnose(&config, cli.config),
    }
}

fn resolver(config: &AdguardConfig) -> PathResolver {
    PathResolver::standard(SystemRegistry, &config.target)
}

fn locator(config: &AdguardConfig) -> ProcessLocator<SystemProcessTable> {
    ProcessLocator::new(SystemProcessTable::new(), config.target.suffix.clone())
}

fn run(config: AdguardConfig) {
    let probe = match CommandProbe::from_config(&config.probe) {
        Ok(probe) => probe,
        Err(err) => {
            error!(error = %err, "Set [probe] program in the config file");
            std::process::exit(1);
        }
    };

    info!(
        protocol = %config.target.protocol,
        executable = %config.target.executable,
        step_interval_ms = config.timing.step_interval_ms,
        "adguard daemon started"
    );

    let supervisor = Supervisor::new(
        resolver(&config),
        locator(&config),
        Box::new(CommandLauncher),
        Box::new(probe),
        Box::new(TracingPresenter::new(config.presentation.detach_console)),
        config.timing.clone(),
    );

    let handle = match supervisor.spawn(CancellationToken::new()) {
        Ok(handle) => handle,
        Err(err) => {
            error!(error = %err, "Failed to start supervisor");
            std::process::exit(1);
        }
    };

    if handle.join().is_err() {
        error!("Supervisor thread panicked");
        std::process::exit(1);
    }
}

fn diagnose(config: &AdguardConfig, config_override: Option<PathBuf>) {
    let config_path = config_override
        .or_else(|| adguard_core::default_config_path().ok())
        .map(|path| path.display().to_string());

    let resolver = resolver(config);
    let sources = resolver
        .probe_sources()
        .into_iter()
        .map(|(source, path)| SourceReport {
            source,
            path: path.map(|path| path.to_string()),
        })
        .collect();
    let resolved = resolver.resolve();
    let window = resolved
        .as_ref()
        .and_then(|path| locator(config).locate_window(path))
        .map(|window| window.to_string());

    let report = DiagnoseReport {
        version: env!("CARGO_PKG_VERSION"),
        config_path,
        sources,
        resolved: resolved.map(|path| path.to_string()),
        window,
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(err) => {
            error!(error = %err, "Failed to serialize diagnose report");
            std::process::exit(1);
        }
    }
}
