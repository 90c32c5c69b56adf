//! ---
//! grip_section: "05-cli"
//! grip_subsection: "binary"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Binary entrypoint for the R-GRIP control CLI."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use r_grip_backend::InProcessConnector;
use r_grip_common::{init_tracing, AppConfig, LogFormat, TransportMode};
use r_grip_harness::{
    CancellationToken, ConsoleTriggers, GripperProfile, LoopReport, SimulationHarness,
};
use tokio::signal;
use tracing::{info, warn};

mod models;

const DEFAULT_CONFIG_PATH: &str = "configs/gripper.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "R-GRIP gripper simulation harness",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", global = true, help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long = "asset-path",
        value_name = "DIR",
        global = true,
        help = "Override the directory model descriptors are resolved against"
    )]
    asset_path: Option<PathBuf>,

    #[arg(long, value_enum, global = true, help = "Override the preferred transport")]
    transport: Option<TransportArg>,

    #[arg(long, value_name = "HOST", global = true, help = "Simulation server host for udp/tcp")]
    host: Option<String>,

    #[arg(long = "log-format", value_enum, global = true, help = "Override console log format")]
    log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TransportArg {
    SharedMemory,
    Gui,
    Direct,
    Udp,
    Tcp,
}

impl From<TransportArg> for TransportMode {
    fn from(value: TransportArg) -> Self {
        match value {
            TransportArg::SharedMemory => TransportMode::SharedMemory,
            TransportArg::Gui => TransportMode::Gui,
            TransportArg::Direct => TransportMode::Direct,
            TransportArg::Udp => TransportMode::Udp,
            TransportArg::Tcp => TransportMode::Tcp,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Json,
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Json => LogFormat::StructuredJson,
            LogFormatArg::Pretty => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Set up the scene and run the interactive control loop")]
    Run,
    #[command(about = "Validate the configuration and print the effective settings")]
    CheckConfig {
        #[arg(long, help = "Print as JSON instead of TOML")]
        json: bool,
    },
    #[command(about = "List robot descriptors found under the asset path")]
    ListModels,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, source) = load_config(&cli)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            init_tracing("r-gripctl", &config.logging)?;
            match &source {
                Some(path) => info!(config_path = %path.display(), "configuration loaded"),
                None => warn!("no configuration file found, using built-in defaults"),
            }
            let report = run_harness(config).await?;
            println!(
                "control loop stopped ({}): {} rounds, {} commands issued, {} failed",
                report.termination,
                report.rounds,
                report.commands_issued,
                report.actuation_failures
            );
        }
        Commands::CheckConfig { json } => {
            r_grip_logging::init();
            if let Some(path) = &source {
                eprintln!("# source: {}", path.display());
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print!("{}", config.to_toml_string()?);
            }
        }
        Commands::ListModels => {
            r_grip_logging::init();
            models::list(&config)?;
        }
    }
    Ok(())
}

/// Load the configuration file, if any, and apply command line overrides.
///
/// An explicit `--config` must exist. Otherwise `R_GRIP_CONFIG` and then the
/// default path are tried, with built-in defaults when neither is present.
fn load_config(cli: &Cli) -> Result<(AppConfig, Option<PathBuf>)> {
    let (mut config, source) = match &cli.config {
        Some(path) => {
            if !path.is_file() {
                bail!("configuration file {} does not exist", path.display());
            }
            (AppConfig::from_path(path.clone())?, Some(path.clone()))
        }
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
            let from_env = std::env::var_os(AppConfig::ENV_CONFIG_PATH).is_some();
            if from_env || default_path.exists() {
                let loaded = AppConfig::load_with_source(&[default_path])?;
                (loaded.config, Some(loaded.source))
            } else {
                (AppConfig::default(), None)
            }
        }
    };

    if let Some(path) = &cli.asset_path {
        config.scene.asset_path = path.clone();
    }
    if let Some(transport) = cli.transport {
        config.backend.preferred_transport = transport.into();
    }
    if let Some(host) = &cli.host {
        config.backend.host = Some(host.clone());
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }
    config
        .validate()
        .context("configuration invalid after applying command line overrides")?;
    Ok((config, source))
}

async fn run_harness(config: AppConfig) -> Result<LoopReport> {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping control loop");
            interrupt.cancel();
        }
    });

    let report = tokio::task::spawn_blocking(move || -> Result<LoopReport> {
        let connector = InProcessConnector::from_config(&config);
        let mut harness = SimulationHarness::new(GripperProfile::from_config(&config.gripper));
        let mut triggers = ConsoleTriggers::stdin(&config.input);
        let report = harness.run(&connector, &config, &mut triggers, &cancel)?;
        Ok(report)
    })
    .await
    .context("control loop task failed")??;
    Ok(report)
}
