//! cuve — live dashboard and control CLI for an ultrasonic tank level sensor.
//!
//! Run with:  `RUST_LOG=info cuve watch`

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cuve")]
#[command(about = "Live dashboard and control CLI for an ultrasonic tank level sensor", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to cuve.toml (default: $XDG_CONFIG_HOME/cuve/cuve.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Device base URL, overrides `device.base_url`
    #[arg(long, global = true)]
    device: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Live chart of the sensor readings (Ctrl-C to quit)
    Watch,
    /// Show the calibration table
    Calibs,
    /// Manage calibration points
    #[command(subcommand)]
    Calib(CalibCommand),
    /// Manage tank levels
    #[command(subcommand)]
    Tank(TankCommand),
    /// MQTT actions
    #[command(subcommand)]
    Mqtt(MqttCommand),
    /// Read or change the device configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum CalibCommand {
    /// Bind the current measurement to a water height
    Save {
        /// Calibration slot (0-based)
        id: u32,
        /// Water height in cm for this slot
        height: f64,
    },
    /// Forget every calibration point
    Clear,
}

#[derive(Subcommand)]
enum TankCommand {
    /// Store the sensor distances for an empty and a full tank
    Set {
        /// Distance (cm) when the tank is empty
        #[arg(long)]
        vide: f64,
        /// Distance (cm) when the tank is full
        #[arg(long)]
        pleine: f64,
    },
}

#[derive(Subcommand)]
enum MqttCommand {
    /// Publish the current measurement now
    Send,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the device configuration
    Show {
        /// Print raw JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
    /// Change settings, e.g. `cuve config set mqtt_port=1884 mqtt_enabled=true`
    Set {
        /// `key=value` pairs
        #[arg(required = true)]
        assignments: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with the chart on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(cuve_config::default_path);
    let config = cuve_config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let dashboard = cuve_dashboard::Dashboard::new(config, Some(config_path), cli.device)
        .context("creating device client")?;
    tracing::debug!(
        "cuve v{} talking to {}",
        env!("CARGO_PKG_VERSION"),
        dashboard.client().base_url()
    );

    match cli.command {
        Command::Watch => dashboard.run_terminal().await.context("dashboard stopped")?,
        Command::Calibs => commands::show_calibrations(dashboard.client()).await?,
        Command::Calib(CalibCommand::Save { id, height }) => {
            commands::save_calibration(dashboard.client(), id, height).await?;
        }
        Command::Calib(CalibCommand::Clear) => commands::clear_calibrations(dashboard.client()).await?,
        Command::Tank(TankCommand::Set { vide, pleine }) => {
            commands::set_tank_levels(dashboard.client(), vide, pleine).await?;
        }
        Command::Mqtt(MqttCommand::Send) => commands::send_mqtt(dashboard.client()).await?,
        Command::Config(ConfigCommand::Show { json }) => {
            commands::show_settings(dashboard.client(), json).await?;
        }
        Command::Config(ConfigCommand::Set { assignments }) => {
            commands::update_settings(dashboard.client(), &assignments).await?;
        }
    }

    Ok(())
}
