#![doc = include_str!("../README.md")]

mod commands;
mod config;
mod store;
mod telemetry;

use clap::Parser;
use config::{CliArgs, Command, CtlConfig};
use serde::Serialize;
use telemetry::init_telemetry;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = CtlConfig::try_from(args)?;

    init_telemetry()?;
    tracing::debug!("running with config: {:#?}", config);

    let mut snapshot = store::load(&config.snapshot)?;

    match &config.command {
        Command::Allocate { class, volume } => {
            let allocated = commands::allocate(&mut snapshot, class, volume)?;
            store::save(&config.snapshot, &snapshot)?;
            print(&config, &allocated)
        }
        Command::Release { volume } => {
            let released = commands::release(&mut snapshot, volume)?;
            store::save(&config.snapshot, &snapshot)?;
            print(&config, &released)
        }
        Command::Scan { class } => {
            let scanned = commands::scan(&snapshot, class)?;
            print(&config, &scanned)
        }
    }
}

fn print<T: Serialize>(config: &CtlConfig, value: &T) -> anyhow::Result<()> {
    let out = if config.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}
