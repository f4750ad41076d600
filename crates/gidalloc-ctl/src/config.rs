use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};

/// Runtime configuration for the `gidalloc-ctl` binary.
///
/// Global settings are parsed from CLI arguments or environment variables
/// (a `.env` file in the working directory is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "gidalloc-ctl",
    version,
    about = "Allocate and release volume gids against a JSON volume snapshot"
)]
pub struct CliArgs {
    /// Path to the JSON snapshot holding storage classes and volumes.
    ///
    /// The file is read at startup and, for commands that change it,
    /// rewritten in place.
    ///
    /// Environment variable: `GIDALLOC_SNAPSHOT`
    #[arg(long, env = "GIDALLOC_SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Pretty-print JSON output.
    ///
    /// Environment variable: `GIDALLOC_PRETTY`
    #[arg(long, env = "GIDALLOC_PRETTY", default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Allocate the next gid for a new volume and record the volume.
    Allocate {
        /// Storage class the volume is provisioned from.
        #[arg(long)]
        class: String,
        /// Name of the new volume.
        #[arg(long)]
        volume: String,
    },
    /// Release a volume's gid and remove the volume.
    Release {
        /// Name of the volume being deleted.
        #[arg(long)]
        volume: String,
    },
    /// Rebuild a class's gid table from the snapshot and report on it.
    Scan {
        /// Storage class to scan.
        #[arg(long)]
        class: String,
    },
}

#[derive(Debug, Clone)]
pub struct CtlConfig {
    pub snapshot: PathBuf,
    pub pretty: bool,
    pub command: Command,
}

impl TryFrom<CliArgs> for CtlConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if !args.snapshot.is_file() {
            bail!("GIDALLOC_SNAPSHOT ({}) is not a file", args.snapshot.display());
        }
        let snapshot = args
            .snapshot
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", args.snapshot.display()))?;

        match &args.command {
            Command::Allocate { class, volume } if class.is_empty() || volume.is_empty() => {
                bail!("--class and --volume must not be empty");
            }
            Command::Release { volume } if volume.is_empty() => {
                bail!("--volume must not be empty");
            }
            Command::Scan { class } if class.is_empty() => {
                bail!("--class must not be empty");
            }
            _ => {}
        }

        Ok(Self {
            snapshot,
            pretty: args.pretty,
            command: args.command,
        })
    }
}
