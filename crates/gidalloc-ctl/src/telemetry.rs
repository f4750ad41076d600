//! Log output for the command line tool.
//!
//! Events from `gidalloc` (recovery warnings, table publication) go to
//! stderr so that stdout only carries the JSON result. The level defaults to
//! `info` and follows `RUST_LOG` when set, e.g.
//!
//! ```bash
//! RUST_LOG=gidalloc=debug gidalloc-ctl --snapshot volumes.json scan --class efs
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_line_number(true)
                .with_file(true),
        )
        .try_init()?;
    Ok(())
}
