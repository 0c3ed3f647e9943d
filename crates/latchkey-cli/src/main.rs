//! `latchkey`: door latch daemon and tools.
//!
//! ```bash
//! # Drive the latch on /dev/ttyACM0 and serve the HTTP gateway
//! latchkey serve --port /dev/ttyACM0 --hashfile /etc/latchkey/hashes.json
//!
//! # Pretend to be the latch on the other end of a serial line
//! latchkey simulate --port /dev/pts/4
//!
//! # Issue a token
//! latchkey gentoken alice@example.org --append /etc/latchkey/hashes.json
//! ```
//!
//! Log verbosity follows `RUST_LOG` and defaults to `info`.

mod args;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => commands::serve(args).await,
        Commands::Simulate(args) => commands::simulate(args).await,
        Commands::Gentoken(args) => commands::gentoken(args),
        Commands::Ports => commands::ports(),
    }
}
