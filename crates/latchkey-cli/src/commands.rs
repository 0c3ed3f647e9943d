//! Subcommand implementations.

use anyhow::{Context, Result, bail};
use latchkey_auth::{HashFile, TokenAuthenticator, TokenRecord, generate_token};
use latchkey_core::constants::RECONNECT_DELAY;
use latchkey_driver::{Connector, Driver, DriverConfig, SerialConnector, available_ports};
use latchkey_emulator::{LockMechanism, LockTimings};
use latchkey_gateway::{GatewayConfig, GatewayState};
use latchkey_protocol::{Command, CommandSet};
use std::sync::Arc;
use std::time::Duration;

use crate::args::{GentokenArgs, ServeArgs, SimulateArgs};

pub async fn serve(args: ServeArgs) -> Result<()> {
    tracing::info!(version = latchkey_core::VERSION, port = %args.port, "latchkey starting");

    let auth = TokenAuthenticator::open(&args.hashfile)
        .with_context(|| format!("cannot load {}", args.hashfile.display()))?;

    let connector = SerialConnector::new(&args.port).with_baud_rate(args.baud);
    let driver = Arc::new(Driver::start(connector, driver_config(&args)));

    let gateway = GatewayConfig::default().with_bind_addr(args.bind);
    let state = GatewayState::new(Arc::clone(&driver), Arc::new(auth));
    let result = latchkey_gateway::serve(&gateway, state, shutdown_signal()).await;

    driver.shutdown().await;
    Ok(result?)
}

fn driver_config(args: &ServeArgs) -> DriverConfig {
    let mut config = DriverConfig::default().with_abandon_on_disconnect(args.abandon_on_disconnect);
    if let Some(ms) = args.response_timeout_ms {
        config = config.with_response_timeout(Duration::from_millis(ms));
    }
    if args.no_reference_run {
        config = config.with_commands(CommandSet::all().without(Command::Reference));
    }
    config
}

pub async fn simulate(args: SimulateArgs) -> Result<()> {
    let connector = SerialConnector::new(&args.port).with_baud_rate(args.baud);
    let mut mechanism = LockMechanism::new(LockTimings::default().scaled_down(args.speedup));

    let run = async {
        loop {
            match connector.connect().await {
                Ok(link) => {
                    tracing::info!(endpoint = %connector.endpoint(), "emulating latch");
                    if let Err(e) = latchkey_emulator::serve(link, &mut mechanism).await {
                        tracing::warn!(error = %e, "link lost");
                    }
                }
                Err(e) => tracing::warn!(endpoint = %connector.endpoint(), error = %e, "cannot open port"),
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    };

    tokio::select! {
        _ = run => {}
        () = shutdown_signal() => {}
    }
    Ok(())
}

pub fn gentoken(args: GentokenArgs) -> Result<()> {
    let token = generate_token();

    let record = match (&args.append, &args.salt) {
        (Some(path), _) => {
            let mut file = HashFile::read(path)?;
            let record = TokenRecord::issue(&args.identity, &token, &file.salt);
            file.tokens.push(record.clone());
            file.write(path)?;
            tracing::info!(identity = %args.identity, path = %path.display(), "record appended");
            record
        }
        (None, Some(salt)) => TokenRecord::issue(&args.identity, &token, salt),
        (None, None) => bail!("either --salt or --append is required"),
    };

    println!("token: {token}");
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

pub fn ports() -> Result<()> {
    let ports = available_ports().context("cannot enumerate serial ports")?;
    if ports.is_empty() {
        println!("no serial ports found");
    }
    for port in ports {
        println!("{}\t{}", port.name, port.kind);
    }
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutting down"),
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    }
}
