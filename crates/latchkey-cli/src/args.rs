//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use latchkey_core::constants::DEFAULT_BAUD_RATE;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "latchkey")]
#[command(about = "Serial door latch daemon with an HTTP gateway", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Drive the latch and serve the HTTP gateway
    Serve(ServeArgs),

    /// Emulate the latch firmware on a serial port
    Simulate(SimulateArgs),

    /// Generate a token and its hash file record
    Gentoken(GentokenArgs),

    /// List serial ports
    Ports,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Serial device of the latch
    #[arg(long, env = "LATCHKEY_PORT")]
    pub port: String,

    /// Serial speed
    #[arg(long, env = "LATCHKEY_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,

    /// Token hash file (JSON)
    #[arg(long, env = "LATCHKEY_HASHFILE", default_value = "./hashes.json")]
    pub hashfile: PathBuf,

    /// HTTP listen address
    #[arg(long, env = "LATCHKEY_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Fail a command when the device stays silent this long
    #[arg(long, env = "LATCHKEY_RESPONSE_TIMEOUT_MS")]
    pub response_timeout_ms: Option<u64>,

    /// Fail the outstanding command when the link drops
    #[arg(long, env = "LATCHKEY_ABANDON_ON_DISCONNECT")]
    pub abandon_on_disconnect: bool,

    /// Firmware without the reference run command
    #[arg(long, env = "LATCHKEY_NO_REFERENCE_RUN")]
    pub no_reference_run: bool,
}

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Serial device to answer on
    #[arg(long, env = "LATCHKEY_PORT")]
    pub port: String,

    /// Serial speed
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,

    /// Divide every motor delay by this factor
    #[arg(long, default_value_t = 1)]
    pub speedup: u32,
}

#[derive(Debug, Args)]
pub struct GentokenArgs {
    /// Owner of the token, typically a mail address
    pub identity: String,

    /// Salt of the target hash file
    #[arg(long, required_unless_present = "append")]
    pub salt: Option<String>,

    /// Add the record to this hash file, using its salt
    #[arg(long, conflicts_with = "salt")]
    pub append: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["latchkey", "serve", "--port", "/dev/ttyACM0"]).unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };

        assert_eq!(args.port, "/dev/ttyACM0");
        assert_eq!(args.baud, 9600);
        assert_eq!(args.bind.to_string(), "0.0.0.0:8080");
        assert_eq!(args.response_timeout_ms, None);
        assert!(!args.abandon_on_disconnect);
        assert!(!args.no_reference_run);
    }

    #[test]
    fn test_serve_options() {
        let cli = Cli::try_parse_from([
            "latchkey",
            "serve",
            "--port",
            "/dev/ttyUSB1",
            "--baud",
            "19200",
            "--response-timeout-ms",
            "8000",
            "--abandon-on-disconnect",
            "--no-reference-run",
        ])
        .unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };

        assert_eq!(args.baud, 19200);
        assert_eq!(args.response_timeout_ms, Some(8000));
        assert!(args.abandon_on_disconnect);
        assert!(args.no_reference_run);
    }

    #[rstest]
    #[case(&["latchkey", "gentoken", "alice", "--salt", "s"], true)]
    #[case(&["latchkey", "gentoken", "alice", "--append", "hashes.json"], true)]
    #[case(&["latchkey", "gentoken", "alice"], false)]
    #[case(&["latchkey", "gentoken", "alice", "--salt", "s", "--append", "h.json"], false)]
    fn test_gentoken_salt_source(#[case] argv: &[&str], #[case] valid: bool) {
        assert_eq!(Cli::try_parse_from(argv).is_ok(), valid);
    }
}
