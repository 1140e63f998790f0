//! # badge CLI entry point
//!
//! Parses command-line arguments, installs logging, and dispatches to the
//! subcommand handlers in the library crate.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use badge_cli::config::CliConfig;
use badge_cli::inspect::{run_inspect, InspectArgs};
use badge_cli::keygen::{run_keygen, KeygenArgs};
use badge_cli::sign::{run_sign, SignArgs};
use badge_cli::status::{run_status, StatusArgs};
use badge_cli::verify::{run_verify, VerifyArgs};

/// Badge credential tooling.
///
/// Generates signing keys, attaches proofs to badge assertions, verifies
/// them, and decodes published status lists.
#[derive(Parser, Debug)]
#[command(name = "badge", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Key directory. Overrides BADGE_KEYS_DIR.
    #[arg(long, global = true)]
    keys_dir: Option<PathBuf>,

    /// Base URL for key and status list IRIs. Overrides BADGE_BASE_URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a key pair.
    Keygen(KeygenArgs),

    /// Attach a proof to a credential.
    Sign(SignArgs),

    /// Verify a credential. Exit code 2 when invalid.
    Verify(VerifyArgs),

    /// Print the unverified credential inside a JWT.
    #[command(name = "inspect-jwt")]
    InspectJwt(InspectArgs),

    /// Status list utilities.
    Status(StatusArgs),
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);
    tracing::debug!("badge CLI v{} starting", env!("CARGO_PKG_VERSION"));

    let result = match &cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::InspectJwt(args) => run_inspect(args),
        Commands::Status(args) => run_status(args),
        Commands::Sign(args) => CliConfig::load(cli.keys_dir.as_deref(), cli.base_url.as_deref())
            .and_then(|config| run_sign(args, &config)),
        Commands::Verify(args) => CliConfig::load(cli.keys_dir.as_deref(), cli.base_url.as_deref())
            .and_then(|config| run_verify(args, &config)),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
