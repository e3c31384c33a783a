//! Main entry point for the sponsored bundle service.
//!
//! Moves assets out of an executor account that holds no ETH by submitting
//! one atomic bundle to a block-builder relay: a sponsor account funds the
//! executor's gas in the first transaction and the executor's transfers
//! follow. The bundle is resubmitted on every new block until it lands.
//!
//! Exits 0 once the bundle is included and 1 on any failure.

use bundle_config::Config;
use bundle_core::SubmissionOutcome;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

mod factory_registry;

use factory_registry::build_engine_from_config;

/// Command-line arguments for the sponsor service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "SPONSOR_CONFIG", default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, env = "SPONSOR_LOG_LEVEL", default_value = "info")]
	log_level: String,
}

/// Main entry point for the sponsor service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the sponsor engine with all implementations
/// 5. Prepares the bundle and submits it until a terminal outcome
#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	match run(args).await {
		Ok(outcome) => ExitCode::from(exit_code(&outcome)),
		Err(e) => {
			tracing::error!(error = %e, "Sponsor run failed");
			ExitCode::FAILURE
		},
	}
}

async fn run(args: Args) -> Result<SubmissionOutcome, Box<dyn std::error::Error>> {
	tracing::info!("Started sponsor");

	let config = Config::from_file(&args.config).await?;
	tracing::info!(
		engine = %config.engine.kind,
		relay = %config.network.relay,
		recipient = %config.recipient,
		"Loaded configuration [{}]",
		args.config.display()
	);

	let engine = build_engine_from_config(config).await?;
	let outcome = engine.run().await?;

	tracing::info!(?outcome, "Stopped sponsor");
	Ok(outcome)
}

/// Maps a terminal outcome to the process exit status.
fn exit_code(outcome: &SubmissionOutcome) -> u8 {
	if outcome.is_success() {
		0
	} else {
		1
	}
}
