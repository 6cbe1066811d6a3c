use argus::cli::commands::{CliArgs, Commands};
use argus::cli::handlers::{handle_init, handle_scan, handle_sync, handle_version, OutputMode};
use argus::util::logging::{init_logging, resolve_level, LoggingConfig, LOG_JSON_ENV};
use argus::VERSION;

use clap::Parser;
use std::env;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("argus v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let mode = OutputMode {
        verbose: args.verbose,
        quiet: args.quiet,
    };

    let exit_code = match &args.command {
        Commands::Init(init_args) => handle_init(init_args, mode),
        Commands::Scan(scan_args) => handle_scan(scan_args, mode).await,
        Commands::Sync(sync_args) => handle_sync(sync_args, mode).await,
        Commands::Version => handle_version(),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = resolve_level(args.log_level.as_deref(), args.verbose, args.quiet);
    let use_json = env::var(LOG_JSON_ENV)
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        use_json,
        ..LoggingConfig::with_level(level)
    });
}
