//! NetSound Fetcher CLI application
//!
//! Command-line interface for curating audio download lists from a public
//! media catalog.

use std::process;

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use netsound_fetcher::cli::{handle_config, handle_search, Cli, Commands, ConfigAction};
use netsound_fetcher::config::AppConfig;
use netsound_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!("{} error: {}", e.category(), e);
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    // `config init` must work even when the existing file is broken
    let config = match &cli.command {
        Commands::Config(args) if matches!(args.action, ConfigAction::Init { .. }) => {
            AppConfig::default()
        }
        _ => AppConfig::load(cli.global.config.clone()).await?,
    };

    init_logging(&cli, &config);

    info!("NetSound Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Search(args) => {
            info!("Executing search command");
            handle_search(args, config, cli.global.quiet).await
        }
        Commands::Config(args) => {
            info!("Executing config command");
            handle_config(args, config, cli.global.config).await
        }
    }
}

/// Initialize logging based on CLI verbosity and the configured level
fn init_logging(cli: &Cli, config: &AppConfig) {
    let log_level = cli.log_level(&config.logging.level);

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("netsound_fetcher={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.debug)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.debug {
        info!("Debug logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
