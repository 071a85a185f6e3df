use clap::Parser;
use tracing_subscriber::EnvFilter;

use fleetwatch::cli;
use fleetwatch::config;
use fleetwatch::errors::ExporterError;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .init();

    let result = match cli.command {
        cli::Commands::Serve(args) => cli::serve::handle_serve(args).await,
        cli::Commands::Validate(args) => handle_validate(args).await,
    };

    match result {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            let exit_code = match &e {
                ExporterError::Config(_) => 2,
                ExporterError::Authentication(_) => 4,
                _ => 1,
            };
            std::process::exit(exit_code);
        }
    }
}

async fn handle_validate(args: cli::commands::ValidateArgs) -> Result<(), ExporterError> {
    let path = std::path::PathBuf::from(&args.config);
    let _config = config::load_config(&path).await?;
    println!("Configuration is valid: {}", args.config);
    Ok(())
}
