use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fleetwatch", version, about = "Build agent fleet metrics exporter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the metrics endpoint
    Serve(ServeArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// YAML configuration file
    #[arg(short, long, default_value = "fleetwatch.yaml")]
    pub config: String,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// YAML configuration file
    #[arg(short, long, default_value = "fleetwatch.yaml")]
    pub config: String,
}
