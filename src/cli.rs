use std::path::PathBuf;

use clap::Parser;

use crate::config::{CONFIG_ENV, DEFAULT_ENV};

#[derive(Parser, Debug)]
#[command(name = "deploy-node-app")]
#[command(version)]
#[command(about = "Prepare a Node.js application for deployment to Kubernetes")]
pub struct Cli {
    /// Environment you are deploying to (default answer of the first question)
    #[arg(value_name = "ENV", default_value = DEFAULT_ENV)]
    pub env: String,
    /// Print the answers as compact JSON instead of pretty JSON
    #[arg(long = "json")]
    pub json: bool,
    /// Do not wait for the browser registration to finish
    #[arg(long = "detach")]
    pub detach: bool,
    /// Wizard config file (defaults to ~/.config/deploy-node-app/config.toml)
    #[arg(long = "config", env = CONFIG_ENV)]
    pub config: Option<PathBuf>,
    /// Debug logging unless RUST_LOG is set
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
