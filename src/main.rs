use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use deploy_node_app::cli::Cli;
use deploy_node_app::config;
use deploy_node_app::questions::TerminalPrompter;
use deploy_node_app::wizard::{self, PairingWait, Wizard};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!(">> failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!(">> {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref())?;
    let project_root = std::env::current_dir().context("failed to resolve working directory")?;

    let outcome = Wizard::system(config, project_root)
        .run(&cli.env, &mut TerminalPrompter)
        .await?;

    let rendered = if cli.json {
        serde_json::to_string(&outcome.answers)?
    } else {
        serde_json::to_string_pretty(&outcome.answers)?
    };
    println!("{rendered}");

    if let Some(handle) = &outcome.pairing {
        eprintln!(
            "Finish registering in your browser: {}",
            handle.registration_url()
        );
        if !cli.detach {
            eprintln!("Press Ctrl-C once registration is complete.");
        }
    }

    let wait = if cli.detach {
        PairingWait::Detach
    } else {
        PairingWait::UntilInterrupted
    };
    wizard::wind_down(outcome.pairing, wait, tokio::signal::ctrl_c()).await;
    Ok(())
}
