use anyhow::{Context, Result};
use clap::Parser;
use hv_core::SecretStore;
use tracing_subscriber::EnvFilter;

use hv_cli::commands::{add, login, logout, status, util};
use hv_cli::{Cli, Commands, Config, state_file};

/// Load config and open the configured secret store.
fn open(cli: &Cli) -> Result<(Config, Box<dyn SecretStore>)> {
    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let store = util::open_store(&config)?;
    Ok((config, store))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so stdout carries only command output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Some(Commands::Login(args)) => {
            login::check_org(args)?;
            let (config, store) = open(&cli)?;
            let state_path = state_file(cli.config.as_deref())?;
            let password = login::read_password(args)?;
            login::run(
                &mut stdout,
                &config,
                store.as_ref(),
                &state_path,
                args,
                &password,
            )?;
        }
        Some(Commands::Add(args)) => {
            let (config, store) = open(&cli)?;
            let today = chrono::Local::now().date_naive();
            add::run(&mut stdout, &config, store.as_ref(), args, today)?;
        }
        Some(Commands::Logout) => {
            let (config, store) = open(&cli)?;
            let state_path = state_file(cli.config.as_deref())?;
            logout::run(&mut stdout, &config, store.as_ref(), &state_path)?;
        }
        Some(Commands::Status) => {
            let (config, store) = open(&cli)?;
            status::run(&mut stdout, &config, store.as_ref())?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
