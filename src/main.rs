//! D365 Web API samples
//!
//! Entry point: one subcommand per sample flow. Report lines go to stdout,
//! logs to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use d365_webapi_samples::checker::AuthenticationChecker;
use d365_webapi_samples::config::Config;
use d365_webapi_samples::flows::{self, NewAccount};
use d365_webapi_samples::odata::ODataClient;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "d365-webapi-samples")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML config file (defaults to ./d365.toml when present)
    #[arg(long, short = 'c', value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Retrieve account records and print their names
    List,

    /// Create a new account record
    Create {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Retrieve accounts, then check token expiry and refresh it
    TokenManagement,

    /// Validate the configured credentials with WhoAmI()
    Check {
        /// Also GET the service root
        #[arg(long)]
        connectivity: bool,

        /// Also read one contact through FetchXML
        #[arg(long)]
        permissions: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    }
    .context("Failed to load configuration")?;
    let runtime_config = config.to_runtime()?;

    if runtime_config.uses_placeholders() {
        tracing::warn!(
            "Placeholder credentials in use; set them in d365.toml or D365_* variables"
        );
    }

    tracing::info!(
        "Configured for {} (api {})",
        runtime_config.credentials.resource_url,
        runtime_config.api_version
    );

    let mut stdout = io::stdout();

    match cli.command {
        Command::List => {
            let client = ODataClient::from_config(&runtime_config)?;
            flows::list_accounts(&client, &mut stdout).await?;
        }
        Command::Create { name, description } => {
            let client = ODataClient::from_config(&runtime_config)?;
            let defaults = NewAccount::default();
            let account = NewAccount {
                name: name.unwrap_or(defaults.name),
                description: description.unwrap_or(defaults.description),
            };
            flows::create_account(&client, &account, &mut stdout).await?;
        }
        Command::TokenManagement => {
            let client = ODataClient::from_config(&runtime_config)?;
            flows::list_accounts_with_refresh_check(&client, &mut stdout).await?;
        }
        Command::Check {
            connectivity,
            permissions,
        } => {
            let checker = AuthenticationChecker::from_config(&runtime_config)?;

            let is_valid = checker.validate_credentials(&mut stdout).await?;
            println!("Credentials are valid: {}", is_valid);

            if connectivity {
                let reachable = checker.test_connectivity(&mut stdout).await?;
                println!("Service root reachable: {}", reachable);
            }
            if permissions {
                checker
                    .check_permissions("contacts", "contact", &mut stdout)
                    .await?;
            }
        }
    }

    Ok(())
}
