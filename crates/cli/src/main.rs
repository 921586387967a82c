//! AYTS CLI - Database migrations and backend checks.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations (visitor state + sessions)
//! ayts-cli migrate
//!
//! # Check whether the marketplace backend is up or in maintenance
//! ayts-cli status
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `status` - Report marketplace backend availability

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ayts-cli")]
#[command(author, version, about = "AYTS storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Check the marketplace backend
    Status,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Status => {
            if !commands::status::check().await? {
                return Err("marketplace backend is in maintenance".into());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_subcommands() {
        assert!(matches!(
            Cli::try_parse_from(["ayts-cli", "migrate"]).map(|cli| cli.command),
            Ok(Commands::Migrate)
        ));
        assert!(matches!(
            Cli::try_parse_from(["ayts-cli", "status"]).map(|cli| cli.command),
            Ok(Commands::Status)
        ));
        assert!(Cli::try_parse_from(["ayts-cli", "seed"]).is_err());
    }
}
