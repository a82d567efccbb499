//! Atelier CLI: database migrations, seeding and staff accounts.
//!
//! # Usage
//!
//! ```bash
//! # Apply every pending migration
//! atelier-cli migrate
//!
//! # Load products, lookbook entries and quotes from YAML
//! atelier-cli seed seed/sample.yaml
//!
//! # Create a staff account (password from the environment)
//! ATELIER_ADMIN_PASSWORD=... atelier-cli admin create -e ops@example.com -n "Ops" -r admin
//!
//! # List staff accounts
//! atelier-cli admin list
//! ```
//!
//! Every command reads `DATABASE_URL` (or `--database-url`); a `.env` file is
//! loaded if present.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use atelier_core::AdminRole;
use clap::{Parser, Subcommand};
use secrecy::SecretString;

mod commands;

#[derive(Parser)]
#[command(name = "atelier-cli")]
#[command(author, version, about = "Atelier CLI tools")]
struct Cli {
    /// `PostgreSQL` connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed products, lookbook entries and quotes from a YAML file
    Seed {
        /// Path to the seed file
        file: PathBuf,

        /// Validate the file without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Manage staff accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new staff account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`admin` or `viewer`)
        #[arg(short, long, default_value = "admin")]
        role: AdminRole,

        /// Password (prefer the environment variable over the command line)
        #[arg(long, env = "ATELIER_ADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// List staff accounts
    List,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "atelier_cli=info,atelier_admin=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = cli
        .database_url
        .map(SecretString::from)
        .ok_or("DATABASE_URL is not set (use --database-url or the environment)")?;

    match cli.command {
        Commands::Migrate => commands::migrate::run(&database_url).await?,
        Commands::Seed { file, dry_run } => {
            commands::seed::run(&database_url, &file, dry_run).await?;
        }
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                role,
                password,
            } => {
                let password = password
                    .map(SecretString::from)
                    .ok_or(commands::admin::AdminError::MissingPassword)?;
                commands::admin::create_user(&database_url, &email, &name, role, &password)
                    .await?;
            }
            AdminAction::List => commands::admin::list_users(&database_url).await?,
        },
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
    fn test_parse_admin_create() {
        let cli = Cli::try_parse_from([
            "atelier-cli",
            "--database-url",
            "postgres://localhost/atelier",
            "admin",
            "create",
            "-e",
            "ops@example.com",
            "-n",
            "Ops",
            "-r",
            "viewer",
            "--password",
            "a long enough password",
        ]);
        let Ok(Cli {
            command:
                Commands::Admin {
                    action: AdminAction::Create { role, .. },
                },
            ..
        }) = cli
        else {
            panic!("expected admin create");
        };
        assert_eq!(role, AdminRole::Viewer);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let cli = Cli::try_parse_from([
            "atelier-cli", "admin", "create", "-e", "a@b.co", "-n", "A", "-r", "owner",
        ]);
        assert!(cli.is_err());
    }
}
