//! Shopfront CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! sf-cli migrate
//!
//! # Create a staff account
//! sf-cli user create -e admin@example.com --staff
//!
//! # Grant superuser to an existing account
//! sf-cli user promote -e admin@example.com --superuser
//!
//! # Load demo categories, products and coupons
//! sf-cli seed -f crates/cli/seed/catalog.yaml
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` / `user promote` - Manage accounts and roles
//! - `seed` - Seed the catalog from a YAML file

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(author, version, about = "Shopfront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed categories, products and coupons from a YAML file
    Seed {
        /// Path to the seed file
        #[arg(short, long, default_value = "crates/cli/seed/catalog.yaml")]
        file: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (read from `SHOPFRONT_USER_PASSWORD` when omitted)
        #[arg(short, long)]
        password: Option<String>,

        /// Grant access to the admin API
        #[arg(long)]
        staff: bool,

        /// Grant superuser privileges
        #[arg(long)]
        superuser: bool,
    },
    /// Set the roles of an existing account
    Promote {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Grant superuser privileges (implies staff)
        #[arg(long)]
        superuser: bool,

        /// Remove staff and superuser privileges instead
        #[arg(long, conflicts_with = "superuser")]
        revoke: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                password,
                staff,
                superuser,
            } => {
                commands::user::create(&email, password, staff, superuser).await?;
            }
            UserAction::Promote {
                email,
                superuser,
                revoke,
            } => {
                let (is_staff, is_superuser) = if revoke {
                    (false, false)
                } else {
                    (true, superuser)
                };
                commands::user::set_roles(&email, is_staff, is_superuser).await?;
            }
        },
        Commands::Seed { file } => commands::seed::catalog(&file).await?,
    }
    Ok(())
}
