//! Business Cart CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run checkout database migrations
//! bc-cli migrate
//!
//! # Issue an onboarding code document
//! bc-cli code create --company ACME-CO --customer ACME-CU
//!
//! # Create an admin account
//! BC_ADMIN_PASSWORD='...' bc-cli admin create -e ops@example.com -n "Ops"
//!
//! # Finish order cleanup left behind by failures
//! bc-cli reconcile --limit 100
//!
//! # Remove expired token rows
//! bc-cli tokens purge
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bc-cli")]
#[command(author, version, about = "Business Cart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage onboarding codes
    Code {
        #[command(subcommand)]
        action: CodeAction,
    },
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Retry cart/quote cleanup for placed orders
    Reconcile {
        /// Maximum number of orders to process
        #[arg(short, long, default_value_t = 100)]
        limit: u32,
    },
    /// Manage stored tokens
    Tokens {
        #[command(subcommand)]
        action: TokensAction,
    },
}

#[derive(Subcommand)]
enum CodeAction {
    /// Issue a new code document
    Create {
        /// Company code (single use)
        #[arg(long)]
        company: String,

        /// Customer code (reusable)
        #[arg(long)]
        customer: String,

        /// Partner code (single use)
        #[arg(long)]
        partner: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Admin password
        #[arg(long, env = "BC_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum TokensAction {
    /// Delete expired refresh tokens and blacklist entries
    Purge,
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
        Commands::Code { action } => match action {
            CodeAction::Create {
                company,
                customer,
                partner,
            } => {
                commands::codes::create(&company, &customer, partner.as_deref()).await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create(&email, &name, &password).await?;
            }
        },
        Commands::Reconcile { limit } => {
            commands::maintenance::reconcile(limit).await?;
        }
        Commands::Tokens { action } => match action {
            TokensAction::Purge => {
                commands::maintenance::purge_tokens().await?;
            }
        },
    }
    Ok(())
}
