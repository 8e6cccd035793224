//! RAZE CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! raze-cli migrate storefront
//!
//! # Run all database migrations
//! raze-cli migrate all
//!
//! # Create admin user (password read from ADMIN_PASSWORD)
//! ADMIN_PASSWORD=... raze-cli admin create -e coach@razetraining.com -n "Coach" -r super_admin
//!
//! # Seed the launch catalog, stock and promo codes
//! raze-cli seed all
//!
//! # Send due abandoned-cart reminders
//! raze-cli carts process
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "raze-cli")]
#[command(author, version, about = "RAZE CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed the storefront database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Abandoned cart reminders
    Carts {
        #[command(subcommand)]
        action: CartsAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run storefront database migrations
    Storefront,
    /// Run admin database migrations
    Admin,
    /// Run all database migrations
    All,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Admin role (`super_admin`, `admin`, `viewer`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Starting stock for every variant
    Inventory,
    /// Launch promo codes
    Promos,
    /// Launch catalog
    Products,
    /// Products, inventory and promo codes
    All,
}

#[derive(Subcommand)]
enum CartsAction {
    /// Send every reminder that is due now
    Process,
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
        Commands::Migrate { target } => match target {
            MigrateTarget::Storefront => commands::migrate::storefront().await?,
            MigrateTarget::Admin => commands::migrate::admin().await?,
            MigrateTarget::All => {
                commands::migrate::storefront().await?;
                commands::migrate::admin().await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Create { email, name, role } => {
                commands::admin::create_user(&email, &name, &role).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Inventory => commands::seed::inventory().await?,
            SeedTarget::Promos => commands::seed::promos().await?,
            SeedTarget::Products => commands::seed::products().await?,
            SeedTarget::All => {
                commands::seed::products().await?;
                commands::seed::inventory().await?;
                commands::seed::promos().await?;
            }
        },
        Commands::Carts { action } => match action {
            CartsAction::Process => commands::carts::process().await?,
        },
    }
    Ok(())
}
