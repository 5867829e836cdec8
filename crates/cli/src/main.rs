//! Atelier CLI - Cart, favorites and profile management.
//!
//! Drives the storefront store against the file-backed document store, as
//! the given user.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart of user u1
//! atelier --user u1 --email ana@example.com cart show
//!
//! # Add two units of a product in size M
//! atelier --user u1 --email ana@example.com cart add robe-01 --name "Silk Robe" --price 120 -q 2 --variant M
//!
//! # Toggle a favorite
//! atelier --user u1 --email ana@example.com favorites toggle scarf-02 --name "Scarf" --price 35
//! ```
//!
//! `ATELIER_USER` and `ATELIER_EMAIL` may be used instead of the flags.
//! Without a user, every mutation fails with a sign-in prompt.
//!
//! # Commands
//!
//! - `cart` - Show, add, remove, update and clear cart lines
//! - `favorites` - List, toggle, remove and move favorites to the cart
//! - `profile` - Show or update the stored user profile

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atelier_core::{Email, UserId};
use atelier_storefront::config::{ConfigError, StoreConfig};
use atelier_storefront::documents::FileDocumentStore;
use atelier_storefront::identity::LocalIdentityProvider;
use atelier_storefront::models::{Identity, ProductSnapshot};
use atelier_storefront::notify::StoreObserver;
use atelier_storefront::state::AppState;

mod commands;

#[derive(Parser)]
#[command(name = "atelier")]
#[command(author, version, about = "Atelier cart and favorites tools")]
struct Cli {
    /// User id to act as
    #[arg(long, env = "ATELIER_USER", global = true)]
    user: Option<String>,

    /// Email of the user to act as
    #[arg(long, env = "ATELIER_EMAIL", global = true)]
    email: Option<String>,

    /// Document store directory (overrides `ATELIER_DATA_DIR`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Show or edit the user profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart lines and total
    Show,
    /// Add a product to the cart
    Add {
        #[command(flatten)]
        product: ProductArgs,

        /// Number of units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Size or other variant selection
        #[arg(short, long)]
        variant: Option<String>,
    },
    /// Remove a cart line
    Remove {
        /// Product id
        id: String,

        /// Variant of the line to remove
        #[arg(short, long)]
        variant: Option<String>,
    },
    /// Set the quantity of a cart line (0 or less removes it)
    Update {
        /// Product id
        id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,

        /// Variant of the line to update
        #[arg(short, long)]
        variant: Option<String>,
    },
    /// Remove every cart line
    Clear,
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// Print the favorites
    List,
    /// Add the product to favorites, or remove it if already there
    Toggle {
        #[command(flatten)]
        product: ProductArgs,
    },
    /// Remove a favorite
    Remove {
        /// Product id
        id: String,
    },
    /// Add one unit of a favorite to the cart
    MoveToCart {
        /// Product id
        id: String,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the stored profile
    Show,
    /// Update profile fields
    Update {
        /// New display name
        #[arg(short, long)]
        name: Option<String>,

        /// Theme preference
        #[arg(short, long)]
        theme: Option<String>,
    },
}

/// Product fields as shown in the catalog.
#[derive(Args)]
struct ProductArgs {
    /// Product id
    id: String,

    /// Product name
    #[arg(short, long)]
    name: String,

    /// Unit price, e.g. 19.99
    #[arg(short, long)]
    price: Decimal,

    /// Primary image URL
    #[arg(long)]
    image: Option<String>,
}

impl ProductArgs {
    fn to_snapshot(&self) -> Result<ProductSnapshot, Box<dyn std::error::Error>> {
        let product = ProductSnapshot::parse(&self.id, &self.name, self.price)?;
        Ok(match &self.image {
            Some(image) => product.with_image(image),
            None => product,
        })
    }
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StoreConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match StoreConfig::from_env() {
        Ok(config) => config,
        Err(e) => exit_with_config_error(&e),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir.clone_from(dir);
    }

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "atelier_storefront=info,atelier_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

/// Tracing is not set up yet when configuration fails, so report directly.
#[allow(clippy::print_stderr)]
fn exit_with_config_error(error: &ConfigError) -> ! {
    eprintln!("Failed to load configuration: {error}");
    std::process::exit(2);
}

async fn run(cli: Cli, config: StoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let provider = Arc::new(LocalIdentityProvider::new());
    if let Some(identity) = session_identity(cli.user.as_deref(), cli.email.as_deref())? {
        provider.restore_session(identity).await;
    }
    provider.mark_ready();

    let documents = Arc::new(FileDocumentStore::new(&config.data_dir));
    tracing::debug!(data_dir = %config.data_dir.display(), "using file document store");

    let observers: Vec<Arc<dyn StoreObserver>> = vec![Arc::new(commands::TerminalObserver)];
    let state = AppState::initialize(config, provider, documents, observers).await?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&state).await,
            CartAction::Add {
                product,
                quantity,
                variant,
            } => {
                commands::cart::add(&state, &product.to_snapshot()?, quantity, variant.as_deref())
                    .await?;
            }
            CartAction::Remove { id, variant } => {
                commands::cart::remove(&state, &id, variant.as_deref()).await?;
            }
            CartAction::Update {
                id,
                quantity,
                variant,
            } => commands::cart::update(&state, &id, quantity, variant.as_deref()).await?,
            CartAction::Clear => commands::cart::clear(&state).await?,
        },
        Commands::Favorites { action } => match action {
            FavoritesAction::List => commands::favorites::list(&state).await,
            FavoritesAction::Toggle { product } => {
                commands::favorites::toggle(&state, &product.to_snapshot()?).await?;
            }
            FavoritesAction::Remove { id } => commands::favorites::remove(&state, &id).await?,
            FavoritesAction::MoveToCart { id } => {
                commands::favorites::move_to_cart(&state, &id).await?;
            }
        },
        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::profile::show(&state).await?,
            ProfileAction::Update { name, theme } => {
                commands::profile::update(&state, name, theme).await?;
            }
        },
    }
    Ok(())
}

/// Identity to restore from the `--user` / `--email` flags.
fn session_identity(
    user: Option<&str>,
    email: Option<&str>,
) -> Result<Option<Identity>, Box<dyn std::error::Error>> {
    let Some(user) = user else {
        return Ok(None);
    };
    let email = email.ok_or("--email is required together with --user")?;
    Ok(Some(Identity::new(
        UserId::parse(user)?,
        Email::parse(email)?,
        true,
    )))
}
