//! deck: Keep a markdown slide deck in sync with its remote deck.
//!
//! A deck directory holds `deck.md`, the `.deck.json` sidecar and the deck's
//! image assets.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use deck_cli::commands::{self, Context};
use deck_cli::{AuthStore, Endpoints, Screen};

#[derive(Parser, Debug)]
#[command(name = "deck")]
#[command(about = "Create and sync slide decks from your local machine")]
#[command(version)]
struct Cli {
    /// Path to the deck directory
    #[arg(short = 'C', long, default_value = ".", global = true)]
    dir: PathBuf,

    /// Path to the auth file (defaults to ~/.config/deck/auth.json)
    #[arg(long, env = "DECK_AUTH_FILE", global = true)]
    auth_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in through the browser
    Auth,
    /// Check that you're properly signed in
    Check,
    /// Print a link to upgrade your account
    Upgrade,
    /// Create a new deck for this directory
    Create {
        /// Deck title (at least 2 characters)
        title: String,
        /// Deck description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Make the deck private (paid plans only)
        #[arg(long)]
        private: bool,
    },
    /// Import a remote deck into this directory (lists decks without a selector)
    Import {
        /// Deck uuid, uuid prefix or exact title
        selector: Option<String>,
    },
    /// Push local changes to the remote deck
    Push {
        /// Skip the timestamp check
        #[arg(short, long)]
        force: bool,
    },
    /// Pull remote changes into this directory
    Pull {
        /// Skip the timestamp check
        #[arg(short, long)]
        force: bool,
    },
    /// Push local edits and pull remote ones until interrupted
    Watch,
    /// Print the URL of the deck's present screen
    Present,
    /// Print the URL of the deck's edit screen
    Edit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging - respects RUST_LOG env var, defaults to info (or debug with --verbose)
    let default_filter = if cli.verbose {
        "debug,deck_cli=debug,deck_core=debug"
    } else {
        "info,deck_cli=info,deck_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let endpoints = Endpoints::from_env()?;
    debug!("Endpoints: {:?}", endpoints);

    let auth = match cli.auth_file {
        Some(path) => AuthStore::at(path),
        None => AuthStore::default_location()?,
    };
    let ctx = Context::new(endpoints, cli.dir, auth);
    debug!("Client id: {}", ctx.client_id);

    match cli.command {
        Command::Auth => commands::auth(&ctx).await,
        Command::Check => commands::check(&ctx).await,
        Command::Upgrade => commands::upgrade(&ctx).await,
        Command::Create {
            title,
            description,
            private,
        } => commands::create(&ctx, &title, &description, private).await,
        Command::Import { selector } => commands::import(&ctx, selector.as_deref()).await,
        Command::Push { force } => commands::push(&ctx, force).await,
        Command::Pull { force } => commands::pull(&ctx, force).await,
        Command::Watch => {
            commands::watch(&ctx).await?;
            info!("Stopped watching");
            Ok(())
        }
        Command::Present => commands::open(&ctx, Screen::Present).await,
        Command::Edit => commands::open(&ctx, Screen::Edit).await,
    }
}
