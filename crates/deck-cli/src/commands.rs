//! Command implementations behind the `deck` binary.

use crate::auth::{AccountInfo, AuthPayload, AuthStore};
use crate::channel::{ChannelConnection, ChannelEvent};
use crate::config::{Endpoints, Screen};
use crate::http::HttpClient;
use crate::native_fs::NativeFs;
use crate::prompt::StdinPrompt;
use crate::watch;
use anyhow::{bail, Context as _, Result};
use deck_core::{
    DeckStore, DeckSync, KeepRemote, StableId, SyncError, SyncOutcome, SyncReport, TransportError,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Minimum length of a deck title.
const MIN_TITLE_LEN: usize = 2;

/// Everything a command needs to know about where it runs.
pub struct Context {
    pub endpoints: Endpoints,
    pub deck_dir: PathBuf,
    pub auth: AuthStore,
    /// Per-process id, so the channel can tell our own updates apart
    pub client_id: String,
}

/// A verified account with a client ready to call the backend.
pub struct Session {
    pub client: HttpClient,
    pub account: AccountInfo,
    pub credentials: AuthPayload,
}

type LinkedDeck = DeckSync<NativeFs, HttpClient, HttpClient>;

impl Context {
    pub fn new(endpoints: Endpoints, deck_dir: PathBuf, auth: AuthStore) -> Self {
        Self {
            endpoints,
            deck_dir,
            auth,
            client_id: StableId::generate().to_string(),
        }
    }

    fn fs(&self) -> NativeFs {
        NativeFs::new(self.deck_dir.clone())
    }

    /// Load the stored token and verify it with the backend.
    pub async fn authorize(&self) -> Result<Session> {
        let Some(credentials) = self.auth.load().context("Failed to read the auth file")? else {
            bail!("No auth file found! Run `deck auth` to log in.");
        };

        let client = HttpClient::new(
            self.endpoints.clone(),
            &credentials.access_token,
            &credentials.username,
            &self.client_id,
        )?;
        let account = client
            .account()
            .await
            .context("Could not reach the deck service")?;

        if !account.is_signed_in {
            bail!("It does not look like you're signed in anymore. Run `deck auth` to sign in again.");
        }
        debug!("Signed in as {}", account.username);

        Ok(Session {
            client,
            account,
            credentials,
        })
    }

    async fn open_sync(&self, session: &Session) -> Result<LinkedDeck> {
        match DeckSync::open(self.fs(), session.client.clone(), session.client.clone()).await {
            Err(SyncError::NotLinked) => {
                bail!("Could not find deck config! Did you run `deck create` or `deck import` yet?")
            }
            result => Ok(result?),
        }
    }
}

/// Log in through the browser and store the token handed over on the channel.
pub async fn auth(ctx: &Context) -> Result<()> {
    let channel = StableId::generate().to_string();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut connection =
        ChannelConnection::connect(&ctx.endpoints.ws, &ctx.client_id, &channel, event_tx)
            .await
            .context("Could not connect to the deck channel server")?;

    println!("Open this URL in your browser to log in:");
    println!("  {}", ctx.endpoints.login_url(&channel));

    let result = loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(ChannelEvent::Message(request)) => {
                    match AuthPayload::from_channel_data(&request.data) {
                        Ok(payload) => {
                            ctx.auth.save(&payload).context("Failed to write the auth file")?;
                            info!("Saved credentials to {}", ctx.auth.path().display());
                            println!("You are now authenticated as {}!", payload.username);
                            break Ok(());
                        }
                        Err(e) => warn!("Ignoring channel message: {}", e),
                    }
                }
                Some(ChannelEvent::Closed) | None => {
                    break Err(anyhow::anyhow!("Channel closed before login completed"));
                }
            },

            _ = tokio::signal::ctrl_c() => {
                break Err(anyhow::anyhow!("Login cancelled"));
            }
        }
    };

    connection.close().await;
    result
}

pub async fn check(ctx: &Context) -> Result<()> {
    let session = ctx.authorize().await?;
    println!("Welcome, {}! You're signed in.", session.account.name);
    Ok(())
}

/// Print the account page URL for upgrading the plan.
pub async fn upgrade(ctx: &Context) -> Result<()> {
    let session = ctx.authorize().await?;
    let url = upgrade_url(&ctx.endpoints, &session.credentials, &session.account)?;
    println!("Upgrade your account at:");
    println!("  {}", url);
    Ok(())
}

pub fn upgrade_url(endpoints: &Endpoints, credentials: &AuthPayload, account: &AccountInfo) -> Result<String> {
    let url = reqwest::Url::parse_with_params(
        &endpoints.api_url("auth"),
        &[
            ("username", account.username.as_str()),
            ("name", account.name.as_str()),
            ("token", credentials.access_token.as_str()),
            ("image_url", account.image_url.as_str()),
            ("email", account.email.as_str()),
            ("subscription_name", account.subscription_name.as_str()),
            ("redirect", "/account"),
        ],
    )?;
    Ok(url.to_string())
}

pub fn validate_title(title: &str) -> Result<&str> {
    let title = title.trim();
    if title.chars().count() < MIN_TITLE_LEN {
        bail!("The deck title needs to be at least {} characters.", MIN_TITLE_LEN);
    }
    Ok(title)
}

/// Friendlier explanation for a rejected create.
pub fn create_hint(body: &str) -> Option<&'static str> {
    if body.contains("There is a limit") {
        Some("You can only create 1 deck with a free account. Run `deck upgrade` to upgrade your account!")
    } else if body.contains("Must be true for free plan users") {
        Some("Free accounts can only create public decks. Run `deck upgrade` to upgrade your account!")
    } else {
        None
    }
}

pub async fn create(ctx: &Context, title: &str, description: &str, private: bool) -> Result<()> {
    let title = validate_title(title)?;
    let session = ctx.authorize().await?;

    if private && session.account.is_free_plan() {
        bail!("Free accounts can only create public decks. Run `deck upgrade` to upgrade your account!");
    }

    let result = DeckSync::create(
        ctx.fs(),
        session.client.clone(),
        session.client.clone(),
        title,
        description,
        !private,
    )
    .await;

    match result {
        Ok(sync) => {
            println!("Created deck {:?}; edit {} and run `deck push`.", sync.deck().title, deck_core::DOCUMENT_FILE);
            Ok(())
        }
        Err(SyncError::Transport(e)) => {
            let hint = e.body().and_then(create_hint);
            match hint {
                Some(hint) => bail!("{}", hint),
                None => Err(SyncError::Transport(e)).context("Creating the deck failed"),
            }
        }
        Err(SyncError::AlreadyLinked(id)) => {
            bail!("This directory already holds deck {}; use `deck push` to update it.", id)
        }
        Err(e) => Err(e.into()),
    }
}

/// Import a remote deck, or list the available decks without a selector.
pub async fn import(ctx: &Context, selector: Option<&str>) -> Result<()> {
    let session = ctx.authorize().await?;

    let Some(selector) = selector else {
        let decks = session.client.list().await?;
        if decks.is_empty() {
            println!("You have no decks yet. Run `deck create` to make one.");
        } else {
            println!("Which deck to import? Run `deck import <title or uuid>`:");
            for deck in decks {
                println!("  {}  {}", deck.uuid.short(), deck.title);
            }
        }
        return Ok(());
    };

    let (sync, report) =
        DeckSync::import(ctx.fs(), session.client.clone(), session.client.clone(), selector).await?;
    println!("Imported {:?}.", sync.deck().title);
    print_report(&report);
    Ok(())
}

pub async fn push(ctx: &Context, force: bool) -> Result<()> {
    let session = ctx.authorize().await?;
    let sync = ctx.open_sync(&session).await?;

    // Prompting needs a terminal; otherwise remote assets stay
    let mut sync = if std::io::stdin().is_terminal() {
        sync.with_removal_policy(StdinPrompt)
    } else {
        sync.with_removal_policy(KeepRemote)
    };

    println!("Pushing local changes...");
    match sync.push(force).await? {
        SyncOutcome::Applied(report) => {
            print_report(&report);
            println!("Done!");
        }
        SyncOutcome::Rejected { local, remote } => {
            println!("The remote deck has changed since your last pull!");
            println!("  local: {}  remote: {}", describe(local), describe(remote));
            println!("Run `deck pull` first, or force with `deck push -f`.");
        }
    }
    Ok(())
}

pub async fn pull(ctx: &Context, force: bool) -> Result<()> {
    let session = ctx.authorize().await?;
    let mut sync = ctx.open_sync(&session).await?;

    match sync.pull(force).await {
        Ok(SyncOutcome::Applied(report)) => {
            print_report(&report);
            println!("Done!");
        }
        Ok(SyncOutcome::Rejected { local, remote }) => {
            println!("It looks like you might have local changes that are not on the server!");
            println!("  local: {}  remote: {}", describe(local), describe(remote));
            println!("You can force with `deck pull -f`.");
        }
        Err(SyncError::Transport(TransportError::Status { status: 404, .. })) => {
            bail!("The deck linked here no longer exists on the server.")
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub async fn watch(ctx: &Context) -> Result<()> {
    let session = ctx.authorize().await?;
    let sync = ctx.open_sync(&session).await?;
    let channel = watch::listen_channel(&session.account.uuid, sync.deck().uuid.as_str())?;

    println!("Watching for changes; press Ctrl+C to stop.");
    watch::run(
        sync,
        ctx.deck_dir.clone(),
        &ctx.endpoints.ws,
        &ctx.client_id,
        &channel,
    )
    .await
}

/// Print the browser URL of a deck screen.
pub async fn open(ctx: &Context, screen: Screen) -> Result<()> {
    let deck = match deck_core::local::load_deck(&ctx.fs()).await? {
        Some(deck) if deck.is_persisted() => deck,
        _ => bail!("Could not find deck config! Did you run `deck create` or `deck import` yet?"),
    };
    let Some(credentials) = ctx.auth.load()? else {
        bail!("No auth file found! Run `deck auth` to log in.");
    };

    let url = ctx
        .endpoints
        .deck_url(&credentials.username, deck.uuid.short(), &deck.slug, screen);
    println!("Open the {} screen at:", screen);
    println!("  {}", url);
    Ok(())
}

fn describe(time: Option<chrono::DateTime<chrono::Utc>>) -> String {
    time.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".to_string())
}

fn print_report(report: &SyncReport) {
    println!("{} slide(s)", report.slides);
    for filename in &report.uploaded {
        println!("  uploaded {}", filename);
    }
    for filename in &report.downloaded {
        println!("  downloaded {}", filename);
    }
    for filename in &report.removed {
        println!("  removed {} from the remote deck", filename);
    }
    for filename in &report.kept_remote {
        println!("  kept remote-only {}", filename);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title() {
        assert_eq!(validate_title("  My Talk ").unwrap(), "My Talk");
        assert!(validate_title("A").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title("Ün").is_ok());
    }

    #[test]
    fn test_create_hints() {
        assert!(create_hint(r#"{"errors":["There is a limit of 1 deck"]}"#)
            .unwrap()
            .contains("only create 1 deck"));
        assert!(create_hint("is_public: Must be true for free plan users")
            .unwrap()
            .contains("public decks"));
        assert_eq!(create_hint("something else"), None);
    }

    #[test]
    fn test_upgrade_url_encodes_account() {
        let endpoints = Endpoints {
            api: "https://api.example".into(),
            app: "https://app.example".into(),
            ws: "wss://ws.example/".into(),
        };
        let credentials = AuthPayload {
            access_token: "t0k".into(),
            username: "ann".into(),
            name: "Ann Lee".into(),
            image_url: String::new(),
            email: "ann@example.com".into(),
            subscription_name: "free".into(),
        };
        let account = AccountInfo {
            is_signed_in: true,
            name: "Ann Lee".into(),
            username: "ann".into(),
            email: "ann@example.com".into(),
            subscription_name: "free".into(),
            ..AccountInfo::default()
        };

        let url = upgrade_url(&endpoints, &credentials, &account).unwrap();
        assert!(url.starts_with("https://api.example/auth?username=ann&name=Ann+Lee&token=t0k"));
        assert!(url.ends_with("&redirect=%2Faccount"));
    }
}
