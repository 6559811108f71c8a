//! Watch mode: keep a deck directory and its remote deck in sync.
//!
//! Local edits push; channel messages from other clients pull. Both arrive
//! in one select loop, so at most one cycle runs at a time.

use crate::channel::{ChannelConnection, ChannelEvent};
use crate::watcher::{FileEvent, FileWatcher};
use anyhow::{bail, Result};
use deck_core::{AssetStore, DeckStore, DeckSync, FileSystem, SyncOutcome, SyncTracker};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// Watch state holding the sync engine.
pub struct Watch<F: FileSystem, S: DeckStore, A: AssetStore> {
    sync: Arc<Mutex<DeckSync<F, S, A>>>,
    /// Paths written by our own pulls
    tracker: SyncTracker,
}

impl<F: FileSystem, S: DeckStore, A: AssetStore> Watch<F, S, A> {
    pub fn new(sync: DeckSync<F, S, A>) -> Self {
        let tracker = sync.tracker();
        Self {
            sync: Arc::new(Mutex::new(sync)),
            tracker,
        }
    }

    /// Handle a file change event from the watcher.
    pub async fn on_file_changed(&self, event: FileEvent) {
        if self.tracker.consume_synced(&event.path) {
            debug!("Skipping push for {} (written by pull)", event.path);
            return;
        }

        info!("{} changed ({:?}), pushing", event.path, event.kind);
        let mut sync = self.sync.lock().await;
        match sync.push(false).await {
            Ok(SyncOutcome::Applied(report)) => {
                info!(
                    "Pushed {} slide(s), {} asset(s) uploaded",
                    report.slides,
                    report.uploaded.len()
                );
            }
            Ok(SyncOutcome::Rejected { local, remote }) => {
                // The edit stays on disk; pulling now would overwrite it
                warn!(
                    "Push rejected: remote deck ({:?}) is older than the last sync ({:?}). \
                     Run `deck push --force` to overwrite it",
                    remote, local
                );
            }
            Err(e) => {
                error!("Push failed: {}", e);
            }
        }
    }

    /// Handle a channel message: some other client changed the deck.
    pub async fn on_remote_change(&self, client_id: &str) {
        info!("Deck changed by {}, pulling", client_id);
        self.pull().await;
    }

    async fn pull(&self) {
        let mut sync = self.sync.lock().await;
        match sync.pull(false).await {
            Ok(SyncOutcome::Applied(report)) => {
                info!(
                    "Pulled {} slide(s), {} asset(s) downloaded",
                    report.slides,
                    report.downloaded.len()
                );
            }
            Ok(SyncOutcome::Rejected { .. }) => {
                warn!("Local deck is newer than the remote; not pulling");
            }
            Err(e) => {
                error!("Pull failed: {}", e);
            }
        }
    }
}

/// Run watch mode until interrupted or the channel closes.
pub async fn run<F: FileSystem, S: DeckStore, A: AssetStore>(
    sync: DeckSync<F, S, A>,
    deck_dir: PathBuf,
    ws_url: &str,
    client_id: &str,
    channel: &str,
) -> Result<()> {
    let watch = Watch::new(sync);

    let mut watcher = FileWatcher::new(deck_dir)?;
    info!("Watching {} for changes", watcher.deck_path().display());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut connection = ChannelConnection::connect(ws_url, client_id, channel, event_tx).await?;

    let result = loop {
        tokio::select! {
            Some(event) = watcher.event_rx().recv() => {
                watch.on_file_changed(event).await;
            }

            Some(event) = event_rx.recv() => {
                match event {
                    ChannelEvent::Message(request) => {
                        watch.on_remote_change(&request.client_id).await;
                    }
                    ChannelEvent::Closed => {
                        break Err(anyhow::anyhow!("Channel connection closed"));
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break Ok(());
            }
        }
    };

    connection.close().await;
    result
}

/// Pick the channel to listen on: the account's, else the deck's.
pub fn listen_channel(account_uuid: &str, deck_uuid: &str) -> Result<String> {
    if !account_uuid.is_empty() {
        Ok(account_uuid.to_string())
    } else if !deck_uuid.is_empty() {
        Ok(deck_uuid.to_string())
    } else {
        bail!("Neither the account nor the deck has a channel id")
    }
}
