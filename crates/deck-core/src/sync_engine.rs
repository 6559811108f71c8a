//! DeckSync: Runs push and pull cycles between the deck directory and the
//! remote deck store.
//!
//! One cycle moves through these phases:
//!
//! ```text
//! Idle -> Fetching -> TimestampGate -> Applying -> Idle
//!                                  \-> Rejected -> Idle
//! ```
//!
//! `DeckSync` owns the last known `DeckRecord` (the baseline the gate and the
//! slide matcher compare against) and replaces it only after a cycle applies
//! completely. Callers must not run two cycles on the same deck at once; the
//! `&mut self` receivers make overlapping cycles on one instance impossible.

use crate::assets::{content_type, is_asset_file, reconcile_assets};
use crate::fs::{FileSystem, FsError};
use crate::local::{self, LocalError};
use crate::markdown::split;
use crate::model::{AssetRecord, DeckRecord};
use crate::reconcile::reconcile;
use crate::tracker::SyncTracker;
use crate::transport::{AssetStore, AssetUpload, DeckStore, TransportError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Content type used for asset files the type table does not know.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Local(#[from] LocalError),

    #[error("No deck found in this directory; create or import one first")]
    NotLinked,

    #[error("This directory is already linked to deck {0}")]
    AlreadyLinked(u64),

    #[error("No remote deck matches {0:?}")]
    DeckNotFound(String),
}

impl From<FsError> for SyncError {
    fn from(e: FsError) -> Self {
        SyncError::Local(LocalError::Fs(e))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Where a sync cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Fetching,
    TimestampGate,
    Applying,
    Rejected,
}

/// Which way a cycle moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Remote deck overwrites local state
    Pull,
    /// Local document is reconciled and sent to the remote
    Push,
}

/// What an applied cycle changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Number of slides in the resulting deck
    pub slides: usize,
    /// Whether the deck document was rewritten
    pub document_written: bool,
    pub uploaded: Vec<String>,
    pub downloaded: Vec<String>,
    /// Remote-only assets removed from the deck after confirmation
    pub removed: Vec<String>,
    /// Remote-only assets left in place
    pub kept_remote: Vec<String>,
}

/// Result of a cycle that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied(SyncReport),
    /// The timestamp gate refused the cycle; local state is untouched.
    Rejected {
        local: Option<DateTime<Utc>>,
        remote: Option<DateTime<Utc>>,
    },
}

/// Decides whether a remote asset with no local file leaves the deck.
#[async_trait]
pub trait RemovalPolicy: Send + Sync {
    async fn confirm_removal(&self, asset: &AssetRecord) -> bool;
}

/// Never removes remote assets.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepRemote;

#[async_trait]
impl RemovalPolicy for KeepRemote {
    async fn confirm_removal(&self, _asset: &AssetRecord) -> bool {
        false
    }
}

/// Timestamp gate, shared by pulls and pushes.
///
/// A cycle applies only when the remote is not older than the baseline we
/// last saw. A newer remote still applies, so the last writer wins. Unset
/// timestamps sort before every set one.
pub fn gate_allows(local: Option<DateTime<Utc>>, remote: Option<DateTime<Utc>>) -> bool {
    remote >= local
}

/// Sync orchestrator for one deck directory.
pub struct DeckSync<F: FileSystem, S: DeckStore, A: AssetStore> {
    fs: F,
    store: S,
    assets: A,
    /// Last known deck (mirrors the sidecar)
    deck: DeckRecord,
    phase: SyncPhase,
    tracker: SyncTracker,
    removal: Box<dyn RemovalPolicy>,
}

impl<F: FileSystem, S: DeckStore, A: AssetStore> DeckSync<F, S, A> {
    /// Open the deck linked in the sidecar.
    pub async fn open(fs: F, store: S, assets: A) -> Result<Self> {
        match local::load_deck(&fs).await? {
            Some(deck) if deck.is_persisted() => Ok(Self::with_deck(fs, store, assets, deck)),
            _ => Err(SyncError::NotLinked),
        }
    }

    /// Create the remote deck for this directory.
    ///
    /// The draft (with its client-assigned uuid) is written to the sidecar
    /// before the remote call, so a failed create can be retried with the
    /// same identity. An existing deck document seeds the draft's slides.
    pub async fn create(
        fs: F,
        store: S,
        assets: A,
        title: &str,
        description: &str,
        is_public: bool,
    ) -> Result<Self> {
        let mut draft = match local::load_deck(&fs).await? {
            Some(deck) if deck.is_persisted() => return Err(SyncError::AlreadyLinked(deck.id)),
            Some(pending) => {
                info!("Retrying create for pending deck {}", pending.uuid);
                pending
            }
            None => DeckRecord::draft(title, description, is_public),
        };
        draft.title = title.to_string();
        draft.description = description.to_string();
        draft.is_public = is_public;

        if let Some(document) = local::read_document_if_present(&fs).await? {
            draft.slides = reconcile(&split(&document), &draft.slides);
        }

        local::save_deck(&fs, &draft).await?;

        let saved = store.create(&draft).await?.normalize();
        info!("Created deck {} ({})", saved.id, saved.uuid);
        local::save_deck(&fs, &saved).await?;
        local::write_document(&fs, &saved.slides, None).await?;

        Ok(Self::with_deck(fs, store, assets, saved))
    }

    /// Link this directory to an existing remote deck and pull it.
    ///
    /// `selector` matches a deck uuid, a uuid prefix, or an exact title.
    pub async fn import(fs: F, store: S, assets: A, selector: &str) -> Result<(Self, SyncReport)> {
        if let Some(deck) = local::load_deck(&fs).await? {
            if deck.is_persisted() {
                return Err(SyncError::AlreadyLinked(deck.id));
            }
        }

        let decks = store.list().await?;
        let selected = decks
            .iter()
            .find(|deck| deck.uuid.as_str() == selector)
            .or_else(|| decks.iter().find(|deck| deck.title == selector))
            .or_else(|| {
                decks
                    .iter()
                    .find(|deck| !selector.is_empty() && deck.uuid.as_str().starts_with(selector))
            })
            .ok_or_else(|| SyncError::DeckNotFound(selector.to_string()))?;

        let remote = store.fetch(selected.id).await?.normalize();
        info!("Importing deck {} ({})", remote.title, remote.uuid);

        let mut sync = Self::with_deck(fs, store, assets, remote.clone());
        sync.enter(SyncPhase::Applying);
        let report = sync.apply_pull(remote).await;
        sync.enter(SyncPhase::Idle);
        Ok((sync, report?))
    }

    fn with_deck(fs: F, store: S, assets: A, deck: DeckRecord) -> Self {
        Self {
            fs,
            store,
            assets,
            deck,
            phase: SyncPhase::Idle,
            tracker: SyncTracker::new(),
            removal: Box::new(KeepRemote),
        }
    }

    /// Use `policy` to decide about remote-only assets during push.
    pub fn with_removal_policy(mut self, policy: impl RemovalPolicy + 'static) -> Self {
        self.removal = Box::new(policy);
        self
    }

    /// Handle for checking which files this engine wrote.
    pub fn tracker(&self) -> SyncTracker {
        self.tracker.clone()
    }

    /// The last known deck.
    pub fn deck(&self) -> &DeckRecord {
        &self.deck
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Replace local state with the remote deck.
    pub async fn pull(&mut self, force: bool) -> Result<SyncOutcome> {
        let result = self.run_cycle(Direction::Pull, force).await;
        self.enter(SyncPhase::Idle);
        result
    }

    /// Send the local document and assets to the remote deck.
    pub async fn push(&mut self, force: bool) -> Result<SyncOutcome> {
        let result = self.run_cycle(Direction::Push, force).await;
        self.enter(SyncPhase::Idle);
        result
    }

    fn enter(&mut self, phase: SyncPhase) {
        if self.phase != phase {
            debug!("Sync phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    async fn run_cycle(&mut self, direction: Direction, force: bool) -> Result<SyncOutcome> {
        self.enter(SyncPhase::Fetching);
        let remote = self.store.fetch(self.deck.id).await?.normalize();

        self.enter(SyncPhase::TimestampGate);
        let local_time = self.deck.updated_at;
        if !gate_allows(local_time, remote.updated_at) {
            if force {
                info!("Forcing {:?} past timestamp gate", direction);
            } else {
                self.enter(SyncPhase::Rejected);
                warn!(
                    "{:?} rejected: local deck updated {:?}, remote updated {:?}",
                    direction, local_time, remote.updated_at
                );
                return Ok(SyncOutcome::Rejected {
                    local: local_time,
                    remote: remote.updated_at,
                });
            }
        }

        self.enter(SyncPhase::Applying);
        let report = match direction {
            Direction::Pull => self.apply_pull(remote).await?,
            Direction::Push => self.apply_push(remote).await?,
        };
        Ok(SyncOutcome::Applied(report))
    }

    /// Write the remote deck locally.
    ///
    /// Every missing asset is downloaded before the first local write, so a
    /// failed download leaves the directory untouched.
    async fn apply_pull(&mut self, remote: DeckRecord) -> Result<SyncReport> {
        let local_assets = local::list_assets(&self.fs).await?;
        let plan = reconcile_assets(&local_assets, &remote.assets);

        let mut downloads = Vec::new();
        for asset in &plan.remote_only {
            if !is_safe_asset_name(&asset.filename) {
                warn!("Skipping remote asset with unusable name {:?}", asset.filename);
                continue;
            }
            info!("Downloading {}", asset.filename);
            let bytes = self.assets.download(asset).await?;
            downloads.push((asset.filename.clone(), bytes));
        }

        local::save_deck(&self.fs, &remote).await?;
        let document_written =
            local::write_document(&self.fs, &remote.slides, Some(&self.tracker)).await?;
        for (filename, bytes) in &downloads {
            self.tracker.mark_synced(filename);
            self.fs.write(filename, bytes).await?;
        }

        let report = SyncReport {
            slides: remote.slides.len(),
            document_written,
            downloaded: downloads.into_iter().map(|(filename, _)| filename).collect(),
            ..SyncReport::default()
        };
        info!(
            "Pulled deck {}: {} slides, {} asset(s) downloaded",
            remote.id,
            report.slides,
            report.downloaded.len()
        );
        self.deck = remote;
        Ok(report)
    }

    /// Reconcile the local document against the baseline and send it.
    ///
    /// Local state is written only once the remote store has accepted the
    /// update.
    async fn apply_push(&mut self, remote: DeckRecord) -> Result<SyncReport> {
        let document = local::read_document(&self.fs).await?;
        let slides = reconcile(&split(&document), &self.deck.slides);

        let local_assets = local::list_assets(&self.fs).await?;
        let plan = reconcile_assets(&local_assets, &remote.assets);

        let mut assets = remote.assets.clone();
        let mut report = SyncReport::default();

        for filename in &plan.to_upload {
            let bytes = self.fs.read(filename).await?;
            let upload = AssetUpload {
                filename: filename.clone(),
                bytes,
                content_type: content_type(filename)
                    .unwrap_or(FALLBACK_CONTENT_TYPE)
                    .to_string(),
            };
            info!("Uploading {}", filename);
            let url = self.assets.upload(self.deck.id, upload).await?;
            assets.push(AssetRecord::uploaded(filename.clone(), url));
            report.uploaded.push(filename.clone());
        }

        for asset in &plan.remote_only {
            if self.removal.confirm_removal(asset).await {
                report.removed.push(asset.filename.clone());
            } else {
                report.kept_remote.push(asset.filename.clone());
            }
        }
        assets.retain(|asset| !report.removed.contains(&asset.filename));

        let candidate = DeckRecord {
            slides,
            assets,
            ..self.deck.clone()
        };
        let saved = self.store.update(&candidate).await?.normalize();
        local::save_deck(&self.fs, &saved).await?;

        report.slides = saved.slides.len();
        info!(
            "Pushed deck {}: {} slides, {} asset(s) uploaded",
            saved.id,
            report.slides,
            report.uploaded.len()
        );
        self.deck = saved;
        Ok(report)
    }
}

/// Remote filenames become local paths; only plain asset names are accepted.
fn is_safe_asset_name(filename: &str) -> bool {
    is_asset_file(filename) && !filename.contains(['/', '\\']) && filename != ".."
}
