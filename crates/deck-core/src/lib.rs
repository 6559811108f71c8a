//! deck-core: Reconciliation engine for keeping a markdown slide deck in sync
//! with its remote deck record.
//!
//! This crate provides:
//! - Splitting a deck document into slide blocks and serializing it back
//! - Matching edited blocks onto the previous slide history (stable identity)
//! - Matching local asset files against remote asset records
//! - The sync orchestrator (`DeckSync`) with its timestamp gate
//! - FileSystem, DeckStore and AssetStore trait abstractions

pub mod assets;
pub mod fs;
pub mod local;
pub mod markdown;
pub mod model;
pub mod reconcile;
pub mod stable_id;
pub mod sync_engine;
pub mod tracker;
pub mod transport;

pub use assets::{AssetPlan, reconcile_assets};
pub use fs::{FileEntry, FileSystem, FsError, InMemoryFs};
pub use local::{DOCUMENT_FILE, SIDECAR_FILE};
pub use model::{AssetRecord, DeckRecord, SlideRecord};
pub use reconcile::reconcile;
pub use stable_id::StableId;
pub use sync_engine::{
    DeckSync, KeepRemote, RemovalPolicy, SyncError, SyncOutcome, SyncPhase, SyncReport,
};
pub use tracker::SyncTracker;
pub use transport::{AssetStore, AssetUpload, DeckStore, TransportError};
