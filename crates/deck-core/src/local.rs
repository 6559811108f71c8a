//! Local deck state: the metadata sidecar, the deck document and asset files.

use crate::assets::is_asset_file;
use crate::fs::{FileSystem, FsError};
use crate::markdown::{needs_rewrite, serialize};
use crate::model::{DeckRecord, SlideRecord};
use crate::tracker::SyncTracker;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, warn};

/// Metadata sidecar holding the last known `DeckRecord`
pub const SIDECAR_FILE: &str = ".deck.json";
/// Markdown document holding the slide contents
pub const DOCUMENT_FILE: &str = "deck.md";

#[derive(Debug, Error)]
pub enum LocalError {
    #[error("Filesystem error: {0}")]
    Fs(#[from] FsError),

    #[error("Could not find the deck document {0}")]
    MissingDocument(String),

    #[error("{0} is not valid UTF-8 text")]
    MalformedDocument(String),

    #[error("Failed to encode deck metadata: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LocalError>;

/// Load the last known deck from the sidecar.
///
/// A missing sidecar is no history. So is an unparseable one: it is logged
/// and otherwise treated as absent.
pub async fn load_deck<F: FileSystem>(fs: &F) -> Result<Option<DeckRecord>> {
    let bytes = match fs.read(SIDECAR_FILE).await {
        Ok(bytes) => bytes,
        Err(FsError::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_slice::<DeckRecord>(&bytes) {
        Ok(deck) => Ok(Some(deck.normalize())),
        Err(e) => {
            warn!("Ignoring unreadable {}: {}", SIDECAR_FILE, e);
            Ok(None)
        }
    }
}

/// Persist `deck` to the sidecar.
pub async fn save_deck<F: FileSystem>(fs: &F, deck: &DeckRecord) -> Result<()> {
    let contents = serde_json::to_vec_pretty(deck)?;
    fs.write(SIDECAR_FILE, &contents).await?;
    debug!("Wrote {} ({} slides)", SIDECAR_FILE, deck.slides.len());
    Ok(())
}

/// Read the deck document. Missing or non-UTF-8 documents are errors.
pub async fn read_document<F: FileSystem>(fs: &F) -> Result<String> {
    let bytes = match fs.read(DOCUMENT_FILE).await {
        Ok(bytes) => bytes,
        Err(FsError::NotFound(_)) => return Err(LocalError::MissingDocument(DOCUMENT_FILE.to_string())),
        Err(e) => return Err(e.into()),
    };
    String::from_utf8(bytes).map_err(|_| LocalError::MalformedDocument(DOCUMENT_FILE.to_string()))
}

/// Read the deck document if there is one.
pub async fn read_document_if_present<F: FileSystem>(fs: &F) -> Result<Option<String>> {
    match read_document(fs).await {
        Ok(document) => Ok(Some(document)),
        Err(LocalError::MissingDocument(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Regenerate the deck document from `slides`.
///
/// Returns `false` without touching the file when its current content already
/// matches. The path is marked in `tracker` before a real write.
pub async fn write_document<F: FileSystem>(
    fs: &F,
    slides: &[SlideRecord],
    tracker: Option<&SyncTracker>,
) -> Result<bool> {
    let next = serialize(slides);

    let current = match fs.read(DOCUMENT_FILE).await {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(FsError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    if let Some(current) = &current {
        if !needs_rewrite(current, &next) {
            debug!("{} unchanged, skipping write", DOCUMENT_FILE);
            return Ok(false);
        }
    }

    if let Some(tracker) = tracker {
        tracker.mark_synced(DOCUMENT_FILE);
    }
    fs.write(DOCUMENT_FILE, next.as_bytes()).await?;
    Ok(true)
}

/// Names of the asset files in the deck directory.
pub async fn list_assets<F: FileSystem>(fs: &F) -> Result<BTreeSet<String>> {
    Ok(fs
        .list()
        .await?
        .into_iter()
        .filter(|entry| !entry.is_dir && is_asset_file(&entry.name))
        .map(|entry| entry.name)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use crate::model::SlideStyle;

    #[tokio::test]
    async fn test_missing_sidecar_is_no_history() {
        let fs = InMemoryFs::new();
        assert!(load_deck(&fs).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unparseable_sidecar_is_no_history() {
        let fs = InMemoryFs::new();
        fs.write(SIDECAR_FILE, b"{not json").await.unwrap();
        assert!(load_deck(&fs).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sidecar_round_trip() {
        let fs = InMemoryFs::new();
        let deck = DeckRecord::draft("Talk", "About things", true);
        save_deck(&fs, &deck).await.unwrap();
        assert_eq!(load_deck(&fs).await.unwrap(), Some(deck));
    }

    #[tokio::test]
    async fn test_read_document_errors() {
        let fs = InMemoryFs::new();
        assert!(matches!(read_document(&fs).await, Err(LocalError::MissingDocument(_))));
        assert!(read_document_if_present(&fs).await.unwrap().is_none());

        fs.write(DOCUMENT_FILE, &[0xff, 0xfe, 0x00]).await.unwrap();
        assert!(matches!(read_document(&fs).await, Err(LocalError::MalformedDocument(_))));
    }

    #[tokio::test]
    async fn test_write_document_skips_unchanged_content() {
        let fs = InMemoryFs::new();
        let tracker = SyncTracker::new();
        let slides = vec![SlideRecord::new("# One", 1, SlideStyle::default())];

        fs.write(DOCUMENT_FILE, b"# One\n").await.unwrap();
        assert!(!write_document(&fs, &slides, Some(&tracker)).await.unwrap());
        assert_eq!(fs.write_count(DOCUMENT_FILE), 1);
        assert!(!tracker.consume_synced(DOCUMENT_FILE));

        let slides = vec![
            SlideRecord::new("# One", 1, SlideStyle::default()),
            SlideRecord::new("# Two", 2, SlideStyle::default()),
        ];
        assert!(write_document(&fs, &slides, Some(&tracker)).await.unwrap());
        assert_eq!(fs.read(DOCUMENT_FILE).await.unwrap(), b"# One\n\n---\n\n# Two");
        assert!(tracker.consume_synced(DOCUMENT_FILE));
    }

    #[tokio::test]
    async fn test_list_assets_filters_non_assets() {
        let fs = InMemoryFs::new();
        for name in ["deck.md", SIDECAR_FILE, "logo.png", "photo.jpeg", "notes.txt"] {
            fs.write(name, b"x").await.unwrap();
        }
        let assets = list_assets(&fs).await.unwrap();
        assert_eq!(
            assets.into_iter().collect::<Vec<_>>(),
            vec!["logo.png".to_string(), "photo.jpeg".to_string()]
        );
    }
}
