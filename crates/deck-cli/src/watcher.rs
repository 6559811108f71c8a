//! File watcher with debouncing for deck directory changes.
//!
//! Uses notify-debouncer-mini for efficient file change detection.

use anyhow::Result;
use deck_core::DOCUMENT_FILE;
use deck_core::assets::is_asset_file;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// File event from the watcher.
#[derive(Debug, Clone)]
pub struct FileEvent {
    /// File name inside the deck directory
    pub path: String,
    /// Type of event
    pub kind: FileEventKind,
}

/// Type of file event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    /// File was created or modified
    Modified,
    /// File was deleted
    Deleted,
}

/// File watcher that monitors the deck directory.
pub struct FileWatcher {
    deck_path: PathBuf,
    /// Debouncer handle (must keep alive)
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    event_rx: mpsc::UnboundedReceiver<FileEvent>,
}

/// Last seen mtime per file, to drop events that changed nothing
type MtimeCache = Arc<Mutex<HashMap<PathBuf, SystemTime>>>;

/// Whether a change to `name` can affect the remote deck.
///
/// Only the deck document and asset files count. Hidden files (the sidecar
/// included) and anything in a subdirectory never trigger a push.
pub fn is_trigger(name: &str) -> bool {
    if name.starts_with('.') || name.contains('/') || name.contains('\\') {
        return false;
    }
    name == DOCUMENT_FILE || is_asset_file(name)
}

impl FileWatcher {
    /// Create a new file watcher for the deck directory.
    ///
    /// Uses 200ms debounce period to avoid rapid-fire events during saves.
    pub fn new(deck_path: PathBuf) -> Result<Self> {
        // FSEvents on macOS reports canonical paths (/private/var/...)
        let deck_path = deck_path.canonicalize().unwrap_or(deck_path);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let deck_path_clone = deck_path.clone();

        let mtime_cache: MtimeCache = Arc::new(Mutex::new(HashMap::new()));

        let mut debouncer = new_debouncer(
            Duration::from_millis(200),
            move |result: Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(events) => {
                    for event in events {
                        if let Some(file_event) =
                            Self::process_event(&event, &deck_path_clone, &mtime_cache)
                        {
                            if event_tx.send(file_event).is_err() {
                                // Receiver dropped
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("File watcher error: {}", e);
                }
            },
        )?;

        // Decks are flat
        debouncer
            .watcher()
            .watch(&deck_path, RecursiveMode::NonRecursive)?;

        Ok(Self {
            deck_path,
            _debouncer: debouncer,
            event_rx,
        })
    }

    /// Process a single debounced event, returning a FileEvent if relevant.
    fn process_event(
        event: &DebouncedEvent,
        deck_path: &Path,
        mtime_cache: &MtimeCache,
    ) -> Option<FileEvent> {
        let path = &event.path;

        let relative = path.strip_prefix(deck_path).ok()?;
        let relative_str = relative.to_str()?;

        if !is_trigger(relative_str) {
            return None;
        }

        let kind = if path.exists() {
            FileEventKind::Modified
        } else {
            FileEventKind::Deleted
        };

        let relative_path = relative.to_path_buf();
        let mut cache = mtime_cache.lock().unwrap_or_else(|e| e.into_inner());
        match kind {
            FileEventKind::Modified => {
                if let Ok(mtime) = std::fs::metadata(path).and_then(|m| m.modified()) {
                    if cache.get(&relative_path) == Some(&mtime) {
                        return None;
                    }
                    cache.insert(relative_path, mtime);
                }
            }
            FileEventKind::Deleted => {
                cache.remove(&relative_path);
            }
        }

        debug!("File event: {:?} - {}", kind, relative_str);

        Some(FileEvent {
            path: relative_str.to_string(),
            kind,
        })
    }

    /// Get the receiver for file events.
    pub fn event_rx(&mut self) -> &mut mpsc::UnboundedReceiver<FileEvent> {
        &mut self.event_rx
    }

    pub fn deck_path(&self) -> &Path {
        &self.deck_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::time::timeout;

    #[test]
    fn test_triggers() {
        assert!(is_trigger("deck.md"));
        assert!(is_trigger("logo.png"));
        assert!(!is_trigger(".deck.json"));
        assert!(!is_trigger(".hidden.png"));
        assert!(!is_trigger("notes.md"));
        assert!(!is_trigger("drafts/logo.png"));
        assert!(!is_trigger("readme.txt"));
    }

    #[tokio::test]
    async fn test_reports_document_edit_and_ignores_sidecar() {
        let dir = TempDir::new().unwrap();
        let mut watcher = FileWatcher::new(dir.path().to_path_buf()).unwrap();

        std::fs::write(dir.path().join(".deck.json"), "{}").unwrap();
        std::fs::write(dir.path().join("deck.md"), "# One").unwrap();

        let event = timeout(Duration::from_secs(5), watcher.event_rx().recv())
            .await
            .expect("Timed out waiting for file event")
            .expect("Watcher channel closed");
        assert_eq!(event.path, "deck.md");
        assert_eq!(event.kind, FileEventKind::Modified);
    }
}
