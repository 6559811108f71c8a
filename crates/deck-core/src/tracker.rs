//! Echo suppression for files written by a pull.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Time-to-live for sync flags. Flags older than this are considered stale.
const FLAG_TTL: Duration = Duration::from_secs(5);

/// Tracks files that were recently written by the sync engine.
///
/// A pull marks a path here BEFORE writing it. When the file watcher reports
/// the write, the watch loop consumes the flag and skips the push the event
/// would otherwise trigger.
///
/// Flags expire after `FLAG_TTL` so a dropped watcher event cannot suppress a
/// later local edit.
#[derive(Clone, Default)]
pub struct SyncTracker {
    /// Map of path -> timestamp when marked as synced
    synced_paths: Arc<Mutex<HashMap<String, Instant>>>,
}

impl SyncTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a path as written by sync (call before writing to disk)
    pub fn mark_synced(&self, path: &str) {
        self.synced_paths
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), Instant::now());
    }

    /// Check if path was synced and consume the flag (returns true once).
    /// Returns false if the flag has expired.
    pub fn consume_synced(&self, path: &str) -> bool {
        let mut paths = self.synced_paths.lock().unwrap_or_else(|e| e.into_inner());
        // Opportunistic cleanup keeps the map bounded by recent writes
        paths.retain(|_, marked| marked.elapsed() < FLAG_TTL);
        paths.remove(path).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_consumed_once() {
        let tracker = SyncTracker::new();
        tracker.mark_synced("deck.md");

        assert!(tracker.consume_synced("deck.md"));
        assert!(!tracker.consume_synced("deck.md"));
    }

    #[test]
    fn test_unmarked_path_is_not_synced() {
        let tracker = SyncTracker::new();
        tracker.mark_synced("a.png");
        assert!(!tracker.consume_synced("deck.md"));
        assert!(tracker.consume_synced("a.png"));
    }

    #[test]
    fn test_clones_share_flags() {
        let tracker = SyncTracker::new();
        let watcher_side = tracker.clone();
        tracker.mark_synced("deck.md");
        assert!(watcher_side.consume_synced("deck.md"));
    }

    #[test]
    fn test_expired_flag_is_ignored() {
        let tracker = SyncTracker::new();
        let Some(stale) = Instant::now().checked_sub(FLAG_TTL * 2) else {
            // Clock too close to its origin to backdate; nothing to check.
            return;
        };
        tracker
            .synced_paths
            .lock()
            .unwrap()
            .insert("deck.md".to_string(), stale);
        assert!(!tracker.consume_synced("deck.md"));
    }
}
