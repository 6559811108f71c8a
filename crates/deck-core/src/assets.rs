//! Asset set reconciliation.
//!
//! Matches the asset files present in the deck directory against the deck's
//! remote asset records by filename.

use crate::model::AssetRecord;
use std::collections::{BTreeMap, BTreeSet};

/// Extensions recognized as deck assets, with their content types.
const ASSET_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("ico", "image/x-icon"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("avif", "image/avif"),
];

/// Result of matching local files against remote records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetPlan {
    /// Local files with no remote record of the same name
    pub to_upload: BTreeSet<String>,
    /// Remote records with no local file of the same name
    pub remote_only: Vec<AssetRecord>,
}

impl AssetPlan {
    pub fn is_empty(&self) -> bool {
        self.to_upload.is_empty() && self.remote_only.is_empty()
    }
}

/// Compute which local files need uploading and which remote records have no
/// local counterpart.
///
/// Remote records are keyed by filename; if the remote set carries the same
/// filename twice only the first record is considered. Nothing here deletes
/// anything: what happens to `remote_only` is up to the caller.
pub fn reconcile_assets(local: &BTreeSet<String>, remote: &[AssetRecord]) -> AssetPlan {
    let mut by_name: BTreeMap<&str, &AssetRecord> = BTreeMap::new();
    for asset in remote {
        by_name.entry(asset.filename.as_str()).or_insert(asset);
    }

    let to_upload = local
        .iter()
        .filter(|name| !by_name.contains_key(name.as_str()))
        .cloned()
        .collect();

    let remote_only = by_name
        .values()
        .filter(|asset| !local.contains(&asset.filename))
        .map(|asset| (*asset).clone())
        .collect();

    AssetPlan {
        to_upload,
        remote_only,
    }
}

/// Content type for a deck asset, or `None` if the file is not an asset.
pub fn content_type(filename: &str) -> Option<&'static str> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    let ext = ext.to_ascii_lowercase();
    ASSET_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// Whether a directory entry should be synced as a deck asset.
pub fn is_asset_file(filename: &str) -> bool {
    !filename.starts_with('.') && content_type(filename).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn remote(items: &[&str]) -> Vec<AssetRecord> {
        items
            .iter()
            .map(|name| AssetRecord::uploaded(*name, format!("https://cdn.example/{}", name)))
            .collect()
    }

    #[test]
    fn test_upload_and_remote_only() {
        let plan = reconcile_assets(&names(&["a.png", "b.png"]), &remote(&["b.png", "c.png"]));

        assert_eq!(plan.to_upload, names(&["a.png"]));
        assert_eq!(plan.remote_only.len(), 1);
        assert_eq!(plan.remote_only[0].filename, "c.png");
    }

    #[test]
    fn test_in_sync_sets_produce_empty_plan() {
        let plan = reconcile_assets(&names(&["a.png"]), &remote(&["a.png"]));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_empty_sides() {
        let plan = reconcile_assets(&BTreeSet::new(), &remote(&["a.png"]));
        assert!(plan.to_upload.is_empty());
        assert_eq!(plan.remote_only.len(), 1);

        let plan = reconcile_assets(&names(&["a.png"]), &[]);
        assert_eq!(plan.to_upload, names(&["a.png"]));
        assert!(plan.remote_only.is_empty());
    }

    #[test]
    fn test_duplicate_remote_filenames_reported_once() {
        let mut records = remote(&["c.png"]);
        records.push(AssetRecord::uploaded("c.png", "https://cdn.example/other"));
        let plan = reconcile_assets(&BTreeSet::new(), &records);

        assert_eq!(plan.remote_only.len(), 1);
        assert_eq!(plan.remote_only[0].url, "https://cdn.example/c.png");
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("photo.JPG"), Some("image/jpeg"));
        assert_eq!(content_type("diagram.svg"), Some("image/svg+xml"));
        assert_eq!(content_type("deck.md"), None);
        assert_eq!(content_type("png"), None);
        assert_eq!(content_type(".png"), None);
    }

    #[test]
    fn test_is_asset_file() {
        assert!(is_asset_file("logo.png"));
        assert!(!is_asset_file("deck.md"));
        assert!(!is_asset_file(".deck.json"));
        assert!(!is_asset_file(".hidden.png"));
    }
}
