//! Native filesystem implementation using tokio::fs.

use async_trait::async_trait;
use deck_core::fs::{FileEntry, FileSystem, FsError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Filesystem rooted at a deck directory
pub struct NativeFs {
    base_path: PathBuf,
}

impl NativeFs {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

fn io_error(path: &str, e: std::io::Error) -> FsError {
    if e.kind() == ErrorKind::NotFound {
        FsError::NotFound(path.to_string())
    } else {
        FsError::Io(format!("{}: {}", path, e))
    }
}

#[async_trait]
impl FileSystem for NativeFs {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        fs::read(self.full_path(path))
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(path, e))?;
        }

        fs::write(&full_path, content)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn list(&self) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::new();

        let mut dir = fs::read_dir(&self.base_path)
            .await
            .map_err(|e| io_error(".", e))?;

        while let Some(entry) = dir.next_entry().await.map_err(|e| io_error(".", e))? {
            let name = entry.file_name().to_string_lossy().to_string();
            let file_type = entry.file_type().await.map_err(|e| io_error(&name, e))?;

            entries.push(FileEntry {
                name,
                is_dir: file_type.is_dir(),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_native_fs_operations() {
        let dir = TempDir::new().unwrap();
        let fs = NativeFs::new(dir.path().to_path_buf());

        fs.write("deck.md", b"# One").await.unwrap();
        fs.write("logo.png", b"PNG").await.unwrap();
        std::fs::create_dir(dir.path().join("drafts")).unwrap();

        assert_eq!(fs.read("deck.md").await.unwrap(), b"# One");
        assert_eq!(fs.read("logo.png").await.unwrap(), b"PNG");

        let entries = fs.list().await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["deck.md", "drafts", "logo.png"]);
        assert!(entries[1].is_dir);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let fs = NativeFs::new(dir.path().to_path_buf());

        assert!(matches!(fs.read("deck.md").await, Err(FsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sidecar_round_trip_on_disk() {
        let dir = TempDir::new().unwrap();
        let fs = NativeFs::new(dir.path().to_path_buf());
        let deck = deck_core::DeckRecord::draft("Talk", "", true);

        deck_core::local::save_deck(&fs, &deck).await.unwrap();

        assert!(dir.path().join(deck_core::SIDECAR_FILE).exists());
        assert_eq!(deck_core::local::load_deck(&fs).await.unwrap(), Some(deck));
    }
}
