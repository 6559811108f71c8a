//! FileSystem trait abstraction for the deck directory.
//!
//! Implementations:
//! - `InMemoryFs` - For testing
//! - `NativeFs` (in deck-cli) - Uses tokio::fs
//!
//! Paths are file names relative to the deck directory; decks are flat, so
//! there are no nested directories to manage.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, FsError>;

/// Directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// File or directory name (not full path)
    pub name: String,
    /// Whether this is a directory
    pub is_dir: bool,
}

/// Filesystem rooted at the deck directory.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read file contents. Missing files are `FsError::NotFound`.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Write file contents, replacing any existing file
    async fn write(&self, path: &str, content: &[u8]) -> Result<()>;

    /// List the entries of the deck directory
    async fn list(&self) -> Result<Vec<FileEntry>>;
}

/// In-memory filesystem for testing
#[derive(Default)]
pub struct InMemoryFs {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
    /// Number of `write` calls per path
    writes: RwLock<BTreeMap<String, usize>>,
}

impl InMemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every file, for asserting that nothing changed.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.files.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// How many times `path` has been written.
    pub fn write_count(&self, path: &str) -> usize {
        let writes = self.writes.read().unwrap_or_else(|e| e.into_inner());
        writes.get(&Self::normalize_path(path)).copied().unwrap_or(0)
    }

    fn normalize_path(path: &str) -> String {
        path.trim_start_matches("./").trim_matches('/').to_string()
    }
}

#[async_trait]
impl FileSystem for InMemoryFs {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = Self::normalize_path(path);
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files.get(&path).cloned().ok_or(FsError::NotFound(path))
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let path = Self::normalize_path(path);
        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.clone(), content.to_vec());
        *self
            .writes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(path)
            .or_insert(0) += 1;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<FileEntry>> {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        Ok(files
            .keys()
            .map(|name| FileEntry {
                name: name.clone(),
                is_dir: false,
            })
            .collect())
    }
}

// Lets tests keep a handle on the filesystem they hand to the orchestrator
#[async_trait]
impl<T: FileSystem + Send + Sync> FileSystem for std::sync::Arc<T> {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        (**self).read(path).await
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        (**self).write(path, content).await
    }

    async fn list(&self) -> Result<Vec<FileEntry>> {
        (**self).list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inmemory_fs_basic_operations() {
        let fs = InMemoryFs::new();

        fs.write("deck.md", b"# One").await.unwrap();
        assert_eq!(fs.read("deck.md").await.unwrap(), b"# One");
        assert_eq!(fs.read("./deck.md").await.unwrap(), b"# One");

        fs.write("deck.md", b"# Two").await.unwrap();
        assert_eq!(fs.read("deck.md").await.unwrap(), b"# Two");
        assert!(matches!(fs.read("missing.md").await, Err(FsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_inmemory_fs_list_and_write_count() {
        let fs = InMemoryFs::new();
        fs.write("b.png", b"b").await.unwrap();
        fs.write("a.png", b"a").await.unwrap();
        fs.write("a.png", b"a2").await.unwrap();

        let names: Vec<String> = fs.list().await.unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
        assert_eq!(fs.write_count("a.png"), 2);
        assert_eq!(fs.write_count("b.png"), 1);
        assert_eq!(fs.write_count("c.png"), 0);
    }
}
