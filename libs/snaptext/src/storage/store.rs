use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::filename::secure_filename;

/// Flat directory holding `{base}.{ext}` images and their `{base}.txt` siblings.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save_image(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Persist recognized text next to the image. Text may be empty.
    pub fn write_artifact(&self, name: &str, text: &str) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        fs::write(&path, text.as_bytes())?;
        Ok(path)
    }

    /// Resolve a client-supplied name to a file inside the store. Returns
    /// `None` for traversal attempts and for files that do not exist.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || secure_filename(name) != name {
            return None;
        }
        let path = self.root.join(name);
        path.is_file().then_some(path)
    }
}
