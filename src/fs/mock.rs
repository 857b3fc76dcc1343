// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// In-memory filesystem. Directories exist implicitly as parents of files.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.lock()
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        self.lock().remove(path.as_ref()).is_some()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_parent_dir(&self, path: &Path) -> bool {
        self.lock()
            .keys()
            .any(|file| file.ancestors().skip(1).any(|dir| dir == path))
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let content = self.lock().get(path).cloned();
        match content {
            Some(content) => {
                String::from_utf8(content).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            None if self.is_parent_dir(path) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_parent_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }
}
