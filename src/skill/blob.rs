// src/skill/blob.rs
// =============================================================================
// Blob storage for skill files, keyed by skill id + relative path.
//
// FsBlobStore keeps everything under <data_dir>/skills/<skill id>/<path>.
// Paths come from remote repositories, so each one is checked before use:
// absolute paths and ".." components are refused, which keeps every write
// inside the skill's own directory.
//
// Rust concepts:
// - async-trait: Lets a trait declare async fns and be used as a trait object
// - std::path::Component: Walks a path piece by piece without touching disk
// =============================================================================

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::error::{Result, SyncError};

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Writes (or overwrites) one file
    async fn put(&self, skill_id: &str, path: &str, bytes: &[u8]) -> Result<()>;

    /// Reads one file, None if it does not exist
    async fn get(&self, skill_id: &str, path: &str) -> Result<Option<Vec<u8>>>;

    /// Every stored relative path of a skill, sorted
    async fn list(&self, skill_id: &str) -> Result<Vec<String>>;

    async fn delete_all(&self, skill_id: &str) -> Result<()>;
}

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join("skills"),
        }
    }

    fn skill_dir(&self, skill_id: &str) -> Result<PathBuf> {
        Ok(self.root.join(checked_relative(skill_id)?))
    }

    fn file_path(&self, skill_id: &str, path: &str) -> Result<PathBuf> {
        Ok(self.skill_dir(skill_id)?.join(checked_relative(path)?))
    }
}

// Accepts only plain relative paths made of normal components
fn checked_relative(path: &str) -> Result<&Path> {
    let candidate = Path::new(path);
    let mut components = candidate.components().peekable();

    if components.peek().is_none() {
        return Err(SyncError::InvalidPath(path.to_string()));
    }
    for component in components {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(SyncError::InvalidPath(path.to_string())),
        }
    }

    Ok(candidate)
}

#[async_trait]
impl BlobStorage for FsBlobStore {
    async fn put(&self, skill_id: &str, path: &str, bytes: &[u8]) -> Result<()> {
        let target = self.file_path(skill_id, path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, bytes).await?;
        Ok(())
    }

    async fn get(&self, skill_id: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let target = self.file_path(skill_id, path)?;
        match fs::read(&target).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            // Reading a directory is "no such file" as far as callers care
            Err(_) if target.is_dir() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, skill_id: &str) -> Result<Vec<String>> {
        let root = self.skill_dir(skill_id)?;
        let mut files = Vec::new();
        let mut pending = vec![root.clone()];

        // Iterative walk; a skill directory is small and shallow
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&root) {
                    let parts: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    files.push(parts.join("/"));
                }
            }
        }

        files.sort();
        Ok(files)
    }

    async fn delete_all(&self, skill_id: &str) -> Result<()> {
        let dir = self.skill_dir(skill_id)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
