use anyhow::{anyhow, Result};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use crate::config::AppConfig;

/// Uploaded files on local disk. Keys are relative paths such as
/// `vacations/3f2a....jpg` and are what the database stores.
#[derive(Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            root: PathBuf::from(&config.media_root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` under `folder` with a fresh name and returns its key.
    pub async fn save(&self, folder: &str, extension: &str, bytes: &[u8]) -> Result<String> {
        let key = format!("{}/{}.{}", folder, Uuid::new_v4().simple(), extension);
        let path = self.resolve(&key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(key)
    }

    pub async fn contains(&self, key: &str) -> bool {
        match self.resolve(key) {
            Ok(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Deletes a stored file. Missing files are not an error.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        if !is_relative_key(key) {
            return Err(anyhow!("invalid media key: {:?}", key));
        }
        Ok(self.root.join(key))
    }
}

/// Only plain relative paths; no `..`, no absolute or drive prefixes.
pub fn is_relative_key(key: &str) -> bool {
    !key.is_empty()
        && Path::new(key)
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}
