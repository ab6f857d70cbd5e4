use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::fs;

use super::CacheKey;

const TEMP_PREFIX: &str = "tmp_";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache miss: {0}")]
    Miss(String),

    #[error("Cache I/O error: {0}")]
    Io(#[from] io::Error),
}

// Transformed images stored on local disk, one file per key, kept forever
pub struct DiskCache {
    root: PathBuf,
    next_temp: AtomicU64,
}

impl DiskCache {
    /// Opens the cache rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        Ok(Self {
            root,
            next_temp: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    pub async fn exists(&self, key: &CacheKey) -> bool {
        fs::metadata(self.path_for(key))
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    pub async fn read(&self, key: &CacheKey) -> Result<Vec<u8>, CacheError> {
        match fs::read(self.path_for(key)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(CacheError::Miss(key.file_name())),
            Err(e) => Err(CacheError::Io(e)),
        }
    }

    pub async fn write(&self, key: &CacheKey, data: &[u8]) -> Result<(), CacheError> {
        // Write to a temp file first so readers never see a partial entry
        let temp_name = format!(
            "{}{}_{}",
            TEMP_PREFIX,
            std::process::id(),
            self.next_temp.fetch_add(1, Ordering::Relaxed)
        );
        let temp_path = self.root.join(temp_name);

        if let Err(e) = fs::write(&temp_path, data).await {
            fs::remove_file(&temp_path).await.ok();
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, self.path_for(key)).await {
            fs::remove_file(&temp_path).await.ok();
            return Err(e.into());
        }

        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<String>, CacheError> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(TEMP_PREFIX) {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }
}
