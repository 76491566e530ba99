//! On-disk store location / 索引目录管理
//!
//! A build never writes into the live directory. It writes a sibling staging
//! directory and promotes it by rename once committed, so an interrupted build
//! leaves the previous store readable.

use std::path::{Path, PathBuf};

use tantivy::directory::MmapDirectory;
use tantivy::Index;

use crate::error::Result;

/// Whether a committed store exists at `path` / 检查索引是否存在
pub fn store_exists(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    match MmapDirectory::open(path) {
        Ok(dir) => Index::exists(&dir).unwrap_or(false),
        Err(_) => false,
    }
}

/// A build-in-progress directory next to its destination / 构建中的临时目录
#[derive(Debug)]
pub struct StagingStore {
    staging: PathBuf,
    destination: PathBuf,
}

impl StagingStore {
    /// Create an empty staging directory beside `destination` / 创建临时目录
    pub fn create(destination: &Path) -> Result<Self> {
        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let staging = parent.join(format!(
            ".{}.staging-{}",
            store_name(destination),
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::create_dir_all(&staging)?;

        tracing::debug!("Created staging store at {}", staging.display());
        Ok(Self {
            staging,
            destination: destination.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.staging
    }

    /// Replace the destination with the staging directory / 用新索引替换旧索引
    ///
    /// The previous store is moved aside first and put back if the final
    /// rename fails.
    pub fn promote(self) -> Result<()> {
        let previous = if self.destination.exists() {
            let aside = self.destination.with_file_name(format!(
                ".{}.previous-{}",
                store_name(&self.destination),
                uuid::Uuid::new_v4().simple()
            ));
            std::fs::rename(&self.destination, &aside)?;
            Some(aside)
        } else {
            None
        };

        if let Err(e) = std::fs::rename(&self.staging, &self.destination) {
            if let Some(aside) = &previous {
                if let Err(restore) = std::fs::rename(aside, &self.destination) {
                    tracing::error!(
                        "Failed to restore previous store from {}: {}",
                        aside.display(),
                        restore
                    );
                }
            }
            self.discard();
            return Err(e.into());
        }

        if let Some(aside) = previous {
            if let Err(e) = std::fs::remove_dir_all(&aside) {
                tracing::warn!("Failed to remove old store {}: {}", aside.display(), e);
            }
        }

        tracing::info!("Promoted new store to {}", self.destination.display());
        Ok(())
    }

    /// Throw the staging directory away / 丢弃临时目录
    pub fn discard(self) {
        if let Err(e) = std::fs::remove_dir_all(&self.staging) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    "Failed to remove staging store {}: {}",
                    self.staging.display(),
                    e
                );
            }
        }
    }
}

fn store_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string())
}
