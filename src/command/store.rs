//! Real filesystem command store

use super::{CommandStore, ContentSource, FileCommand, StoreError};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Applies commands to the real file tree.
pub struct FsStore;

impl FsStore {
    async fn ensure_parent(path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl CommandStore for FsStore {
    async fn apply(&self, command: FileCommand) -> Result<(), StoreError> {
        debug!(%command, "applying");
        match command {
            FileCommand::Create { new_path, new_data } => {
                Self::ensure_parent(&new_path).await?;
                fs::write(&new_path, new_data).await.map_err(io_err(&new_path))
            }
            FileCommand::Update {
                old_path,
                old_data,
                new_data,
            } => {
                // Staleness check: unreachable under single-writer-per-item
                // dispatch, but a mutated-underfoot file must not be clobbered.
                let current = fs::read_to_string(&old_path)
                    .await
                    .map_err(io_err(&old_path))?;
                if current != old_data {
                    return Err(StoreError::StaleUpdate { path: old_path });
                }
                fs::write(&old_path, new_data).await.map_err(io_err(&old_path))
            }
            FileCommand::Delete { old_path } => {
                fs::remove_file(&old_path).await.map_err(io_err(&old_path))
            }
            FileCommand::Move { old_path, new_path } => {
                Self::ensure_parent(&new_path).await?;
                fs::rename(&old_path, &new_path)
                    .await
                    .map_err(io_err(&old_path))
            }
            FileCommand::Copy { old_path, new_path } => {
                Self::ensure_parent(&new_path).await?;
                fs::copy(&old_path, &new_path)
                    .await
                    .map(|_| ())
                    .map_err(io_err(&old_path))
            }
        }
    }
}

#[async_trait]
impl ContentSource for FsStore {
    async fn read(&self, path: &Path) -> std::io::Result<String> {
        fs::read_to_string(path).await
    }
}
