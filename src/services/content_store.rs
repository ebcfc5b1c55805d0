//! ContentStore: raw blob bytes on local disk.
//!
//! Blobs live at `{root}/{store}/{pathname}`. Callers address them by the
//! relative path `{store}/{pathname}` returned from [`ContentStore::put`].
//! Writes go straight to the destination file: there is no temp file and no
//! rename, so a failed upload can leave a truncated blob behind, and two
//! writers of one path race with the last one to finish winning.

use super::error::{StoreError, StoreResult};
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;

const MAX_PATHNAME_LEN: usize = 1024;

#[derive(Clone, Debug)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if it does not exist yet.
    pub async fn init(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stream `stream` into `{store}/{pathname}`, creating parent directories.
    ///
    /// Returns the number of bytes written and the blob's relative path.
    pub async fn put<S>(&self, store: &str, pathname: &str, stream: S) -> StoreResult<(u64, String)>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        ensure_store_safe(store)?;
        ensure_pathname_safe(pathname)?;

        let rel_path = format!("{store}/{pathname}");
        let file_path = self.resolve(&rel_path)?;
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(&file_path).await?;
        let mut size: u64 = 0;
        pin_mut!(stream);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            size += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        file.sync_all().await?;

        debug!("wrote {} bytes to {}", size, file_path.display());
        Ok((size, rel_path))
    }

    /// Open a blob for reading.
    pub async fn get(&self, rel_path: &str) -> StoreResult<File> {
        let file_path = self.resolve(rel_path)?;
        File::open(&file_path).await.map_err(|err| match err.kind() {
            ErrorKind::NotFound => StoreError::not_found(format!("blob `{rel_path}`")),
            _ => StoreError::Io(err),
        })
    }

    /// Remove a blob, then prune directories it leaves empty below its store.
    pub async fn del(&self, rel_path: &str) -> StoreResult<()> {
        let file_path = self.resolve(rel_path)?;
        match fs::remove_file(&file_path).await {
            Ok(()) => debug!("removed blob {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::not_found(format!("blob `{rel_path}`")));
            }
            Err(err) => return Err(StoreError::Io(err)),
        }

        if let (Some(parent), Some(store)) = (file_path.parent(), rel_path.split('/').next()) {
            let store_root = self.root.join(store);
            prune_empty_dirs(parent, &store_root).await;
        }
        Ok(())
    }

    fn resolve(&self, rel_path: &str) -> StoreResult<PathBuf> {
        ensure_pathname_safe(rel_path)?;
        Ok(self.root.join(rel_path))
    }
}

/// Reject store ids that could escape the content root or span directories.
pub fn ensure_store_safe(store: &str) -> StoreResult<()> {
    if store.is_empty() || store == "." || store.contains('/') {
        return Err(StoreError::bad_input(format!("invalid store id `{store}`")));
    }
    ensure_pathname_safe(store)
}

/// Reject pathnames that are empty, absolute, carry `.`/`..` or empty
/// segments, or contain control characters.
pub fn ensure_pathname_safe(pathname: &str) -> StoreResult<()> {
    let invalid = || StoreError::bad_input(format!("invalid pathname `{pathname}`"));

    if pathname.is_empty() || pathname.len() > MAX_PATHNAME_LEN {
        return Err(invalid());
    }
    if pathname.starts_with('/') || pathname.ends_with('/') {
        return Err(invalid());
    }
    if pathname.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(invalid());
    }
    if pathname.bytes().any(|b| b.is_ascii_control() || b == b'\\') {
        return Err(invalid());
    }
    Ok(())
}

/// Walk upwards from `start`, removing empty directories, stopping at `stop`.
async fn prune_empty_dirs(start: &Path, stop: &Path) {
    let mut current = start.to_path_buf();
    while current.starts_with(stop) && current != stop {
        match fs::remove_dir(&current).await {
            Ok(()) => match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            },
            Err(err) if err.kind() == ErrorKind::NotFound => break,
            Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
            Err(err) => {
                debug!("failed to prune directory {}: {}", current.display(), err);
                break;
            }
        }
    }
}
