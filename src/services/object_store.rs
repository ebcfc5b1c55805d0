//! ObjectStore: put/get/list/delete/copy over a content store and a
//! metadata index.
//!
//! A put writes the blob first and the metadata record second. Neither step
//! is rolled back if the other fails: a failed index write leaves an orphan
//! blob, a failed blob delete leaves nothing pointing at the blob. Both are
//! tolerated rather than prevented.

use super::{
    address::AddressScheme,
    content_store::{ContentStore, ensure_store_safe},
    error::{StoreError, StoreResult},
    headers,
    metadata_index::MetadataIndex,
};
use crate::models::object::{CopyOptions, Object, PutOptions};
use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use std::{io, sync::Arc};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

/// What happened to one URL passed to [`ObjectStore::del`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteStatus {
    Deleted,
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub url: String,
    pub status: DeleteStatus,
}

#[derive(Clone)]
pub struct ObjectStore {
    content: ContentStore,
    index: Arc<MetadataIndex>,
    address: AddressScheme,
}

impl ObjectStore {
    pub fn new(content: ContentStore, index: MetadataIndex, address: AddressScheme) -> Self {
        Self {
            content,
            index: Arc::new(index),
            address,
        }
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn index(&self) -> &MetadataIndex {
        &self.index
    }

    pub fn address(&self) -> &AddressScheme {
        &self.address
    }

    /// Stream a new object into `store`.
    ///
    /// URLs are built from the on-disk pathname (suffixed when requested) so
    /// suffixed uploads never collide; the record keeps the requested name.
    pub async fn put<S>(&self, store: &str, options: PutOptions, stream: S) -> StoreResult<Object>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        ensure_store_safe(store)?;

        let disk_pathname = if options.add_random_suffix {
            let suffixed = self.address.add_random_suffix(&options.pathname);
            debug!("suffixed {} as {}", options.pathname, suffixed);
            suffixed
        } else {
            options.pathname.clone()
        };

        let (size, file_path) = self.content.put(store, &disk_pathname, stream).await?;
        let object = self.record(store, &disk_pathname, options, size, file_path);

        self.index.put(&object.url, &object).await?;

        debug!("stored {} ({} bytes)", object.url, object.size);
        Ok(object)
    }

    fn record(
        &self,
        store: &str,
        disk_pathname: &str,
        options: PutOptions,
        size: u64,
        file_path: String,
    ) -> Object {
        Object {
            url: self.address.public_url(store, disk_pathname),
            download_url: self.address.download_url(store, disk_pathname),
            size,
            uploaded_at: Utc::now(),
            content_type: headers::content_type(options.content_type.as_deref(), &options.pathname),
            content_disposition: headers::content_disposition(&options.pathname),
            cache_control: headers::cache_control(options.cache_control_max_age.as_deref()),
            pathname: options.pathname,
            file_path,
        }
    }

    /// Metadata for the object at exactly `url`.
    pub async fn get(&self, url: &str) -> StoreResult<Object> {
        self.index
            .get(url)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("blob `{url}`")))
    }

    /// Open the blob behind `object` for streaming.
    pub async fn open_blob(&self, object: &Object) -> StoreResult<ReaderStream<tokio::fs::File>> {
        let file = self.content.get(&object.file_path).await?;
        Ok(ReaderStream::new(file))
    }

    /// Delete each URL independently, metadata first, then the blob.
    ///
    /// One failure never stops the rest; every URL gets an outcome. A blob
    /// that is already gone still counts as deleted.
    pub async fn del<I, U>(&self, urls: I) -> Vec<DeleteOutcome>
    where
        I: IntoIterator<Item = U>,
        U: AsRef<str>,
    {
        let mut outcomes = Vec::new();
        for url in urls {
            let url = url.as_ref();
            let status = self.del_one(url).await;
            if let DeleteStatus::Failed(reason) = &status {
                warn!("failed to delete {}: {}", url, reason);
            }
            outcomes.push(DeleteOutcome {
                url: url.to_string(),
                status,
            });
        }
        outcomes
    }

    async fn del_one(&self, url: &str) -> DeleteStatus {
        let object = match self.index.get(url).await {
            Ok(Some(object)) => object,
            Ok(None) => return DeleteStatus::NotFound,
            Err(err) => return DeleteStatus::Failed(err.to_string()),
        };

        if let Err(err) = self.index.del(url).await {
            return DeleteStatus::Failed(err.to_string());
        }

        match self.content.del(&object.file_path).await {
            Ok(()) => DeleteStatus::Deleted,
            Err(err) if err.is_not_found() => {
                debug!("blob {} was already gone", object.file_path);
                DeleteStatus::Deleted
            }
            Err(err) => DeleteStatus::Failed(err.to_string()),
        }
    }

    /// Every object of `store`, in URL order.
    pub async fn list(&self, store: &str) -> StoreResult<Vec<Object>> {
        ensure_store_safe(store)?;
        self.index.list_by_prefix(&self.address.store_prefix(store)).await
    }

    /// Duplicate the object at `from_url` as a new object in `store`.
    ///
    /// The copy gets its own blob and record; nothing is shared with the
    /// source afterwards. Copying an object onto its own location keeps the
    /// bytes and only refreshes the record.
    pub async fn copy(&self, store: &str, from_url: &str, options: CopyOptions) -> StoreResult<Object> {
        if from_url.is_empty() || !from_url.starts_with(&self.address.public_root()) {
            return Err(StoreError::bad_input(format!("invalid copy source `{from_url}`")));
        }

        let source = self.get(from_url).await?;
        let options = PutOptions::from(options);

        // Reading and truncating the same file would leave it empty.
        if !options.add_random_suffix && format!("{store}/{}", options.pathname) == source.file_path {
            self.content.get(&source.file_path).await?;
            debug!("copy of {} onto itself, refreshing record", source.url);

            let pathname = options.pathname.clone();
            let object = self.record(store, &pathname, options, source.size, source.file_path);
            self.index.put(&object.url, &object).await?;
            return Ok(object);
        }

        let stream = self.open_blob(&source).await?;
        debug!("copying {} from {}", options.pathname, source.url);

        self.put(store, options, stream).await
    }

    /// Release the metadata index. Call exactly once, at shutdown.
    pub async fn close(&self) {
        self.index.close().await;
    }
}
