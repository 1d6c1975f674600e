//! Directory upload: maps a local tree onto objects, one object per regular file.
//!
//! Siblings of one directory are uploaded concurrently, and every child is awaited
//! before the directory reports back. When several children fail, the reported
//! error is the one from the first failing child in path order, so the outcome does
//! not depend on which request happened to finish first. A semaphore bounds the
//! number of files being read and put at any moment across the whole tree.
//!
//! Files are read fully into memory before upload, which suits static sites but not
//! very large files.

use std::path::{Path, PathBuf};

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tokio::fs;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DeployConfig;
use crate::contract::{BucketStore, CacheOverride, PutObject};
use crate::error::DeployError;
use crate::lifecycle::cancellable;
use crate::naming;

/// Fail with `InvalidConfig` unless `root` exists and is a directory.
pub async fn ensure_source_dir(root: &Path) -> Result<(), DeployError> {
    let metadata = match fs::metadata(root).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DeployError::InvalidConfig(format!(
                "src_path {} does not exist",
                root.display()
            )));
        }
        Err(e) => return Err(DeployError::local_io(root, e)),
    };
    if !metadata.is_dir() {
        return Err(DeployError::InvalidConfig(format!(
            "src_path {} is not a directory",
            root.display()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    /// Keys of every uploaded object, sorted.
    pub keys: Vec<String>,
}

pub struct DirectoryUploader<'a, S> {
    store: &'a S,
    config: &'a DeployConfig,
    bucket: &'a str,
    cancel: &'a CancellationToken,
    root: PathBuf,
    permits: Semaphore,
}

impl<'a, S> DirectoryUploader<'a, S>
where
    S: BucketStore,
{
    pub fn new(
        store: &'a S,
        config: &'a DeployConfig,
        bucket: &'a str,
        cancel: &'a CancellationToken,
    ) -> Result<Self, DeployError> {
        let root = config.source_dir()?.to_path_buf();
        Ok(Self {
            store,
            config,
            bucket,
            cancel,
            root,
            permits: Semaphore::new(config.max_concurrent_uploads),
        })
    }

    /// Upload the whole tree under `src_path`.
    pub async fn upload(&self) -> Result<UploadReport, DeployError> {
        ensure_source_dir(&self.root).await?;

        info!(bucket = %self.bucket, src_path = %self.root.display(), "Uploading directory tree");
        let mut keys = self.upload_directory(&self.root).await?;
        keys.sort();
        info!(bucket = %self.bucket, count = keys.len(), "Upload complete");
        Ok(UploadReport { keys })
    }

    /// Upload every child of `dir` concurrently and return their keys.
    pub fn upload_directory<'b>(
        &'b self,
        dir: &'b Path,
    ) -> BoxFuture<'b, Result<Vec<String>, DeployError>> {
        async move {
            let children = match self.read_children(dir).await {
                Ok(children) => children,
                Err(e) => {
                    error!(dir = %dir.display(), error = %e, "Failed to read directory");
                    return Err(e);
                }
            };
            debug!(dir = %dir.display(), children = children.len(), "Uploading directory");

            let results = join_all(children.iter().map(|child| self.upload_content(child))).await;

            let mut keys = Vec::new();
            let mut first_error = None;
            for result in results {
                match result {
                    Ok(mut child_keys) => keys.append(&mut child_keys),
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(keys),
            }
        }
        .boxed()
    }

    /// Recurse into directories, upload regular files (or symlinks to them).
    pub async fn upload_content(&self, path: &Path) -> Result<Vec<String>, DeployError> {
        let metadata = fs::symlink_metadata(path)
            .await
            .map_err(|e| DeployError::local_io(path, e))?;
        let file_type = metadata.file_type();

        if file_type.is_dir() {
            return self.upload_directory(path).await;
        }
        if file_type.is_file() {
            return Ok(vec![self.upload_file(path).await?]);
        }
        if file_type.is_symlink() {
            let target = fs::metadata(path)
                .await
                .map_err(|e| DeployError::local_io(path, e))?;
            if target.is_file() {
                return Ok(vec![self.upload_file(path).await?]);
            }
        }

        warn!(path = %path.display(), "Unsupported filesystem entry");
        Err(DeployError::UnsupportedEntry {
            path: path.to_path_buf(),
        })
    }

    /// Put a single file under its derived key and return that key.
    pub async fn upload_file(&self, path: &Path) -> Result<String, DeployError> {
        let key = naming::object_key(&self.root, path, &self.config.remove_extensions)
            .ok_or_else(|| DeployError::InvalidKey {
                path: path.to_path_buf(),
            })?;
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        let cache = self
            .config
            .no_cache
            .contains(&key)
            .then(CacheOverride::expired_now);

        let result = cancellable(self.cancel, async {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| DeployError::Cancelled)?;
            let body = fs::read(path)
                .await
                .map_err(|e| DeployError::local_io(path, e))?;
            debug!(
                key = %key,
                bytes = body.len(),
                content_type = %content_type,
                no_cache = cache.is_some(),
                "Putting object"
            );
            let object = PutObject {
                key: key.clone(),
                body,
                content_type,
                cache,
            };
            self.store
                .put_object(self.bucket, object)
                .await
                .map_err(|e| DeployError::store("put_object", self.bucket, e))
        })
        .await;

        match result {
            Ok(()) => {
                debug!(bucket = %self.bucket, key = %key, "Uploaded object");
                Ok(key)
            }
            Err(e) => {
                error!(key = %key, path = %path.display(), error = %e, "Failed to upload file");
                Err(e)
            }
        }
    }

    async fn read_children(&self, dir: &Path) -> Result<Vec<PathBuf>, DeployError> {
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| DeployError::local_io(dir, e))?;
        let mut children = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DeployError::local_io(dir, e))?
        {
            children.push(entry.path());
        }
        children.sort();
        Ok(children)
    }
}
