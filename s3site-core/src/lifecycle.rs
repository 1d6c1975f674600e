//! Bucket lifecycle: verify, list, empty, delete, create, configure, and the
//! composites (`destroy`, `create`, `deploy`) built from them.
//!
//! # Responsibilities
//! - Owns the canonical bucket name, computed once from the config.
//! - Runs composite steps strictly in sequence; the first failure aborts the rest
//!   and is returned as-is. Nothing is rolled back.
//! - Treats a missing bucket as an expected outcome of existence checks, so that
//!   destroying a bucket that does not exist succeeds.
//! - Waits for bucket creation/deletion to become visible according to the
//!   configured [`ConsistencyPolicy`](crate::consistency::ConsistencyPolicy).
//! - Races every remote call against a cancellation token.
//!
//! The remote service is the only source of truth: nothing about the bucket is
//! cached between calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DeployConfig;
use crate::contract::{BucketStore, ObjectMetadata, WebsiteConfig};
use crate::deploy::{DeployPhase, DeployReport};
use crate::error::{DeployError, Existence};
use crate::naming;
use crate::upload::{self, DirectoryUploader, UploadReport};

/// Largest key count a single bulk delete accepts.
pub const MAX_DELETE_BATCH: usize = 1000;

/// Resolve `fut`, or fail with [`DeployError::Cancelled`] once `token` fires.
pub(crate) async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T, DeployError>
where
    F: Future<Output = Result<T, DeployError>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(DeployError::Cancelled),
        res = fut => res,
    }
}

/// Drives one bucket through its lifecycle against a [`BucketStore`].
pub struct BucketController<S> {
    store: S,
    config: DeployConfig,
    bucket: String,
    cancel: CancellationToken,
}

impl<S> BucketController<S>
where
    S: BucketStore,
{
    pub fn new(store: S, config: DeployConfig) -> Result<Self, DeployError> {
        config.validate()?;
        let bucket = config.bucket_name();
        info!(bucket = %bucket, "Bucket controller initialised");
        Ok(Self {
            store,
            config,
            bucket,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an externally owned token, e.g. one tied to a shutdown signal.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn website_url(&self) -> String {
        naming::website_url(&self.bucket, &self.config.region)
    }

    pub async fn verify_existence(&self) -> Result<Existence, DeployError> {
        let probe = async {
            match self.store.head_bucket(&self.bucket).await {
                Ok(()) => Ok(Existence::Exists),
                Err(err) => match DeployError::store("head_bucket", &self.bucket, err) {
                    DeployError::NotFound { .. } => Ok(Existence::NotFound),
                    other => Err(other),
                },
            }
        };
        let existence = cancellable(&self.cancel, probe).await?;
        debug!(bucket = %self.bucket, %existence, "Verified bucket existence");
        Ok(existence)
    }

    /// All objects in the bucket, following continuation tokens to the end.
    pub async fn list_contents(&self) -> Result<Vec<ObjectMetadata>, DeployError> {
        let mut contents = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = cancellable(&self.cancel, async {
                self.store
                    .list_objects(&self.bucket, token.take())
                    .await
                    .map_err(|e| DeployError::store("list_objects", &self.bucket, e))
            })
            .await?;
            contents.extend(page.objects);
            match page.next_continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        info!(bucket = %self.bucket, count = contents.len(), "Listed bucket contents");
        Ok(contents)
    }

    /// Bulk-delete `contents`; no request at all when it is empty.
    pub async fn remove_contents(&self, contents: &[ObjectMetadata]) -> Result<(), DeployError> {
        if contents.is_empty() {
            debug!(bucket = %self.bucket, "Bucket already empty, nothing to remove");
            return Ok(());
        }
        for batch in contents.chunks(MAX_DELETE_BATCH) {
            let keys: Vec<String> = batch.iter().map(|object| object.key.clone()).collect();
            let count = keys.len();
            cancellable(&self.cancel, async {
                self.store
                    .delete_objects(&self.bucket, keys)
                    .await
                    .map_err(|e| DeployError::store("delete_objects", &self.bucket, e))
            })
            .await?;
            debug!(bucket = %self.bucket, count, "Deleted batch of objects");
        }
        info!(bucket = %self.bucket, count = contents.len(), "Removed bucket contents");
        Ok(())
    }

    pub async fn remove_bucket(&self) -> Result<(), DeployError> {
        cancellable(&self.cancel, async {
            self.store
                .delete_bucket(&self.bucket)
                .await
                .map_err(|e| DeployError::store("delete_bucket", &self.bucket, e))
        })
        .await?;
        info!(bucket = %self.bucket, "Deleted bucket");
        Ok(())
    }

    /// Full teardown. A bucket that does not exist is already destroyed.
    pub async fn destroy(&self) -> Result<(), DeployError> {
        if self.verify_existence().await? == Existence::NotFound {
            info!(bucket = %self.bucket, "Bucket does not exist, nothing to destroy");
            return Ok(());
        }
        match self.teardown().await {
            Err(DeployError::NotFound { .. }) => {
                info!(bucket = %self.bucket, "Bucket vanished during destroy");
                Ok(())
            }
            Err(e) => Err(e),
            Ok(()) => {
                info!(bucket = %self.bucket, "Destroyed bucket");
                Ok(())
            }
        }
    }

    async fn teardown(&self) -> Result<(), DeployError> {
        let contents = self.list_contents().await?;
        self.remove_contents(&contents).await?;
        self.remove_bucket().await?;
        self.await_existence(Existence::NotFound).await
    }

    pub async fn create_bucket(&self) -> Result<(), DeployError> {
        cancellable(&self.cancel, async {
            self.store
                .create_bucket(&self.bucket)
                .await
                .map_err(|e| DeployError::store("create_bucket", &self.bucket, e))
        })
        .await?;
        info!(bucket = %self.bucket, region = %self.config.region, "Created bucket");
        Ok(())
    }

    pub async fn make_website(&self) -> Result<(), DeployError> {
        let website = WebsiteConfig {
            index_document: self.config.index_document.clone(),
            error_document: self.config.error_document.clone(),
        };
        cancellable(&self.cancel, async {
            self.store
                .put_bucket_website(&self.bucket, website)
                .await
                .map_err(|e| DeployError::store("put_bucket_website", &self.bucket, e))
        })
        .await?;
        info!(
            bucket = %self.bucket,
            index_document = %self.config.index_document,
            "Configured website hosting"
        );
        Ok(())
    }

    /// Allow public policies on the bucket, then grant anonymous read on all objects.
    pub async fn make_public(&self) -> Result<(), DeployError> {
        let policy = naming::public_read_policy(&self.bucket).to_string();
        cancellable(&self.cancel, async {
            self.store
                .remove_public_access_block(&self.bucket)
                .await
                .map_err(|e| DeployError::store("remove_public_access_block", &self.bucket, e))?;
            self.store
                .put_bucket_policy(&self.bucket, policy)
                .await
                .map_err(|e| DeployError::store("put_bucket_policy", &self.bucket, e))
        })
        .await?;
        info!(bucket = %self.bucket, "Installed public read policy");
        Ok(())
    }

    pub async fn create(&self) -> Result<(), DeployError> {
        self.create_bucket().await?;
        self.await_existence(Existence::Exists).await?;
        self.make_website().await?;
        self.make_public().await?;
        Ok(())
    }

    pub async fn upload(&self) -> Result<UploadReport, DeployError> {
        DirectoryUploader::new(&self.store, &self.config, &self.bucket, &self.cancel)?
            .upload()
            .await
    }

    /// `destroy` → `create` → `upload`, bounded by the configured timeout.
    pub async fn deploy(&self) -> Result<DeployReport, DeployError> {
        let run = self.run_deploy();
        match self.config.timeout() {
            Some(limit) => {
                tokio::select! {
                    res = run => res,
                    () = tokio::time::sleep(limit) => {
                        self.cancel.cancel();
                        error!(
                            bucket = %self.bucket,
                            ?limit,
                            "Deploy timed out, cancelled in-flight requests"
                        );
                        Err(DeployError::TimedOut(limit))
                    }
                }
            }
            None => run.await,
        }
    }

    async fn run_deploy(&self) -> Result<DeployReport, DeployError> {
        info!(bucket = %self.bucket, "Starting deploy");
        // a bad source must fail before the live bucket is touched
        let source = async { upload::ensure_source_dir(self.config.source_dir()?).await };
        if let Err(e) = source.await {
            return Err(self.abort(DeployPhase::Idle, e));
        }

        let mut phase = self.enter(DeployPhase::Idle, DeployPhase::Destroying);
        if let Err(e) = self.destroy().await {
            return Err(self.abort(phase, e));
        }

        phase = self.enter(phase, DeployPhase::Creating);
        if let Err(e) = self.create().await {
            return Err(self.abort(phase, e));
        }

        phase = self.enter(phase, DeployPhase::Uploading);
        let upload = match self.upload().await {
            Ok(report) => report,
            Err(e) => return Err(self.abort(phase, e)),
        };

        phase = self.enter(phase, DeployPhase::Done);
        let report = DeployReport {
            bucket: self.bucket.clone(),
            website_url: self.website_url(),
            uploaded_keys: upload.keys,
            phase,
        };
        info!(
            bucket = %report.bucket,
            website_url = %report.website_url,
            uploaded = report.uploaded_keys.len(),
            "Deploy complete"
        );
        Ok(report)
    }

    fn enter(&self, from: DeployPhase, to: DeployPhase) -> DeployPhase {
        debug_assert_eq!(from.next(), Some(to), "illegal deploy transition");
        info!(bucket = %self.bucket, ?from, ?to, "Deploy phase transition");
        to
    }

    fn abort(&self, phase: DeployPhase, err: DeployError) -> DeployError {
        error!(
            bucket = %self.bucket,
            failed_in = ?phase,
            to = ?DeployPhase::Failed,
            error = %err,
            "Deploy aborted"
        );
        err
    }

    /// Poll the existence probe until it reports `expected`, backing off between probes.
    async fn await_existence(&self, expected: Existence) -> Result<(), DeployError> {
        let policy = self.config.consistency;
        if !policy.enabled {
            return Ok(());
        }
        let mut waited = Duration::ZERO;
        let mut delays = policy.delays();
        loop {
            if self.verify_existence().await? == expected {
                if !waited.is_zero() {
                    debug!(bucket = %self.bucket, %expected, ?waited, "Bucket state converged");
                }
                return Ok(());
            }
            let Some(delay) = delays.next() else {
                warn!(bucket = %self.bucket, %expected, ?waited, "Bucket state did not converge");
                return Err(DeployError::NotConverged {
                    bucket: self.bucket.clone(),
                    expected,
                    waited,
                });
            };
            cancellable(&self.cancel, async {
                tokio::time::sleep(delay).await;
                Ok(())
            })
            .await?;
            waited += delay;
        }
    }
}
