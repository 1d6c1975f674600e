use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::consistency::ConsistencyPolicy;
use crate::error::DeployError;
use crate::naming;

/// Everything one deploy needs, immutable for the life of that deploy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    pub name: String,
    #[serde(default)]
    pub env: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Local root of the site. Required for upload and deploy.
    #[serde(default)]
    pub src_path: Option<PathBuf>,
    #[serde(default = "default_index_document")]
    pub index_document: String,
    #[serde(default)]
    pub error_document: Option<String>,
    /// Suffixes stripped from object keys, e.g. `.html`.
    #[serde(default)]
    pub remove_extensions: BTreeSet<String>,
    /// Object keys served with no-cache headers.
    #[serde(default)]
    pub no_cache: BTreeSet<String>,
    /// Custom S3-compatible endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_max_concurrent_uploads")]
    pub max_concurrent_uploads: usize,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub consistency: ConsistencyPolicy,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_index_document() -> String {
    "index.html".to_string()
}

fn default_max_concurrent_uploads() -> usize {
    16
}

impl DeployConfig {
    /// Minimal config with every optional field at its default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            env: String::new(),
            prefix: String::new(),
            region: default_region(),
            src_path: None,
            index_document: default_index_document(),
            error_document: None,
            remove_extensions: BTreeSet::new(),
            no_cache: BTreeSet::new(),
            endpoint: None,
            max_concurrent_uploads: default_max_concurrent_uploads(),
            timeout_secs: None,
            consistency: ConsistencyPolicy::default(),
        }
    }

    pub fn validate(&self) -> Result<(), DeployError> {
        if self.name.trim().is_empty() {
            return Err(DeployError::InvalidConfig("name must not be empty".into()));
        }
        if self.max_concurrent_uploads == 0 {
            return Err(DeployError::InvalidConfig(
                "max_concurrent_uploads must be at least 1".into(),
            ));
        }
        if self.max_concurrent_uploads > Semaphore::MAX_PERMITS {
            return Err(DeployError::InvalidConfig(format!(
                "max_concurrent_uploads must not exceed {}",
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(())
    }

    pub fn bucket_name(&self) -> String {
        naming::bucket_name(&self.prefix, &self.env, &self.name)
    }

    pub fn source_dir(&self) -> Result<&Path, DeployError> {
        self.src_path
            .as_deref()
            .ok_or_else(|| DeployError::InvalidConfig("src_path is required for upload".into()))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn trace_loaded(&self) {
        info!(
            bucket = %self.bucket_name(),
            region = %self.region,
            src_path = ?self.src_path,
            index_document = %self.index_document,
            no_cache_count = self.no_cache.len(),
            "Loaded DeployConfig"
        );
        debug!(?self, "DeployConfig loaded (full debug)");
    }
}
