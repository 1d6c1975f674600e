//! Deploy state machine and its report, plus the one-call entrypoint.

use crate::config::DeployConfig;
use crate::contract::BucketStore;
use crate::error::DeployError;
use crate::lifecycle::BucketController;

/// Stages of a deploy. Transitions only move forward; any stage may end in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    Idle,
    Destroying,
    Creating,
    Uploading,
    Done,
    Failed,
}

impl DeployPhase {
    /// The stage that follows on success, `None` for terminal stages.
    pub fn next(self) -> Option<Self> {
        match self {
            DeployPhase::Idle => Some(DeployPhase::Destroying),
            DeployPhase::Destroying => Some(DeployPhase::Creating),
            DeployPhase::Creating => Some(DeployPhase::Uploading),
            DeployPhase::Uploading => Some(DeployPhase::Done),
            DeployPhase::Done | DeployPhase::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

#[derive(Debug, Clone)]
pub struct DeployReport {
    pub bucket: String,
    pub website_url: String,
    /// Keys of every uploaded object, sorted.
    pub uploaded_keys: Vec<String>,
    pub phase: DeployPhase,
}

/// Deploy `config` through `store`: destroy, create, then upload.
pub async fn deploy<S>(store: S, config: DeployConfig) -> Result<DeployReport, DeployError>
where
    S: BucketStore,
{
    BucketController::new(store, config)?.deploy().await
}
