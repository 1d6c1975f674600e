pub mod cli;
pub mod load_config;
pub mod storage;

pub use cli::{run, Cli, Commands};
pub use s3site_core::{DeployConfig, DeployError, DeployReport};
pub use storage::{Credentials, S3Store};

/// Deploy `config` to AWS S3: destroy the bucket if it exists, recreate it as a
/// public website, then upload `src_path`.
///
/// `credentials` are handed to the S3 client as-is; `None` uses the AWS default chain.
pub async fn deploy(
    config: DeployConfig,
    credentials: Option<Credentials>,
) -> Result<DeployReport, DeployError> {
    let store = S3Store::connect(&config, credentials).await;
    s3site_core::deploy(store, config).await
}
