/// `load_config` module: Loads a static YAML site config and injects secrets from the environment.
///
/// This module is the only place where untrusted YAML is parsed into the core's
/// strongly-typed [`DeployConfig`].
///
/// # Responsibilities
/// - Parse the user-supplied YAML file into a [`DeployConfig`]
/// - Resolve a relative `src_path` against the directory holding the config file
/// - Validate the result so the CLI fails before any remote call is made
/// - Pick up AWS credentials from the environment (see [`Credentials::from_env`]);
///   secrets never live in the YAML file
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich diagnostics, and are
/// surfaced at the CLI boundary.
use anyhow::{Context, Result};
use s3site_core::DeployConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::storage::Credentials;

#[derive(Debug)]
pub struct CliConfig {
    pub deploy: DeployConfig,
    pub credentials: Option<Credentials>,
}

/// Loads a static YAML config file (no secrets) and injects credentials from the env.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let mut deploy: DeployConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if let Some(src) = deploy.src_path.take() {
        deploy.src_path = Some(resolve_relative(path_ref, src));
    }

    deploy
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path_ref.display()))?;
    deploy.trace_loaded();

    Ok(CliConfig {
        deploy,
        credentials: Credentials::from_env(),
    })
}

/// Interpret `src` relative to the directory that holds the config file.
fn resolve_relative(config_path: &Path, src: PathBuf) -> PathBuf {
    if src.is_absolute() {
        return src;
    }
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(src),
        _ => src,
    }
}
