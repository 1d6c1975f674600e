///
/// This module implements the CLI interface for s3site: command parsing, argument
/// handling and user-visible output.
///
/// All deploy logic (bucket lifecycle, directory upload) lives in the [`s3site-core`]
/// crate. This module is strictly glue: load config, build the S3 store, call the
/// controller, report the outcome.
///
/// ## How To Use
/// - For command-line users: use the installed `s3site` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`s3site-core`]: ../../s3site-core/
/// [`Cli`]: struct.Cli.html
/// [`run`]: fn.run.html
use crate::load_config::load_config;
use crate::storage::S3Store;
use anyhow::Result;
use clap::{Parser, Subcommand};
use s3site_core::{BucketController, Existence};
use std::path::PathBuf;

/// CLI for s3site: publish a local folder as a static website on S3.
#[derive(Parser)]
#[clap(
    name = "s3site",
    version,
    about = "Deploy a local directory as a public static website on an S3 bucket"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Tear down the bucket if present, recreate it as a website, and upload the site
    Deploy {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Override the configured source directory
        #[clap(long)]
        src_path: Option<PathBuf>,
    },
    /// Delete every object and then the bucket itself
    Destroy {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Create the bucket, enable website hosting and make it publicly readable
    Create {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Upload the source directory into an existing bucket
    Upload {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Override the configured source directory
        #[clap(long)]
        src_path: Option<PathBuf>,
    },
    /// Report whether the bucket exists
    Status {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// List the keys currently stored in the bucket
    List {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Deploy { .. } => "deploy",
            Commands::Destroy { .. } => "destroy",
            Commands::Create { .. } => "create",
            Commands::Upload { .. } => "upload",
            Commands::Status { .. } => "status",
            Commands::List { .. } => "list",
        }
    }

    fn config_path(&self) -> &PathBuf {
        match self {
            Commands::Deploy { config, .. }
            | Commands::Destroy { config }
            | Commands::Create { config }
            | Commands::Upload { config, .. }
            | Commands::Status { config }
            | Commands::List { config } => config,
        }
    }

    fn src_override(&self) -> Option<&PathBuf> {
        match self {
            Commands::Deploy { src_path, .. } | Commands::Upload { src_path, .. } => {
                src_path.as_ref()
            }
            _ => None,
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let command = cli.command.name();
    let mut loaded = load_config(cli.command.config_path())?;
    if let Some(src) = cli.command.src_override() {
        tracing::info!(command, src_path = %src.display(), "Overriding configured src_path");
        loaded.deploy.src_path = Some(src.clone());
    }

    let store = S3Store::connect(&loaded.deploy, loaded.credentials.take()).await;
    let controller = BucketController::new(store, loaded.deploy)?;
    tracing::info!(command, bucket = %controller.bucket_name(), "Running command");

    let result = match cli.command {
        Commands::Deploy { .. } => controller.deploy().await.map(|report| {
            println!(
                "Deployed {} objects to {}",
                report.uploaded_keys.len(),
                report.bucket
            );
            println!("{}", report.website_url);
        }),
        Commands::Destroy { .. } => controller
            .destroy()
            .await
            .map(|()| println!("Destroyed {}", controller.bucket_name())),
        Commands::Create { .. } => controller.create().await.map(|()| {
            println!("Created {}", controller.bucket_name());
            println!("{}", controller.website_url());
        }),
        Commands::Upload { .. } => controller.upload().await.map(|report| {
            println!(
                "Uploaded {} objects to {}",
                report.keys.len(),
                controller.bucket_name()
            );
        }),
        Commands::Status { .. } => controller.verify_existence().await.map(|existence| {
            match existence {
                Existence::Exists => println!("{}: exists", controller.bucket_name()),
                Existence::NotFound => println!("{}: not found", controller.bucket_name()),
            }
        }),
        Commands::List { .. } => controller.list_contents().await.map(|contents| {
            for object in contents {
                println!("{}", object.key);
            }
        }),
    };

    match result {
        Ok(()) => {
            tracing::info!(command, "Command complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!(command, error = %e, "Command failed");
            Err(anyhow::Error::new(e))
        }
    }
}
