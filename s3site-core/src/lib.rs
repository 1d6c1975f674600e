#![doc = "s3site-core: core logic library for s3site."]

//! This crate holds the deploy logic for publishing a local directory as a static
//! website on an object-storage bucket: bucket naming, the bucket lifecycle
//! (destroy, create, configure), and the directory upload.
//! It talks to storage only through the [`contract::BucketStore`] trait; concrete
//! clients live in the `s3site` crate.
//!
//! # Usage
//! Build a [`config::DeployConfig`], pick a store, and call [`deploy::deploy`] or
//! drive a [`lifecycle::BucketController`] step by step.

pub mod config;
pub mod consistency;
pub mod contract;
pub mod deploy;
pub mod error;
pub mod lifecycle;
pub mod naming;
pub mod upload;

pub use config::DeployConfig;
pub use contract::{BucketStore, StoreError};
pub use deploy::{deploy, DeployPhase, DeployReport};
pub use error::{DeployError, Existence};
pub use lifecycle::BucketController;
