#![doc = "AWS S3 implementation of the core storage contract."]
//
//! # S3 storage (CLI <-> Core)
//!
//! This module wires the [`BucketStore`] trait from `s3site-core` to the AWS SDK, and
//! provides the [`S3Store`] used by the CLI and by [`crate::deploy`].
//!
//! ## Client Usage
//!
//! - Build with [`S3Store::connect`] from a `DeployConfig` (region, optional custom
//!   endpoint) and optional explicit [`Credentials`]. Without explicit credentials the
//!   AWS default provider chain is used.
//! - Missing buckets (HTTP 404, `NoSuchBucket`, `NotFound`) are reported as
//!   [`StoreError::NotFound`]; every other SDK failure is [`StoreError::Remote`].

use std::env;
use std::time::SystemTime;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Error;
use aws_sdk_s3::primitives::{ByteStream, DateTime};
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ErrorDocument, IndexDocument,
    ObjectIdentifier, WebsiteConfiguration,
};
use aws_sdk_s3::Client;
use s3site_core::contract::{
    BucketStore, ObjectMetadata, ObjectPage, PutObject, StoreError, WebsiteConfig,
};
use s3site_core::DeployConfig;

/// Static credentials handed to the storage client. Opaque to the deploy logic.
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .finish()
    }
}

impl Credentials {
    /// Read `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`.
    /// Returns `None` unless both the key id and secret are set.
    pub fn from_env() -> Option<Self> {
        match (env::var("AWS_ACCESS_KEY_ID"), env::var("AWS_SECRET_ACCESS_KEY")) {
            (Ok(access_key_id), Ok(secret_access_key)) => {
                tracing::info!("Static AWS credentials found in environment");
                Some(Credentials {
                    access_key_id,
                    secret_access_key,
                    session_token: env::var("AWS_SESSION_TOKEN").ok(),
                })
            }
            _ => {
                tracing::info!("No static AWS credentials in environment, using default chain");
                None
            }
        }
    }
}

pub struct S3Store {
    client: Client,
    region: String,
}

impl S3Store {
    pub async fn connect(config: &DeployConfig, credentials: Option<Credentials>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(creds) = credentials {
            loader = loader.credentials_provider(aws_credential_types::Credentials::new(
                creds.access_key_id,
                creds.secret_access_key,
                creds.session_token,
                None,
                "s3site",
            ));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        tracing::info!(
            region = %config.region,
            endpoint = ?config.endpoint,
            "Initialised S3 client"
        );
        S3Store {
            client: Client::from_conf(builder.build()),
            region: config.region.clone(),
        }
    }

    pub fn from_client(client: Client, region: impl Into<String>) -> Self {
        S3Store {
            client,
            region: region.into(),
        }
    }
}

/// 404 responses become `NotFound`; everything else is kept as the remote error.
fn classify<E>(err: SdkError<E>) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    classify_missing(err, |_| false)
}

/// Like [`classify`], also treating service errors matched by `missing` as `NotFound`.
fn classify_missing<E>(err: SdkError<E>, missing: impl Fn(&E) -> bool) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    if err.as_service_error().is_some_and(&missing) {
        return StoreError::NotFound;
    }
    let status = err.raw_response().map(|response| response.status().as_u16());
    if status == Some(404) {
        StoreError::NotFound
    } else {
        StoreError::remote(err)
    }
}

#[async_trait]
impl BucketStore for S3Store {
    async fn head_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|err| classify_missing(err, HeadBucketError::is_not_found))?;
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, StoreError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|err| classify_missing(err, ListObjectsV2Error::is_no_such_bucket))?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                object.key().map(|key| ObjectMetadata {
                    key: key.to_string(),
                    size: object.size().unwrap_or(0),
                    e_tag: object.e_tag().map(str::to_string),
                    last_modified: object
                        .last_modified()
                        .and_then(|t| SystemTime::try_from(*t).ok()),
                })
            })
            .collect::<Vec<_>>();
        let next_continuation_token = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };
        tracing::debug!(
            bucket,
            count = objects.len(),
            more = next_continuation_token.is_some(),
            "Listed page of objects"
        );
        Ok(ObjectPage {
            objects,
            next_continuation_token,
        })
    }

    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<(), StoreError> {
        let requested = keys.len();
        let identifiers = keys
            .into_iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::remote)?;
        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .quiet(true)
            .build()
            .map_err(StoreError::remote)?;

        let output = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(classify)?;

        if let Some(first) = output.errors().first() {
            tracing::error!(
                bucket,
                failed = output.errors().len(),
                requested,
                key = ?first.key(),
                code = ?first.code(),
                "Bulk delete reported per-key failures"
            );
            return Err(StoreError::remote(format!(
                "failed to delete {} of {} objects, first {}: {} ({})",
                output.errors().len(),
                requested,
                first.key().unwrap_or("<unknown>"),
                first.code().unwrap_or("<no code>"),
                first.message().unwrap_or(""),
            )));
        }
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let mut request = self.client.create_bucket().bucket(bucket);
        // us-east-1 rejects an explicit location constraint
        if self.region != "us-east-1" {
            let configuration = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build();
            request = request.create_bucket_configuration(configuration);
        }
        request.send().await.map_err(classify)?;
        Ok(())
    }

    async fn put_bucket_website(
        &self,
        bucket: &str,
        website: WebsiteConfig,
    ) -> Result<(), StoreError> {
        let index = IndexDocument::builder()
            .suffix(website.index_document)
            .build()
            .map_err(StoreError::remote)?;
        let mut configuration = WebsiteConfiguration::builder().index_document(index);
        if let Some(key) = website.error_document {
            let error_document = ErrorDocument::builder()
                .key(key)
                .build()
                .map_err(StoreError::remote)?;
            configuration = configuration.error_document(error_document);
        }

        self.client
            .put_bucket_website()
            .bucket(bucket)
            .website_configuration(configuration.build())
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn remove_public_access_block(&self, bucket: &str) -> Result<(), StoreError> {
        self.client
            .delete_public_access_block()
            .bucket(bucket)
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: String) -> Result<(), StoreError> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn put_object(&self, bucket: &str, object: PutObject) -> Result<(), StoreError> {
        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(object.key)
            .content_type(object.content_type)
            .body(ByteStream::from(object.body));
        if let Some(cache) = object.cache {
            request = request
                .cache_control(cache.cache_control)
                .expires(DateTime::from(cache.expires));
        }
        request.send().await.map_err(classify)?;
        Ok(())
    }
}
