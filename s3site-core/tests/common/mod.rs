#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use s3site_core::consistency::ConsistencyPolicy;
use s3site_core::contract::{
    BucketStore, CacheOverride, ObjectMetadata, ObjectPage, PutObject, StoreError, WebsiteConfig,
};
use s3site_core::DeployConfig;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache: Option<CacheOverride>,
}

#[derive(Debug, Default)]
struct Bucket {
    objects: BTreeMap<String, StoredObject>,
    website: Option<WebsiteConfig>,
    policy: Option<String>,
    public_access_blocked: bool,
}

/// Strongly consistent, paginating stand-in for a remote object store.
pub struct InMemoryStore {
    buckets: Mutex<HashMap<String, Bucket>>,
    page_size: usize,
    calls: Mutex<Vec<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            page_size,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn seed_bucket(&self, bucket: &str, keys: &[&str]) {
        let mut buckets = self.buckets.lock().unwrap();
        let entry = buckets.entry(bucket.to_string()).or_default();
        entry.public_access_blocked = true;
        for key in keys {
            entry.objects.insert(
                key.to_string(),
                StoredObject {
                    body: b"seeded".to_vec(),
                    content_type: "text/plain".into(),
                    cache: None,
                },
            );
        }
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.lock().unwrap().contains_key(bucket)
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map(|b| b.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|b| b.objects.get(key).cloned())
    }

    pub fn website(&self, bucket: &str) -> Option<WebsiteConfig> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|b| b.website.clone())
    }

    pub fn policy(&self, bucket: &str) -> Option<String> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|b| b.policy.clone())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == operation)
            .count()
    }

    fn record(&self, operation: &str) {
        self.calls.lock().unwrap().push(operation.to_string());
    }

    fn with_bucket<T>(
        &self,
        bucket: &str,
        f: impl FnOnce(&mut Bucket) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut buckets = self.buckets.lock().unwrap();
        match buckets.get_mut(bucket) {
            Some(b) => f(b),
            None => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl BucketStore for InMemoryStore {
    async fn head_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.record("head_bucket");
        self.with_bucket(bucket, |_| Ok(()))
    }

    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, StoreError> {
        self.record("list_objects");
        let page_size = self.page_size;
        self.with_bucket(bucket, |b| {
            let remaining: Vec<&String> = b
                .objects
                .keys()
                .filter(|key| match &continuation_token {
                    Some(after) => key.as_str() > after.as_str(),
                    None => true,
                })
                .collect();
            let objects: Vec<ObjectMetadata> = remaining
                .iter()
                .take(page_size)
                .map(|key| ObjectMetadata::new(key.as_str()))
                .collect();
            let next_continuation_token = if remaining.len() > page_size {
                objects.last().map(|o| o.key.clone())
            } else {
                None
            };
            Ok(ObjectPage {
                objects,
                next_continuation_token,
            })
        })
    }

    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<(), StoreError> {
        self.record("delete_objects");
        self.with_bucket(bucket, |b| {
            for key in keys {
                b.objects.remove(&key);
            }
            Ok(())
        })
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.record("delete_bucket");
        let mut buckets = self.buckets.lock().unwrap();
        match buckets.get(bucket) {
            None => Err(StoreError::NotFound),
            Some(b) if !b.objects.is_empty() => Err(StoreError::remote("BucketNotEmpty")),
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.record("create_bucket");
        let mut buckets = self.buckets.lock().unwrap();
        if buckets.contains_key(bucket) {
            return Err(StoreError::remote("BucketAlreadyOwnedByYou"));
        }
        buckets.insert(
            bucket.to_string(),
            Bucket {
                public_access_blocked: true,
                ..Bucket::default()
            },
        );
        Ok(())
    }

    async fn put_bucket_website(
        &self,
        bucket: &str,
        website: WebsiteConfig,
    ) -> Result<(), StoreError> {
        self.record("put_bucket_website");
        self.with_bucket(bucket, |b| {
            b.website = Some(website);
            Ok(())
        })
    }

    async fn remove_public_access_block(&self, bucket: &str) -> Result<(), StoreError> {
        self.record("remove_public_access_block");
        self.with_bucket(bucket, |b| {
            b.public_access_blocked = false;
            Ok(())
        })
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: String) -> Result<(), StoreError> {
        self.record("put_bucket_policy");
        self.with_bucket(bucket, |b| {
            if b.public_access_blocked {
                return Err(StoreError::remote("AccessDenied: public policies are blocked"));
            }
            b.policy = Some(policy);
            Ok(())
        })
    }

    async fn put_object(&self, bucket: &str, object: PutObject) -> Result<(), StoreError> {
        self.record("put_object");
        self.with_bucket(bucket, |b| {
            b.objects.insert(
                object.key,
                StoredObject {
                    body: object.body,
                    content_type: object.content_type,
                    cache: object.cache,
                },
            );
            Ok(())
        })
    }
}

/// Config for bucket `s3site-test-site`, optionally rooted at `src`.
pub fn test_config(src: Option<&Path>) -> DeployConfig {
    let mut config = DeployConfig::new("site");
    config.prefix = "s3site".into();
    config.env = "test".into();
    config.src_path = src.map(Path::to_path_buf);
    config.consistency = ConsistencyPolicy::disabled();
    config
}

/// Write `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
