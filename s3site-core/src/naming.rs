//! Derived names: the canonical bucket name, object keys, the website endpoint and
//! the public-read policy document.

use std::collections::BTreeSet;
use std::path::{Component, Path};

use serde_json::json;

/// Join the non-empty parts of `[prefix, env, name]` with `-`.
pub fn bucket_name(prefix: &str, env: &str, name: &str) -> String {
    [prefix, env, name]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Object key for `path` below `root`: relative, `/`-separated, with the longest
/// matching suffix from `remove_extensions` stripped.
///
/// Returns `None` when `path` is not strictly below `root` or holds a component that
/// is not plain UTF-8.
pub fn object_key(
    root: &Path,
    path: &Path,
    remove_extensions: &BTreeSet<String>,
) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(strip_extension(parts.join("/"), remove_extensions))
}

fn strip_extension(key: String, remove_extensions: &BTreeSet<String>) -> String {
    let file_start = key.rfind('/').map_or(0, |idx| idx + 1);
    let matched = remove_extensions
        .iter()
        .filter(|ext| !ext.is_empty() && key.ends_with(ext.as_str()))
        // never strip down to an empty file name
        .filter(|ext| key.len() - ext.len() > file_start)
        .max_by_key(|ext| ext.len());
    match matched {
        Some(ext) => key[..key.len() - ext.len()].to_string(),
        None => key,
    }
}

/// Regions whose website endpoint uses `s3-website-{region}`; all others use
/// `s3-website.{region}`.
const DASH_WEBSITE_REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "eu-west-1",
    "sa-east-1",
    "us-gov-west-1",
];

/// Public website endpoint of a bucket, following the S3 website hosting convention.
pub fn website_url(bucket: &str, region: &str) -> String {
    let separator = if DASH_WEBSITE_REGIONS.contains(&region) {
        '-'
    } else {
        '.'
    };
    format!("http://{bucket}.s3-website{separator}{region}.amazonaws.com")
}

/// Bucket policy granting anonymous read on every object in `bucket`.
pub fn public_read_policy(bucket: &str) -> serde_json::Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Sid": "PublicReadGetObject",
                "Effect": "Allow",
                "Principal": "*",
                "Action": ["s3:GetObject"],
                "Resource": [format!("arn:aws:s3:::{bucket}/*")]
            }
        ]
    })
}
