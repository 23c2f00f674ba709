//! Secondary destination: raw `.mmdb` objects in Cloudflare R2
//!
//! Each published edition is uploaded twice: under a version-qualified key
//! and under a `latest` key that overwrites the previous run's object.

use std::path::Path;
use std::time::Duration;

use geomirror_core::{StreamError, fmt_bytes, http_client, send_upload};

use crate::config::ObjectStoreCredentials;
use crate::edition::Edition;

/// Default Cloudflare API base
pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Destination accepting whole objects by key
pub trait ObjectStore {
    fn put(&self, key: &str, body: &[u8]) -> Result<(), StreamError>;
}

/// R2 client using the Cloudflare REST API with a bearer token
pub struct R2Client {
    api_base: String,
    account_id: String,
    api_token: String,
    bucket: String,
    timeout: Duration,
}

impl R2Client {
    pub fn new(
        api_base: &str,
        credentials: &ObjectStoreCredentials,
        bucket: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            account_id: credentials.account_id.clone(),
            api_token: credentials.api_token.clone(),
            bucket: bucket.to_string(),
            timeout,
        }
    }

    /// Object endpoint for `key`
    pub fn object_url(&self, key: &str) -> String {
        format!(
            "{}/accounts/{}/r2/buckets/{}/objects/{}",
            self.api_base, self.account_id, self.bucket, key
        )
    }
}

impl ObjectStore for R2Client {
    fn put(&self, key: &str, body: &[u8]) -> Result<(), StreamError> {
        let request = http_client()
            .put(self.object_url(key))
            .bearer_auth(&self.api_token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body.to_vec());
        let status = send_upload(request, self.timeout)?;
        log::debug!("PUT {}/{key}: {status}", self.bucket);
        Ok(())
    }
}

/// Store that only logs what would be uploaded
pub struct DryRunStore;

impl ObjectStore for DryRunStore {
    fn put(&self, key: &str, body: &[u8]) -> Result<(), StreamError> {
        log::info!("dry run: would upload {key} ({})", fmt_bytes(body.len() as u64));
        Ok(())
    }
}

/// Keys an artifact is uploaded to: versioned first, then `latest`.
pub fn object_keys(package_name: &str, version: &str, file_name: &str) -> [String; 2] {
    [
        format!("{package_name}/{version}/{file_name}"),
        format!("{package_name}/latest/{file_name}"),
    ]
}

/// Result of the object-store step for one edition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// No object-store credentials configured
    Skipped,
    /// Both uploads were attempted
    Uploaded {
        succeeded: Vec<String>,
        failed: Vec<String>,
    },
    /// The artifact could not be read, nothing was uploaded
    Unreadable(String),
}

impl MirrorOutcome {
    pub fn is_clean(&self) -> bool {
        match self {
            Self::Skipped => true,
            Self::Uploaded { failed, .. } => failed.is_empty(),
            Self::Unreadable(_) => false,
        }
    }
}

impl std::fmt::Display for MirrorOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skipped => f.write_str("skipped"),
            Self::Uploaded { succeeded, failed } => {
                let total = succeeded.len() + failed.len();
                write!(f, "{}/{total} uploaded", succeeded.len())
            }
            Self::Unreadable(e) => write!(f, "unreadable artifact: {e}"),
        }
    }
}

/// Upload `artifact` under its versioned and `latest` keys.
///
/// The two PUTs are independent: a failed versioned upload does not prevent
/// the `latest` one. Failures are logged and recorded, never returned.
pub fn mirror_artifact(
    store: Option<&dyn ObjectStore>,
    edition: Edition,
    version: &str,
    artifact: &Path,
) -> MirrorOutcome {
    let Some(store) = store else {
        log::info!("{edition}: object store not configured, skipping upload");
        return MirrorOutcome::Skipped;
    };

    let body = match std::fs::read(artifact) {
        Ok(b) => b,
        Err(e) => {
            log::error!("{edition}: cannot read {}: {e}", artifact.display());
            return MirrorOutcome::Unreadable(e.to_string());
        }
    };
    let file_name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.mmdb", edition.id()));

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for key in object_keys(edition.package_name(), version, &file_name) {
        match store.put(&key, &body) {
            Ok(()) => {
                log::info!("{edition}: uploaded {key} ({})", fmt_bytes(body.len() as u64));
                succeeded.push(key);
            }
            Err(e) => {
                log::error!("{edition}: upload of {key} failed: {e}");
                e.log_details(edition.id());
                failed.push(key);
            }
        }
    }

    MirrorOutcome::Uploaded { succeeded, failed }
}
