//! MaxMind download client

use std::path::Path;

use geomirror_core::stream::redact_query;
use geomirror_core::{StreamError, Timeouts, download_to_file, http_client};
use indicatif::ProgressBar;
use serde::Deserialize;

use crate::config::Credentials;
use crate::edition::Edition;

/// Default MaxMind download host
pub const DEFAULT_BASE_URL: &str = "https://download.maxmind.com";

/// Source of edition archives
pub trait ArchiveSource {
    /// Download the `.tar.gz` archive for `edition` into `dest`.
    ///
    /// Returns the number of bytes written.
    fn fetch(&self, edition: Edition, dest: &Path, pb: &ProgressBar) -> Result<u64, StreamError>;
}

/// How the license key is presented to the download endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStyle {
    /// `/geoip/databases/{edition}/download` with HTTP Basic account:key
    #[default]
    Basic,
    /// Legacy `/app/geoip_download` with `license_key` in the query string
    Query,
}

impl std::fmt::Display for AuthStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic => f.write_str("basic"),
            Self::Query => f.write_str("query"),
        }
    }
}

/// Authenticated client for the MaxMind download service
pub struct MaxMindClient {
    base_url: String,
    account_id: String,
    license_key: String,
    auth: AuthStyle,
    timeouts: Timeouts,
}

impl MaxMindClient {
    pub fn new(base_url: &str, credentials: &Credentials, auth: AuthStyle, timeouts: Timeouts) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            account_id: credentials.account_id.clone(),
            license_key: credentials.license_key.clone(),
            auth,
            timeouts,
        }
    }

    /// Download URL for an edition (contains the license key in query style)
    pub fn download_url(&self, edition: Edition) -> String {
        match self.auth {
            AuthStyle::Basic => format!(
                "{}/geoip/databases/{}/download?suffix=tar.gz",
                self.base_url,
                edition.id()
            ),
            AuthStyle::Query => format!(
                "{}/app/geoip_download?edition_id={}&license_key={}&suffix=tar.gz",
                self.base_url,
                edition.id(),
                self.license_key
            ),
        }
    }

    fn request(&self, edition: Edition) -> reqwest::RequestBuilder {
        let request = http_client().get(self.download_url(edition));
        match self.auth {
            AuthStyle::Basic => request.basic_auth(&self.account_id, Some(&self.license_key)),
            AuthStyle::Query => request,
        }
    }
}

impl ArchiveSource for MaxMindClient {
    fn fetch(&self, edition: Edition, dest: &Path, pb: &ProgressBar) -> Result<u64, StreamError> {
        let url = redact_query(&self.download_url(edition), &["license_key"]);
        log::info!("{edition}: downloading from {url}");
        let bytes = download_to_file(self.request(edition), dest, self.timeouts, pb)?;
        log::debug!("{edition}: wrote {bytes} bytes to {}", dest.display());
        Ok(bytes)
    }
}
