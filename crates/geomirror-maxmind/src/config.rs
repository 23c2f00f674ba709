//! Run configuration and credential checks

use std::path::PathBuf;

use crate::edition::Edition;
use crate::version::RunVersion;

/// Missing required credentials, named by their environment variable.
#[derive(Debug, PartialEq, Eq)]
pub struct MissingCredentials(pub Vec<&'static str>);

impl std::fmt::Display for MissingCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "missing required credentials: {}", self.0.join(", "))
    }
}

impl std::error::Error for MissingCredentials {}

/// Treat unset and blank values alike.
fn present(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Credentials without which no edition is attempted.
#[derive(Clone)]
pub struct Credentials {
    pub account_id: String,
    pub license_key: String,
    pub registry_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("license_key", &"***")
            .field("registry_token", &"***")
            .finish()
    }
}

impl Credentials {
    /// Validate all required values at once, reporting every missing one.
    pub fn require(
        account_id: Option<&str>,
        license_key: Option<&str>,
        registry_token: Option<&str>,
    ) -> Result<Self, MissingCredentials> {
        let account_id = present(account_id);
        let license_key = present(license_key);
        let registry_token = present(registry_token);

        match (account_id, license_key, registry_token) {
            (Some(account_id), Some(license_key), Some(registry_token)) => Ok(Self {
                account_id,
                license_key,
                registry_token,
            }),
            (a, l, r) => {
                let mut missing = Vec::new();
                if a.is_none() {
                    missing.push("MAXMIND_ACCOUNT_ID");
                }
                if l.is_none() {
                    missing.push("MAXMIND_LICENSE_KEY");
                }
                if r.is_none() {
                    missing.push("NPM_TOKEN");
                }
                Err(MissingCredentials(missing))
            }
        }
    }
}

/// Object-store credentials. Absent means the mirror step is skipped.
#[derive(Clone)]
pub struct ObjectStoreCredentials {
    pub account_id: String,
    pub api_token: String,
}

impl std::fmt::Debug for ObjectStoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreCredentials")
            .field("account_id", &self.account_id)
            .field("api_token", &"***")
            .finish()
    }
}

impl ObjectStoreCredentials {
    /// Both values or nothing; a half-configured pair is warned about and ignored.
    pub fn optional(account_id: Option<&str>, api_token: Option<&str>) -> Option<Self> {
        match (present(account_id), present(api_token)) {
            (Some(account_id), Some(api_token)) => Some(Self {
                account_id,
                api_token,
            }),
            (None, None) => None,
            (Some(_), None) => {
                log::warn!("CLOUDFLARE_ACCOUNT_ID set without CLOUDFLARE_API_TOKEN, object store disabled");
                None
            }
            (None, Some(_)) => {
                log::warn!("CLOUDFLARE_API_TOKEN set without CLOUDFLARE_ACCOUNT_ID, object store disabled");
                None
            }
        }
    }
}

/// Package metadata and registry settings written into each bundle
#[derive(Debug, Clone)]
pub struct PackageSettings {
    /// Registry scope, with leading `@`
    pub scope: String,
    /// Registry base URL
    pub registry_url: String,
    pub registry_token: String,
    pub repository: String,
    pub license: String,
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            scope: "@geo-mmd".to_string(),
            registry_url: "https://registry.npmjs.org/".to_string(),
            registry_token: String::new(),
            repository: "https://github.com/lihongjie0209/geo-mmd".to_string(),
            license: "CC BY-SA 4.0".to_string(),
        }
    }
}

impl PackageSettings {
    /// Fully qualified package name for an edition (`@scope/geolite2-city`)
    pub fn qualified_name(&self, edition: Edition) -> String {
        let scope = self.scope.trim_start_matches('@');
        if scope.is_empty() {
            edition.package_name().to_string()
        } else {
            format!("@{scope}/{}", edition.package_name())
        }
    }
}

/// Everything one run needs, built once and threaded through every step
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Editions to process, in order
    pub editions: Vec<Edition>,
    pub version: RunVersion,
    /// Shared scratch root; every edition works in its own entries below it
    pub scratch_dir: PathBuf,
    pub package: PackageSettings,
    /// Leave per-edition scratch entries in place after processing
    pub keep_scratch: bool,
}

impl RunConfig {
    /// Downloaded archive for an edition
    pub fn archive_path(&self, edition: Edition) -> PathBuf {
        self.scratch_dir.join(format!("{}.tar.gz", edition.id()))
    }

    /// Directory an edition's archive is unpacked into
    pub fn extract_dir(&self, edition: Edition) -> PathBuf {
        self.scratch_dir.join(edition.id())
    }

    /// Bundle directory handed to the registry publisher
    pub fn bundle_dir(&self, edition: Edition) -> PathBuf {
        self.scratch_dir.join(format!("{}-npm", edition.id()))
    }

    /// Remove an edition's scratch entries, logging rather than failing.
    pub fn clean_scratch(&self, edition: Edition) {
        if self.keep_scratch {
            return;
        }
        let archive = self.archive_path(edition);
        if archive.exists() {
            if let Err(e) = std::fs::remove_file(&archive) {
                log::warn!("{edition}: cannot remove {}: {e}", archive.display());
            }
        }
        for dir in [self.extract_dir(edition), self.bundle_dir(edition)] {
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(&dir) {
                    log::warn!("{edition}: cannot remove {}: {e}", dir.display());
                }
            }
        }
    }
}
