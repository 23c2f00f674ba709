//! Registry package bundle assembly

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use crate::config::{PackageSettings, RunConfig};
use crate::edition::Edition;

/// `package.json` contents for one edition
#[derive(Debug, Serialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    pub description: String,
    pub main: String,
    pub files: Vec<String>,
    pub keywords: Vec<String>,
    pub license: String,
    pub repository: String,
}

impl PackageManifest {
    pub fn new(edition: Edition, version: &str, artifact_name: &str, settings: &PackageSettings) -> Self {
        Self {
            name: settings.qualified_name(edition),
            version: version.to_string(),
            description: format!("MaxMind {} database, updated weekly", edition.id()),
            main: artifact_name.to_string(),
            files: vec![artifact_name.to_string()],
            keywords: vec![
                "maxmind".to_string(),
                "geolite2".to_string(),
                "geoip".to_string(),
                edition.package_name().to_string(),
            ],
            license: settings.license.clone(),
            repository: settings.repository.clone(),
        }
    }
}

/// A bundle directory ready for `npm publish`
#[derive(Debug, Clone)]
pub struct Bundle {
    pub edition: Edition,
    pub dir: PathBuf,
    /// Qualified package name
    pub name: String,
    pub version: String,
}

/// `.npmrc` auth line for a registry URL:
/// `https://registry.npmjs.org/` → `//registry.npmjs.org/:_authToken=<token>`
pub fn registry_auth_line(registry_url: &str, token: &str) -> String {
    let without_scheme = registry_url
        .strip_prefix("https:")
        .or_else(|| registry_url.strip_prefix("http:"))
        .unwrap_or(registry_url);
    let host = without_scheme.trim_start_matches('/').trim_end_matches('/');
    format!("//{host}/:_authToken={token}\n")
}

/// Assemble the bundle for `edition` from `artifact`.
///
/// Any previous bundle directory for the edition is removed first, so a
/// leftover from a failed run never leaks into the new package.
pub fn package(config: &RunConfig, edition: Edition, artifact: &Path) -> anyhow::Result<Bundle> {
    let dir = config.bundle_dir(edition);
    if dir.exists() {
        std::fs::remove_dir_all(&dir)
            .with_context(|| format!("Cannot remove stale bundle {}", dir.display()))?;
    }
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Cannot create bundle {}", dir.display()))?;

    let artifact_name = artifact
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Artifact path has no file name: {}", artifact.display()))?;

    let manifest = PackageManifest::new(edition, config.version.as_str(), artifact_name, &config.package);
    let json = serde_json::to_string_pretty(&manifest).context("Cannot serialize package.json")?;
    std::fs::write(dir.join("package.json"), json).context("Cannot write package.json")?;

    std::fs::copy(artifact, dir.join(artifact_name))
        .with_context(|| format!("Cannot copy {} into bundle", artifact.display()))?;

    let auth = registry_auth_line(&config.package.registry_url, &config.package.registry_token);
    std::fs::write(dir.join(".npmrc"), auth).context("Cannot write .npmrc")?;

    log::debug!("{edition}: bundle {} ready at {}", manifest.name, dir.display());
    Ok(Bundle {
        edition,
        dir,
        name: manifest.name,
        version: manifest.version,
    })
}
