//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use geomirror_maxmind::AuthStyle;
use geomirror_maxmind::object_store::DEFAULT_API_BASE;
use geomirror_maxmind::upstream::DEFAULT_BASE_URL;

/// Global configuration for geomirror
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub maxmind: MaxMindConfig,
    pub registry: RegistryConfig,
    pub object_store: ObjectStoreConfig,
    pub http: HttpConfig,
    pub scratch: ScratchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaxMindConfig {
    #[serde(deserialize_with = "deserialize_env_var")]
    pub account_id: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub license_key: Option<String>,
    pub base_url: String,
    pub auth: AuthStyle,
}

impl Default for MaxMindConfig {
    fn default() -> Self {
        Self {
            account_id: std::env::var("MAXMIND_ACCOUNT_ID").ok(),
            license_key: std::env::var("MAXMIND_LICENSE_KEY").ok(),
            base_url: DEFAULT_BASE_URL.to_string(),
            auth: AuthStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub url: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub token: Option<String>,
    pub scope: String,
    /// npm executable
    pub npm: String,
    pub repository: String,
    pub license: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let package = geomirror_maxmind::PackageSettings::default();
        Self {
            url: package.registry_url,
            token: std::env::var("NPM_TOKEN").ok(),
            scope: package.scope,
            npm: "npm".to_string(),
            repository: package.repository,
            license: package.license,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    #[serde(deserialize_with = "deserialize_env_var")]
    pub account_id: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub api_token: Option<String>,
    pub bucket: String,
    pub api_base: String,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            account_id: std::env::var("CLOUDFLARE_ACCOUNT_ID").ok(),
            api_token: std::env::var("CLOUDFLARE_API_TOKEN").ok(),
            bucket: std::env::var("R2_BUCKET")
                .ok()
                .filter(|b| !b.trim().is_empty())
                .unwrap_or_else(|| "geolite2".to_string()),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Timeouts in seconds
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Wait for the download's response headers; the body is only bounded
    /// by `stall_timeout`
    pub response_timeout: u64,
    /// Longest gap between two received chunks
    pub stall_timeout: u64,
    /// Whole-request limit for one object upload
    pub upload_timeout: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            response_timeout: 60,
            stall_timeout: 30,
            upload_timeout: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScratchConfig {
    pub dir: PathBuf,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./geolite2_tmp"),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./geomirror.toml (current directory)
    /// 2. ~/.config/geomirror/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("geomirror.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "geomirror") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Package metadata for the bundles
    pub fn package_settings(&self) -> geomirror_maxmind::PackageSettings {
        geomirror_maxmind::PackageSettings {
            scope: self.registry.scope.clone(),
            registry_url: self.registry.url.clone(),
            registry_token: self.registry.token.clone().unwrap_or_default(),
            repository: self.registry.repository.clone(),
            license: self.registry.license.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.scratch.dir, PathBuf::from("./geolite2_tmp"));
        assert_eq!(config.http.response_timeout, 60);
        assert_eq!(config.http.stall_timeout, 30);
        assert_eq!(config.http.upload_timeout, 300);
        assert_eq!(config.maxmind.auth, AuthStyle::Basic);
        assert_eq!(config.registry.npm, "npm");
    }

    #[test]
    fn expand_env_var_simple() {
        std::env::set_var("GEOMIRROR_TEST_VAR", "test_value");
        assert_eq!(
            expand_env_var("${GEOMIRROR_TEST_VAR}"),
            Some("test_value".to_string())
        );
        std::env::remove_var("GEOMIRROR_TEST_VAR");
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal"), Some("literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${NONEXISTENT_VAR_12345}"), None);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[maxmind]
account_id = "123456"
license_key = "${NONEXISTENT_VAR_12345}"
auth = "query"

[registry]
scope = "@acme"
npm = "/usr/local/bin/npm"

[object_store]
bucket = "mirror"

[http]
stall_timeout = 5

[scratch]
dir = "/tmp/geo"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.maxmind.account_id.as_deref(), Some("123456"));
        assert_eq!(config.maxmind.license_key, None);
        assert_eq!(config.maxmind.auth, AuthStyle::Query);
        assert_eq!(config.maxmind.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.registry.scope, "@acme");
        assert_eq!(config.registry.npm, "/usr/local/bin/npm");
        assert_eq!(config.object_store.bucket, "mirror");
        assert_eq!(config.http.stall_timeout, 5);
        assert_eq!(config.http.response_timeout, 60);
        assert_eq!(config.scratch.dir, PathBuf::from("/tmp/geo"));
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("geomirror.toml");
        std::fs::write(&path, "[http]\nstall_timeout = \"soon\"\n").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn package_settings_follow_registry_section() {
        let mut config = Config::default();
        config.registry.scope = "@acme".to_string();
        config.registry.token = Some("tok".to_string());
        let package = config.package_settings();
        assert_eq!(package.scope, "@acme");
        assert_eq!(package.registry_token, "tok");
    }
}
