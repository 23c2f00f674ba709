//! Publish subcommand - run the fetch/package/publish pipeline

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use geomirror_core::{INTERRUPTED_EXIT_CODE, ProgressContext, Timeouts, install_signal_handlers};
use geomirror_maxmind::{
    Credentials, Destinations, DryRunStore, Edition, MaxMindClient, NpmPublisher, ObjectStore,
    ObjectStoreCredentials, R2Client, RunConfig, RunVersion, run as run_pipeline,
};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Edition to publish, repeatable (default: all)
    #[arg(short, long = "edition", value_parser = parse_edition)]
    pub editions: Vec<Edition>,

    /// Scratch directory for archives and bundles
    #[arg(short, long)]
    pub scratch_dir: Option<PathBuf>,

    /// Keep downloaded archives and bundles after each edition
    #[arg(long)]
    pub keep_scratch: bool,

    /// Run npm with --dry-run and log object uploads instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    /// npm dist-tag for the published version
    #[arg(long)]
    pub tag: Option<String>,
}

fn parse_edition(s: &str) -> Result<Edition, String> {
    Edition::from_name(s).ok_or_else(|| {
        let known: Vec<&str> = Edition::ALL.iter().map(|e| e.id()).collect();
        format!("unknown edition '{s}' (expected one of: {})", known.join(", "))
    })
}

/// Editions in canonical order, duplicates dropped; empty means all.
fn select_editions(requested: &[Edition]) -> Vec<Edition> {
    if requested.is_empty() {
        return Edition::ALL.to_vec();
    }
    Edition::ALL
        .into_iter()
        .filter(|e| requested.contains(e))
        .collect()
}

pub fn run(args: PublishArgs, config: &Config, progress: &ProgressContext) -> Result<ExitCode> {
    // Fail before touching the network or the filesystem
    let credentials = Credentials::require(
        config.maxmind.account_id.as_deref(),
        config.maxmind.license_key.as_deref(),
        config.registry.token.as_deref(),
    )?;

    let store_credentials = ObjectStoreCredentials::optional(
        config.object_store.account_id.as_deref(),
        config.object_store.api_token.as_deref(),
    );

    let mut package = config.package_settings();
    package.registry_token = credentials.registry_token.clone();

    let run_config = RunConfig {
        editions: select_editions(&args.editions),
        version: RunVersion::now(),
        scratch_dir: args.scratch_dir.unwrap_or_else(|| config.scratch.dir.clone()),
        package,
        keep_scratch: args.keep_scratch,
    };

    let source = MaxMindClient::new(
        &config.maxmind.base_url,
        &credentials,
        config.maxmind.auth,
        Timeouts {
            response: Duration::from_secs(config.http.response_timeout),
            stall: Duration::from_secs(config.http.stall_timeout),
        },
    );
    let registry = NpmPublisher {
        program: config.registry.npm.clone(),
        dry_run: args.dry_run,
        tag: args.tag,
    };

    let r2 = store_credentials.map(|creds| {
        R2Client::new(
            &config.object_store.api_base,
            &creds,
            &config.object_store.bucket,
            Duration::from_secs(config.http.upload_timeout),
        )
    });
    let store: Option<&dyn ObjectStore> = match &r2 {
        Some(_) if args.dry_run => Some(&DryRunStore),
        Some(client) => Some(client),
        None => None,
    };

    install_signal_handlers().context("Failed to install signal handlers")?;

    let dest = Destinations {
        source: &source,
        registry: &registry,
        store,
    };
    let summary = run_pipeline(&run_config, &dest, progress)?;

    // Off a TTY the per-edition log lines already carry the summary
    if progress.is_tty() {
        progress.println(summary.format_table());
    }

    if summary.interrupted {
        return Ok(ExitCode::from(INTERRUPTED_EXIT_CODE));
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_edition_accepts_id_and_package_name() {
        assert_eq!(parse_edition("GeoLite2-ASN"), Ok(Edition::Asn));
        assert_eq!(parse_edition("geolite2-city"), Ok(Edition::City));
        let err = parse_edition("GeoIP2-City").unwrap_err();
        assert!(err.contains("GeoLite2-Country"));
    }

    #[test]
    fn selection_defaults_to_all_in_order() {
        assert_eq!(select_editions(&[]), Edition::ALL.to_vec());
        assert_eq!(
            select_editions(&[Edition::Country, Edition::Asn, Edition::Country]),
            vec![Edition::Asn, Edition::Country]
        );
    }

    #[test]
    fn missing_credentials_fail_before_any_work() {
        let tmp = tempfile::TempDir::new().unwrap();
        let scratch = tmp.path().join("scratch");
        let mut config = Config::default();
        config.maxmind.account_id = Some("1".to_string());
        config.maxmind.license_key = Some("key".to_string());
        config.registry.token = None;

        let args = PublishArgs {
            editions: vec![],
            scratch_dir: Some(scratch.clone()),
            keep_scratch: false,
            dry_run: true,
            tag: None,
        };
        let err = run(args, &config, &ProgressContext::hidden()).unwrap_err();
        assert!(err.to_string().contains("NPM_TOKEN"));
        assert!(!scratch.exists());
    }
}
