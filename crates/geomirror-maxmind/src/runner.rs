//! Main runner for the edition publishing pipeline

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use geomirror_core::{
    ArchiveError, ProgressContext, StreamError, find_artifact, fmt_bytes, is_shutdown_requested,
    unpack_tar_gz,
};
use indicatif::ProgressBar;

use crate::bundle::{self, Bundle};
use crate::config::RunConfig;
use crate::edition::{ARTIFACT_SUFFIX, Edition};
use crate::object_store::{MirrorOutcome, ObjectStore, mirror_artifact};
use crate::registry::{PublishError, Registry};
use crate::summary::Summary;
use crate::upstream::ArchiveSource;

/// Pipeline step at which an edition failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Extract,
    Package,
    Publish,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::Package => "package",
            Self::Publish => "publish",
        })
    }
}

/// Error that aborts one edition (and only that edition)
#[derive(Debug)]
pub enum EditionError {
    Fetch(StreamError),
    Extract(ArchiveError),
    Package(anyhow::Error),
    Publish(PublishError),
}

impl EditionError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Fetch(_) => Stage::Fetch,
            Self::Extract(_) => Stage::Extract,
            Self::Package(_) => Stage::Package,
            Self::Publish(_) => Stage::Publish,
        }
    }

    /// Archive layout was not as expected
    pub fn is_artifact_missing(&self) -> bool {
        matches!(self, Self::Extract(ArchiveError::ArtifactNotFound { .. }))
    }
}

impl std::fmt::Display for EditionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "fetch failed: {e}"),
            Self::Extract(e) => write!(f, "extract failed: {e}"),
            Self::Package(e) => write!(f, "package failed: {e:#}"),
            Self::Publish(e) => write!(f, "publish failed: {e}"),
        }
    }
}

impl std::error::Error for EditionError {}

/// What happened to one edition
#[derive(Debug)]
pub enum EditionOutcome {
    Published {
        edition: Edition,
        package: String,
        version: String,
        mirror: MirrorOutcome,
        elapsed: Duration,
    },
    Failed {
        edition: Edition,
        error: EditionError,
        elapsed: Duration,
    },
    /// Shutdown was requested before this edition started
    NotAttempted { edition: Edition },
}

impl EditionOutcome {
    pub fn edition(&self) -> Edition {
        match self {
            Self::Published { edition, .. }
            | Self::Failed { edition, .. }
            | Self::NotAttempted { edition } => *edition,
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// The collaborators an edition is fetched from and published to
pub struct Destinations<'a> {
    pub source: &'a dyn ArchiveSource,
    pub registry: &'a dyn Registry,
    /// `None` when object-store credentials are not configured
    pub store: Option<&'a dyn ObjectStore>,
}

/// Successful primary publish, plus the artifact for the mirror step
struct Published {
    bundle: Bundle,
    artifact: PathBuf,
}

/// Fetch → extract → package → publish for one edition.
fn publish_edition(
    config: &RunConfig,
    edition: Edition,
    dest: &Destinations<'_>,
    progress: &ProgressContext,
    stage: &ProgressBar,
) -> Result<Published, EditionError> {
    stage.set_message("downloading");
    let archive = config.archive_path(edition);
    let bar = progress.transfer_bar(edition.id());
    let fetched = dest.source.fetch(edition, &archive, &bar);
    bar.finish_and_clear();
    let bytes = fetched.map_err(EditionError::Fetch)?;
    log::info!("{edition}: downloaded {}", fmt_bytes(bytes));

    stage.set_message("extracting");
    let extract_dir = config.extract_dir(edition);
    unpack_tar_gz(&archive, &extract_dir).map_err(EditionError::Extract)?;
    let artifact = find_artifact(&extract_dir, ARTIFACT_SUFFIX).map_err(EditionError::Extract)?;
    log::info!("{edition}: found {}", artifact.display());

    stage.set_message("packaging");
    let bundle = bundle::package(config, edition, &artifact).map_err(EditionError::Package)?;

    stage.set_message("publishing");
    dest.registry.publish(&bundle).map_err(EditionError::Publish)?;

    Ok(Published { bundle, artifact })
}

/// Run one edition inside its failure boundary and report the outcome.
fn process_edition(
    config: &RunConfig,
    edition: Edition,
    dest: &Destinations<'_>,
    progress: &ProgressContext,
) -> EditionOutcome {
    let start = Instant::now();
    log::info!("=== Processing {edition} ===");

    let stage = progress.stage_line(edition.id());
    let result = publish_edition(config, edition, dest, progress, &stage);
    stage.finish_and_clear();

    let outcome = match result {
        Ok(Published { bundle, artifact }) => {
            log::info!("{edition}: published {}@{}", bundle.name, bundle.version);
            let mirror = mirror_artifact(dest.store, edition, &bundle.version, &artifact);
            EditionOutcome::Published {
                edition,
                package: bundle.name,
                version: bundle.version,
                mirror,
                elapsed: start.elapsed(),
            }
        }
        Err(error) => {
            log::error!("{edition}: FAILED ({error})");
            if let EditionError::Fetch(e) = &error {
                if e.is_timeout() {
                    log::warn!("{edition}: download timed out; raise [http] timeouts for slow links");
                }
                e.log_details(edition.id());
            }
            EditionOutcome::Failed {
                edition,
                error,
                elapsed: start.elapsed(),
            }
        }
    };

    config.clean_scratch(edition);
    outcome
}

/// Run the pipeline over every configured edition.
///
/// Per-edition failures are recorded in the summary, never returned; the only
/// error is failing to prepare the scratch directory.
pub fn run(
    config: &RunConfig,
    dest: &Destinations<'_>,
    progress: &ProgressContext,
) -> anyhow::Result<Summary> {
    let start = Instant::now();

    std::fs::create_dir_all(&config.scratch_dir).with_context(|| {
        format!(
            "Cannot create scratch directory {}",
            config.scratch_dir.display()
        )
    })?;

    log::info!(
        "geomirror starting: version={}, editions={}, object store={}",
        config.version,
        config.editions.len(),
        if dest.store.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );

    let mut outcomes = Vec::with_capacity(config.editions.len());
    let mut interrupted = false;
    for &edition in &config.editions {
        if is_shutdown_requested() {
            if !interrupted {
                log::warn!("Shutdown requested, not starting remaining editions");
                interrupted = true;
            }
            outcomes.push(EditionOutcome::NotAttempted { edition });
            continue;
        }
        outcomes.push(process_edition(config, edition, dest, progress));
    }

    if !config.keep_scratch {
        // Only succeeds when every edition cleaned up after itself
        let _ = std::fs::remove_dir(&config.scratch_dir);
    }

    let summary = Summary {
        version: config.version.to_string(),
        outcomes,
        interrupted,
        elapsed: start.elapsed(),
    };
    summary.log_outcomes();
    Ok(summary)
}
