//! Geomirror MaxMind - GeoLite2 republishing pipeline
//!
//! Downloads each GeoLite2 edition from MaxMind, unpacks the `.mmdb`
//! database, wraps it in an npm package stamped with the run version and
//! publishes it. Published databases are optionally mirrored to an R2 bucket.
//!
//! # Example
//!
//! ```ignore
//! use geomirror_maxmind::{Destinations, run};
//!
//! let dest = Destinations {
//!     source: &maxmind,
//!     registry: &npm,
//!     store: None,
//! };
//! let summary = run(&config, &dest, &progress)?;
//! println!("Published {} editions", summary.published());
//! ```

pub mod bundle;
pub mod config;
pub mod edition;
pub mod object_store;
pub mod registry;
pub mod runner;
pub mod summary;
pub mod upstream;
pub mod version;

#[cfg(test)]
mod test_server;

// Re-exports
pub use config::{Credentials, MissingCredentials, ObjectStoreCredentials, PackageSettings, RunConfig};
pub use edition::Edition;
pub use object_store::{DryRunStore, MirrorOutcome, ObjectStore, R2Client};
pub use registry::{NpmPublisher, PublishError, Registry};
pub use runner::{Destinations, EditionError, EditionOutcome, Stage, run};
pub use summary::Summary;
pub use upstream::{ArchiveSource, AuthStyle, MaxMindClient};
pub use version::RunVersion;
