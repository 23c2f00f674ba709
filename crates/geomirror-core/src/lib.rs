//! Geomirror Core - Common infrastructure for database mirroring pipelines
//!
//! This crate provides the transfer, archive, logging and progress pieces
//! shared by the edition pipeline and the CLI.

pub mod archive;
pub mod logging;
pub mod progress;
pub mod shutdown;
pub mod stream;

// Re-exports for convenience
pub use archive::{ArchiveError, find_artifact, unpack_tar_gz};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, fmt_bytes};
pub use shutdown::{INTERRUPTED_EXIT_CODE, install_signal_handlers, is_shutdown_requested};
pub use stream::{StreamError, Timeouts, download_to_file, http_client, send_upload};
