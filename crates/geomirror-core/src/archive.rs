//! Gzipped tarball unpacking and artifact lookup

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

/// Buffer size for the archive reader (256KB)
const ARCHIVE_BUF_SIZE: usize = 256 * 1024;

/// Error from unpacking an archive or locating a file inside it
#[derive(Debug)]
pub enum ArchiveError {
    /// Reading, decompressing or writing failed
    Io(std::io::Error),
    /// Archive unpacked cleanly but no file with the expected suffix was found
    ArtifactNotFound { dir: PathBuf, suffix: String },
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "unpack failed: {e}"),
            Self::ArtifactNotFound { dir, suffix } => {
                write!(f, "no *{suffix} file found under {}", dir.display())
            }
        }
    }
}

impl std::error::Error for ArchiveError {}

impl From<std::io::Error> for ArchiveError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Unpack a `.tar.gz` file into `dest`.
///
/// `dest` is removed first so leftovers from an earlier run cannot be picked
/// up by [`find_artifact`]. Entries escaping `dest` are skipped by `tar`.
pub fn unpack_tar_gz(archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    if dest.exists() {
        std::fs::remove_dir_all(dest)?;
    }
    std::fs::create_dir_all(dest)?;

    let file = File::open(archive)?;
    let gz = GzDecoder::new(BufReader::with_capacity(ARCHIVE_BUF_SIZE, file));
    let mut tar = tar::Archive::new(gz);
    tar.set_preserve_permissions(false);
    tar.unpack(dest)?;
    Ok(())
}

/// Sorted entries of `dir` (by file name) that satisfy `keep`.
fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> std::io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| keep(p))
        .collect();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Find the artifact in an unpacked tree.
///
/// Looks one level down: each immediate subdirectory of `root` is scanned for
/// a regular file whose name ends with `suffix`. Subdirectories and files are
/// visited in lexicographic order; the first match wins.
pub fn find_artifact(root: &Path, suffix: &str) -> Result<PathBuf, ArchiveError> {
    for dir in sorted_entries(root, Path::is_dir)? {
        let matches = sorted_entries(&dir, |p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(suffix))
        })?;
        if let Some(first) = matches.into_iter().next() {
            return Ok(first);
        }
    }

    Err(ArchiveError::ArtifactNotFound {
        dir: root.to_path_buf(),
        suffix: suffix.to_string(),
    })
}
