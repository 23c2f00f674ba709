//! Run version stamped on every package published in one invocation

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Timestamp-derived package version shared by a whole run.
///
/// Format: `YYYY.M.D-tHHMMSS`. The prerelease identifier carries a `t`
/// prefix because semver forbids leading zeros in numeric identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunVersion(String);

impl RunVersion {
    /// Version for the current instant
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Version for a given instant
    pub fn at(t: DateTime<Utc>) -> Self {
        Self(format!(
            "{}.{}.{}-t{:02}{:02}{:02}",
            t.year(),
            t.month(),
            t.day(),
            t.hour(),
            t.minute(),
            t.second()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
