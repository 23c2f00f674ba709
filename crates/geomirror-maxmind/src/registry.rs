//! Primary destination: publish bundles with the npm CLI

use std::process::Command;

use crate::bundle::Bundle;

/// Failure of the registry publish step
#[derive(Debug)]
pub enum PublishError {
    /// The publisher program could not be started
    Spawn {
        program: String,
        source: std::io::Error,
    },
    /// The publisher ran and exited unsuccessfully
    Failed { code: Option<i32>, stderr: String },
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn { program, source } => write!(f, "cannot run {program}: {source}"),
            Self::Failed { code, stderr } => {
                let code = code.map_or("signal".to_string(), |c| c.to_string());
                // npm prints its verdict on the last `npm error` lines
                let last = stderr
                    .lines()
                    .rev()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .unwrap_or("");
                if last.is_empty() {
                    write!(f, "publish exited with {code}")
                } else {
                    write!(f, "publish exited with {code}: {last}")
                }
            }
        }
    }
}

impl std::error::Error for PublishError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::Failed { .. } => None,
        }
    }
}

/// Destination for package bundles
pub trait Registry {
    fn publish(&self, bundle: &Bundle) -> Result<(), PublishError>;
}

/// Publishes through `npm publish --access public` run inside the bundle
#[derive(Debug, Clone)]
pub struct NpmPublisher {
    /// npm executable
    pub program: String,
    /// Pass `--dry-run` to npm
    pub dry_run: bool,
    /// Dist-tag for the published version
    pub tag: Option<String>,
}

impl Default for NpmPublisher {
    fn default() -> Self {
        Self {
            program: "npm".to_string(),
            dry_run: false,
            tag: None,
        }
    }
}

impl NpmPublisher {
    /// Arguments passed to the npm program
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "publish".to_string(),
            "--access".to_string(),
            "public".to_string(),
        ];
        if let Some(tag) = &self.tag {
            args.push("--tag".to_string());
            args.push(tag.clone());
        }
        if self.dry_run {
            args.push("--dry-run".to_string());
        }
        args
    }
}

impl Registry for NpmPublisher {
    fn publish(&self, bundle: &Bundle) -> Result<(), PublishError> {
        let args = self.args();
        log::info!(
            "{}: {} {} ({}@{})",
            bundle.edition,
            self.program,
            args.join(" "),
            bundle.name,
            bundle.version
        );

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&bundle.dir)
            .output()
            .map_err(|source| PublishError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            log::debug!("{}: npm: {line}", bundle.edition);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if output.status.success() {
            for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
                log::debug!("{}: npm: {line}", bundle.edition);
            }
            Ok(())
        } else {
            for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
                log::error!("{}: npm: {line}", bundle.edition);
            }
            Err(PublishError::Failed {
                code: output.status.code(),
                stderr,
            })
        }
    }
}
