//! Run summary: per-edition outcomes folded into log lines and a table.

use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::runner::EditionOutcome;

/// Ordered outcomes of one run
#[derive(Debug)]
pub struct Summary {
    pub version: String,
    pub outcomes: Vec<EditionOutcome>,
    /// Shutdown was requested before every edition could start
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl Summary {
    pub fn published(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_published()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EditionOutcome::Failed { .. }))
            .count()
    }

    /// Published editions whose object-store step had any failure
    pub fn mirror_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EditionOutcome::Published { mirror, .. } if !mirror.is_clean()))
            .count()
    }

    /// One log line per edition, then a total.
    pub fn log_outcomes(&self) {
        for outcome in &self.outcomes {
            match outcome {
                EditionOutcome::Published {
                    edition,
                    package,
                    version,
                    mirror,
                    elapsed,
                } => log::info!(
                    "[OK]     {edition}: {package}@{version}, object store {mirror} [{:.1}s]",
                    elapsed.as_secs_f64()
                ),
                EditionOutcome::Failed {
                    edition,
                    error,
                    elapsed,
                } => log::error!(
                    "[FAILED] {edition}: {error} [{:.1}s]",
                    elapsed.as_secs_f64()
                ),
                EditionOutcome::NotAttempted { edition } => {
                    log::warn!("[SKIP]   {edition}: not attempted (shutdown)")
                }
            }
        }
        log::info!(
            "Run {} complete: {}/{} published, {} failed, {} object store failures [{:.1}s]",
            self.version,
            self.published(),
            self.outcomes.len(),
            self.failed(),
            self.mirror_failures(),
            self.elapsed.as_secs_f64()
        );
    }

    /// Format summary table as a string.
    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Edition")
                    .fg(Color::Cyan)
                    .add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Package").fg(Color::Cyan),
                Cell::new("Registry").fg(Color::Cyan),
                Cell::new("Object store").fg(Color::Cyan),
                Cell::new("Time").fg(Color::Cyan),
            ]);

        for outcome in &self.outcomes {
            let edition = outcome.edition();
            let row = match outcome {
                EditionOutcome::Published {
                    package,
                    mirror,
                    elapsed,
                    ..
                } => {
                    let mirror_color = if mirror.is_clean() {
                        Color::Reset
                    } else {
                        Color::Yellow
                    };
                    vec![
                        Cell::new(edition.id()),
                        Cell::new(package),
                        Cell::new("published").fg(Color::Green),
                        Cell::new(mirror.to_string()).fg(mirror_color),
                        Cell::new(format!("{:.1}s", elapsed.as_secs_f64())),
                    ]
                }
                EditionOutcome::Failed { error, elapsed, .. } => vec![
                    Cell::new(edition.id()),
                    Cell::new(edition.package_name()),
                    Cell::new(format!("failed ({})", error.stage())).fg(Color::Red),
                    Cell::new("-"),
                    Cell::new(format!("{:.1}s", elapsed.as_secs_f64())),
                ],
                EditionOutcome::NotAttempted { .. } => vec![
                    Cell::new(edition.id()),
                    Cell::new(edition.package_name()),
                    Cell::new("not attempted").fg(Color::Yellow),
                    Cell::new("-"),
                    Cell::new("-"),
                ],
            };
            table.add_row(row);
        }

        format!("\nVersion {}\n{table}", self.version)
    }
}
