//! End-of-build font report.

use std::fmt;
use std::path::PathBuf;

use owo_colors::OwoColorize;

use crate::font::{FontError, FontFormat, FontRegistry, Lifecycle};
use crate::log;
use crate::utils::plural_count;

/// A font that was subsetted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedFont {
    pub name: String,
    pub format: FontFormat,
    pub before: u64,
    pub after: u64,
}

/// A font that was matched but could not be subsetted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFont {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub compressed: Vec<CompressedFont>,
    pub failed: Vec<FailedFont>,
    /// Declared files that do not exist.
    pub not_found: Vec<PathBuf>,
    /// Declared but never referenced.
    pub unused: Vec<String>,
    /// Left unmatched because an identical twin took the output.
    pub ambiguous: Vec<String>,
}

impl BuildReport {
    /// Collect the final state of every record.
    pub fn collect(registry: &FontRegistry, not_found: &[PathBuf]) -> Self {
        let mut report = Self {
            not_found: not_found.to_vec(),
            ..Self::default()
        };

        for err in registry.unmatched_duplicates() {
            if let FontError::AmbiguousMatch { name } = err {
                report.ambiguous.push(name);
            }
        }

        for asset in registry.assets() {
            let guard = asset.lock();
            let name = asset.display_name();

            if let Some(err) = guard.failure() {
                let reason = match err {
                    FontError::SubsetFailure { reason, .. } => reason.clone(),
                    other => other.to_string(),
                };
                report.failed.push(FailedFont { name, reason });
            } else if guard.lifecycle() == Lifecycle::Compressed || guard.is_finalized() {
                report.compressed.push(CompressedFont {
                    name,
                    format: guard.actual_format().unwrap_or(asset.format()),
                    before: asset.size(),
                    after: guard.compressed_size().unwrap_or_default() as u64,
                });
            } else if !guard.is_referenced() {
                report.unused.push(name);
            }
        }

        report
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.not_found.is_empty() && self.ambiguous.is_empty()
    }

    /// Print through the logger, one line per group.
    pub fn log(&self) {
        if self.compressed.is_empty()
            && self.unused.is_empty()
            && self.is_clean()
        {
            return;
        }

        if !self.compressed.is_empty() {
            let before: u64 = self.compressed.iter().map(|c| c.before).sum();
            let after: u64 = self.compressed.iter().map(|c| c.after).sum();
            log!(
                "fonts";
                "{} compressed ({} -> {})",
                join(self.compressed.iter().map(|c| c.name.as_str())).green().bold(),
                format_size(before),
                format_size(after)
            );
            for font in &self.compressed {
                crate::debug!(
                    "fonts";
                    "{}: {} -> {} as {}",
                    font.name,
                    format_size(font.before),
                    format_size(font.after),
                    font.format
                );
            }
        }
        for font in &self.failed {
            log!("warning"; "{} left uncompressed: {}", font.name, font.reason);
        }
        for path in &self.not_found {
            log!("warning"; "{} not found", path.display());
        }
        if !self.ambiguous.is_empty() {
            log!(
                "warning";
                "{} declared twice with identical content, left unmatched",
                join(self.ambiguous.iter().map(String::as_str))
            );
        }
        if !self.unused.is_empty() {
            log!(
                "fonts";
                "{} not compressed because unused",
                join(self.unused.iter().map(String::as_str)).yellow().bold()
            );
        }
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} compressed, {} failed, {} not found, {} unused",
            plural_count(self.compressed.len(), "font"),
            self.failed.len(),
            self.not_found.len(),
            self.unused.len()
        )?;
        if !self.ambiguous.is_empty() {
            write!(f, ", {} ambiguous", self.ambiguous.len())?;
        }
        Ok(())
    }
}

fn join<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

fn format_size(bytes: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let kb = bytes as f64 / 1024.0;
    if kb < 1.0 {
        format!("{bytes} B")
    } else if kb < 1024.0 {
        format!("{kb:.1} KB")
    } else {
        format!("{:.1} MB", kb / 1024.0)
    }
}
