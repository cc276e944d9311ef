//! Glyph subsetting.
//!
//! The subsetting algorithm itself is a capability behind the [`Subsetter`]
//! trait. [`CommandSubsetter`] is the default: it runs an external tool
//! (`pyftsubset` unless configured otherwise). Custom implementations can be
//! injected through [`SubsetCompressor::new`].

use std::fs;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use super::{FontError, FontFormat};
use crate::utils::exec::Cmd;

/// What to keep and how to package it.
#[derive(Debug, Clone, Copy)]
pub struct SubsetRequest<'a> {
    /// Characters that must survive subsetting.
    pub text: &'a str,
    /// Requested container format.
    pub format: FontFormat,
    /// Where the original bytes came from (informational).
    pub source: &'a Path,
}

/// Result of a subsetter run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetOutput {
    pub bytes: Vec<u8>,
    /// Container actually produced. `None` means the requested one.
    pub format: Option<FontFormat>,
}

impl From<Vec<u8>> for SubsetOutput {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            format: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SubsetError {
    #[error("`{0}` is not installed")]
    NotInstalled(String),

    #[error("subset command is empty")]
    EmptyCommand,

    #[error("`{program}` failed: {detail}")]
    Command { program: String, detail: String },

    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reduce a font to the glyphs needed for `request.text`.
pub trait Subsetter: Send + Sync {
    fn subset(&self, source: &[u8], request: &SubsetRequest<'_>) -> Result<SubsetOutput, SubsetError>;
}

/// Runs an fonttools-compatible command line:
///
/// ```text
/// <command...> <input> --text=<chars> --output-file=<out> [--flavor=woff|woff2]
/// ```
#[derive(Debug, Clone)]
pub struct CommandSubsetter {
    command: Vec<String>,
}

impl CommandSubsetter {
    pub const DEFAULT_COMMAND: &'static str = "pyftsubset";

    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Whether the program can be found on `PATH`.
    pub fn is_available(&self) -> bool {
        self.command
            .first()
            .is_some_and(|program| which::which(program).is_ok())
    }
}

impl Default for CommandSubsetter {
    fn default() -> Self {
        Self::new(vec![Self::DEFAULT_COMMAND.into()])
    }
}

impl Subsetter for CommandSubsetter {
    fn subset(&self, source: &[u8], request: &SubsetRequest<'_>) -> Result<SubsetOutput, SubsetError> {
        let program = self.command.first().ok_or(SubsetError::EmptyCommand)?;
        if !self.is_available() {
            return Err(SubsetError::NotInstalled(program.clone()));
        }

        let dir = tempfile::tempdir()?;
        let source_ext = request
            .source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let input = dir.path().join(format!("input{source_ext}"));
        let output = dir.path().join(format!("output{}", request.format.extension()));
        fs::write(&input, source)?;

        let mut cmd = Cmd::from_slice(&self.command)
            .arg(&input)
            .arg(format!("--text={}", request.text))
            .arg(format!("--output-file={}", output.display()));
        if let Some(flavor) = request.format.flavor() {
            cmd = cmd.arg(format!("--flavor={flavor}"));
        }

        let result = cmd.output()?;
        if !result.status.success() {
            return Err(SubsetError::Command {
                program: program.clone(),
                detail: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(fs::read(&output)?.into())
    }
}

/// Subsetted payload ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    pub bytes: Vec<u8>,
    pub format: FontFormat,
}

/// Applies the configured [`Subsetter`] and normalizes its result.
#[derive(Clone)]
pub struct SubsetCompressor {
    subsetter: Arc<dyn Subsetter>,
}

impl SubsetCompressor {
    pub fn new(subsetter: Arc<dyn Subsetter>) -> Self {
        Self { subsetter }
    }

    /// Subset `bytes`, keeping `text`, packaged as `format`.
    ///
    /// `name` only labels the error. Failures never touch the caller's bytes.
    pub fn compress(
        &self,
        name: &str,
        bytes: &[u8],
        text: &str,
        format: FontFormat,
        source: &Path,
    ) -> Result<Compressed, FontError> {
        let request = SubsetRequest {
            text,
            format,
            source,
        };
        let output = self
            .subsetter
            .subset(bytes, &request)
            .map_err(|e| FontError::SubsetFailure {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        if output.bytes.is_empty() {
            return Err(FontError::SubsetFailure {
                name: name.to_string(),
                reason: "subsetter returned no data".into(),
            });
        }

        Ok(Compressed {
            bytes: output.bytes,
            format: output.format.unwrap_or(format),
        })
    }
}

impl Default for SubsetCompressor {
    fn default() -> Self {
        Self::new(Arc::new(CommandSubsetter::default()))
    }
}

impl std::fmt::Debug for SubsetCompressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubsetCompressor").finish_non_exhaustive()
    }
}
