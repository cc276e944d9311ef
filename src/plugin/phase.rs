//! Build phases, in the order the host drives them.
//!
//! ```text
//! Configuring → Scanning ⇄ LoadingEager (serve) → Finalizing
//! Configuring → Scanning → BundleGenerating (build) → Finalizing
//! ```
//!
//! Scanning and eager loading interleave in serve mode (a request may load a
//! font module between two stylesheet transforms), so they share a rank.

use parking_lot::Mutex;
use std::fmt;
use thiserror::Error;

use super::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Configuring,
    Scanning,
    LoadingEager,
    BundleGenerating,
    Finalizing,
}

impl Phase {
    const fn rank(self) -> u8 {
        match self {
            Self::Configuring => 0,
            Self::Scanning | Self::LoadingEager => 1,
            Self::BundleGenerating => 2,
            Self::Finalizing => 3,
        }
    }

    /// Whether the phase exists in `mode`.
    const fn allowed_in(self, mode: Mode) -> bool {
        match self {
            Self::LoadingEager => matches!(mode, Mode::Serve),
            Self::BundleGenerating => matches!(mode, Mode::Build),
            _ => true,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configuring => "configuring",
            Self::Scanning => "scanning",
            Self::LoadingEager => "loading",
            Self::BundleGenerating => "bundle generation",
            Self::Finalizing => "finalizing",
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhaseError {
    #[error("cannot enter {to} after {from}")]
    OutOfOrder { from: Phase, to: Phase },

    #[error("{phase} does not run in {mode} mode")]
    WrongMode { phase: Phase, mode: Mode },
}

/// Current phase, advanced by the plugin hooks.
#[derive(Debug)]
pub struct PhaseTracker {
    current: Mutex<Phase>,
}

impl PhaseTracker {
    pub const fn new() -> Self {
        Self {
            current: Mutex::new(Phase::Configuring),
        }
    }

    pub fn current(&self) -> Phase {
        *self.current.lock()
    }

    /// Move to `to`. Never moves backwards.
    pub fn enter(&self, to: Phase, mode: Mode) -> Result<(), PhaseError> {
        if !to.allowed_in(mode) {
            return Err(PhaseError::WrongMode { phase: to, mode });
        }
        let mut current = self.current.lock();
        if to.rank() < current.rank() {
            return Err(PhaseError::OutOfOrder { from: *current, to });
        }
        *current = to;
        Ok(())
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
