//! `[log]` section configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Print `debug!` lines.
    pub verbose: bool,
    /// Clear the terminal when the dev server starts.
    pub clear_screen: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            clear_screen: true,
        }
    }
}
