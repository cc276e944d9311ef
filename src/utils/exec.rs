//! External command execution.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! let output = Cmd::from_slice(&["pyftsubset"])
//!     .arg("font.ttf")
//!     .arg("--text=abc")
//!     .output()?;
//! ```

use std::{
    ffi::{OsStr, OsString},
    io,
    process::{Command, Output, Stdio},
};

use crate::debug;

/// Command builder for external process execution.
#[derive(Debug, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
}

impl Cmd {
    /// Create from a command array (e.g., `["pyftsubset"]` or `["uvx", "--from", "fonttools", "pyftsubset"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        let args: Vec<_> = iter.map(|s| s.as_ref().to_owned()).collect();
        Self { program, args }
    }

    /// Add a single argument. Empty arguments are dropped.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Run to completion, capturing stdout and stderr.
    ///
    /// A non-zero exit is not an error here; callers inspect `status`.
    pub fn output(self) -> io::Result<Output> {
        debug!("exec"; "{} {}", self.program.to_string_lossy(), self.args_display());

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        cmd.output()
    }

    fn args_display(&self) -> String {
        self.args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
