//! `[fonts]` section configuration.
//!
//! ```toml
//! [fonts]
//! format = "woff2"              # Default output format
//! source_map = false            # Source maps for rewritten files
//! command = ["pyftsubset"]      # Subsetting program and leading arguments
//!
//! [[fonts.declare]]
//! path = "./src/fonts/biantaoti.woff"
//! text = "中文"
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::font::{CommandSubsetter, FontDeclaration, FontFormat};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontsConfig {
    pub format: Option<FontFormat>,
    pub source_map: bool,
    pub command: Vec<String>,
    pub declare: Vec<FontDeclaration>,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            format: None,
            source_map: false,
            command: vec![CommandSubsetter::DEFAULT_COMMAND.into()],
            declare: Vec::new(),
        }
    }
}

pub struct FontsConfigFields {
    pub command: FieldPath,
    pub declare: FieldPath,
}

impl FontsConfig {
    pub const FIELDS: FontsConfigFields = FontsConfigFields {
        command: FieldPath::new("fonts.command"),
        declare: FieldPath::new("fonts.declare"),
    };

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.command.first().is_none_or(|program| program.trim().is_empty()) {
            diag.error_with_hint(
                Self::FIELDS.command,
                "subset command must not be empty",
                format!("remove it to use `{}`", CommandSubsetter::DEFAULT_COMMAND),
            );
        }

        if self.declare.is_empty() {
            diag.hint(Self::FIELDS.declare, "no fonts declared, nothing will be subset");
        }

        for (i, decl) in self.declare.iter().enumerate() {
            if decl.path.trim().is_empty() {
                diag.error(Self::FIELDS.declare, format!("declaration #{} has an empty path", i + 1));
            } else if decl.required_text().is_empty() {
                diag.hint(
                    Self::FIELDS.declare,
                    format!("`{}` keeps no characters", decl.path),
                );
            }
        }
    }

    pub fn subsetter(&self) -> CommandSubsetter {
        CommandSubsetter::new(self.command.clone())
    }
}
