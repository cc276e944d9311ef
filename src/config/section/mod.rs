//! Configuration section definitions.
//!
//! | Section       | Purpose                                        |
//! |---------------|------------------------------------------------|
//! | `[project]`   | Source, public, output, cache paths and aliases |
//! | `[fonts]`     | Declarations, default format, subset command    |
//! | `[serve]`     | Development server                              |
//! | `[log]`       | Logging                                         |

mod fonts;
mod log;
mod project;
mod serve;

pub use fonts::FontsConfig;
pub use log::LogConfig;
pub use project::ProjectConfig;
pub use serve::ServeConfig;
