//! What the plugin needs from the build tool driving it.

use std::sync::Arc;

pub use crate::font::ModuleResolver;

/// Emits a file into the bundle (build mode).
pub trait AssetEmitter: Send + Sync {
    /// Emit `source` under a name derived from `name` (e.g. `font.woff2`).
    ///
    /// Returns the final file name relative to the output directory; the
    /// emitter decides the directory and the content hash suffix.
    fn emit_asset(&self, name: &str, source: Vec<u8>) -> String;
}

/// Host services handed to [`super::FontPlugin::config_resolved`].
#[derive(Clone)]
pub struct HostBindings {
    pub modules: Arc<dyn ModuleResolver>,
    /// Required in build mode, unused in serve mode.
    pub emitter: Option<Arc<dyn AssetEmitter>>,
}

impl HostBindings {
    pub fn serve(modules: Arc<dyn ModuleResolver>) -> Self {
        Self {
            modules,
            emitter: None,
        }
    }

    pub fn build(modules: Arc<dyn ModuleResolver>, emitter: Arc<dyn AssetEmitter>) -> Self {
        Self {
            modules,
            emitter: Some(emitter),
        }
    }
}
