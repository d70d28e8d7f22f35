use std::sync::Arc;

use parking_lot::Mutex;

use crate::export::PluginExporter;
use crate::foundation::error::SceneportResult;
use crate::plugin::desc::PluginDesc;
use crate::plugin::value::PluginRef;
use crate::renderer::Renderer;

/// Renderer shared between the driving thread and the render loop.
pub type SharedRenderer = Arc<Mutex<Box<dyn Renderer>>>;

/// Plugin exporter registering plugins with a live renderer.
///
/// Unkeyed frames leave the renderer's current frame untouched.
pub struct LiveExporter {
    renderer: SharedRenderer,
}

impl LiveExporter {
    /// Export into `renderer`.
    pub fn new(renderer: SharedRenderer) -> Self {
        Self { renderer }
    }
}

impl std::fmt::Debug for LiveExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LiveExporter")
    }
}

impl PluginExporter for LiveExporter {
    fn export_plugin(&mut self, desc: &PluginDesc) -> SceneportResult<PluginRef> {
        self.renderer.lock().export_plugin(desc)
    }

    fn set_current_frame(&mut self, frame: Option<i32>) -> SceneportResult<()> {
        if let Some(frame) = frame {
            self.renderer.lock().set_current_frame(frame);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/renderer/live.rs"]
mod tests;
