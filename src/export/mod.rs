//! Plugin export seam.
//!
//! The scene walker hands every plugin description to a [`PluginExporter`]. File targets write
//! vrscene text ([`crate::writer::vrscene::VrsceneExporter`]), live targets forward to a running
//! renderer ([`crate::renderer::live::LiveExporter`]).

use crate::foundation::error::SceneportResult;
use crate::plugin::desc::PluginDesc;
use crate::plugin::schema::conform;
use crate::plugin::value::PluginRef;

/// Sink contract for exported plugin descriptions.
///
/// Ordering contract: plugins arrive in walk order; references may point forward or backward.
pub trait PluginExporter: Send {
    /// Export one plugin instance and return a reference to it.
    fn export_plugin(&mut self, desc: &PluginDesc) -> SceneportResult<PluginRef>;

    /// Frame that subsequently exported values belong to (`None` for unkeyed export).
    fn set_current_frame(&mut self, _frame: Option<i32>) -> SceneportResult<()> {
        Ok(())
    }

    /// Called once after a walk pass.
    fn flush(&mut self) -> SceneportResult<()> {
        Ok(())
    }
}

/// In-memory exporter for tests and debugging.
///
/// Descriptions are conformed to their schema before being stored, so the captured attributes
/// match what a file writer would emit.
#[derive(Debug, Default)]
pub struct MemoryExporter {
    frame: Option<i32>,
    plugins: Vec<(Option<i32>, PluginDesc)>,
    flushes: usize,
}

impl MemoryExporter {
    /// Create an empty exporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow captured `(frame, plugin)` pairs in export order.
    pub fn plugins(&self) -> &[(Option<i32>, PluginDesc)] {
        &self.plugins
    }

    /// Names of captured plugins in export order.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|(_, d)| d.name.as_str()).collect()
    }

    /// Last captured plugin with `name`.
    pub fn find(&self, name: &str) -> Option<&PluginDesc> {
        self.plugins
            .iter()
            .rev()
            .find(|(_, d)| d.name == name)
            .map(|(_, d)| d)
    }

    /// Number of captured plugins of type `plugin_id`.
    pub fn count_of(&self, plugin_id: &str) -> usize {
        self.plugins
            .iter()
            .filter(|(_, d)| d.plugin_id == plugin_id)
            .count()
    }

    /// Number of `flush` calls.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Drop captured plugins.
    pub fn clear(&mut self) {
        self.plugins.clear();
    }
}

impl PluginExporter for MemoryExporter {
    fn export_plugin(&mut self, desc: &PluginDesc) -> SceneportResult<PluginRef> {
        let desc = conform(desc)?;
        let r = desc.plugin_ref();
        self.plugins.push((self.frame, desc));
        Ok(r)
    }

    fn set_current_frame(&mut self, frame: Option<i32>) -> SceneportResult<()> {
        self.frame = frame;
        Ok(())
    }

    fn flush(&mut self) -> SceneportResult<()> {
        self.flushes += 1;
        Ok(())
    }
}
