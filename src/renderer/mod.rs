//! Renderer SDK surface.
//!
//! A [`RendererRuntime`] is loaded once per extension and hands out one [`Renderer`] per render
//! session. Renderer notifications are delivered as [`RendererEvent`] messages on a channel that
//! the session's render loop drains; they are never raw callbacks into host state.

use std::sync::mpsc::Receiver;

use crate::foundation::core::Resolution;
use crate::foundation::error::SceneportResult;
use crate::plugin::desc::PluginDesc;
use crate::plugin::value::PluginRef;

/// Rendered image buffers and pass kinds.
pub mod image;
/// Plugin exporter feeding a live renderer.
pub mod live;
/// Simulated in-process renderer.
pub mod sim;

use self::image::{PassType, RenderImage};

/// Asynchronous renderer notification.
#[derive(Clone, Debug, PartialEq)]
pub enum RendererEvent {
    /// New partial pixels are available for the current frame.
    ImageUpdated,
    /// `frame` is fully rendered.
    ImageReady {
        /// Frame the image belongs to.
        frame: i32,
    },
    /// The renderer gave up on the current frame.
    Aborted {
        /// Human readable cause.
        reason: String,
    },
}

/// One live connection to an external renderer.
///
/// Calls are serialized by the owning session; implementations only need to be `Send`.
pub trait Renderer: Send {
    /// Register or replace a plugin instance.
    fn export_plugin(&mut self, desc: &PluginDesc) -> SceneportResult<PluginRef>;
    /// Frame that the next render belongs to.
    fn set_current_frame(&mut self, frame: i32);
    /// Start rendering the current frame. Restarts a render in progress.
    fn start(&mut self) -> SceneportResult<()>;
    /// Stop rendering. No-op when idle.
    fn stop(&mut self);
    /// Fetch the latest pixels of a pass.
    fn get_pass(&self, pass: PassType) -> Option<RenderImage>;
    /// Show or hide the renderer's own frame buffer window.
    fn show_frame_buffer(&mut self, show: bool);
    /// Take the notification channel. Returns `None` after the first call.
    fn events(&mut self) -> Option<Receiver<RendererEvent>>;
    /// Stop rendering and free renderer-side resources. Idempotent.
    fn shutdown(&mut self);
}

/// Loaded renderer library.
pub trait RendererRuntime: Send + Sync {
    /// Display name.
    fn name(&self) -> &str;
    /// One-time library initialization (licensing, runtime lookup).
    fn initialize(&self) -> SceneportResult<()>;
    /// Open a renderer for images of `size`. Fails with an init error when unreachable.
    fn connect(&self, size: Resolution) -> SceneportResult<Box<dyn Renderer>>;
}
