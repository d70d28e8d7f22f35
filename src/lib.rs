//! Sceneport translates a host 3D application's scene into renderer plugin descriptions.
//!
//! The same scene walk feeds two targets:
//!
//! - vrscene text files ([`writer::vrscene::VrsceneExporter`]), optionally split by category
//!   and with hex or zip encoded lists
//! - a live renderer ([`renderer::Renderer`]) whose progress and partial images flow back into
//!   the host while the walk thread waits on it
//!
//! Hosts drive everything through [`Extension`]: `load` a renderer runtime, `init` a session
//! from raw host handles, then `export`, `update`, `draw` and `free` it.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod foundation;

/// Host-facing extension entry points.
pub mod api;
/// Plugin export seam shared by file and live targets.
pub mod export;
/// Host interop adapter.
pub mod host;
/// Renderer plugin descriptions and attribute schema.
pub mod plugin;
/// Renderer SDK surface and the simulated reference renderer.
pub mod renderer;
/// Scene walk, object identity and the node cache.
pub mod scene;
/// Export sessions, render sessions and settings.
pub mod session;
/// vrscene text writer and reader.
pub mod writer;

pub use crate::foundation::core::{FrameRange, Resolution};
pub use crate::foundation::error::{SceneportError, SceneportResult};
pub use crate::foundation::math::{
    AColor, Color, MAT4_IDENTITY, Mat4, Matrix3, Transform, Vector2, Vector3, mat4_mul,
    mat4_translation,
};

pub use crate::api::{Extension, SessionId};
pub use crate::export::{MemoryExporter, PluginExporter};
pub use crate::host::binding::{HostBinding, HostHandles, Region, ViewState};
pub use crate::host::context::{HostContext, HostGuard};
pub use crate::host::memory::{MemoryScene, RecordingEngine, SceneDef};
pub use crate::plugin::desc::{PluginCategory, PluginDesc};
pub use crate::plugin::value::{AttrValue, PluginRef};
pub use crate::renderer::image::{PassType, RenderImage};
pub use crate::renderer::sim::{SimOptions, SimRuntime};
pub use crate::renderer::{Renderer, RendererEvent, RendererRuntime};
pub use crate::scene::walker::WalkReport;
pub use crate::session::exporter::{ExportOutcome, SceneExporter, SessionState};
pub use crate::session::settings::{
    AnimationMode, AnimationSettings, ExportTarget, FileTarget, LiveTarget, RenderSettings,
};
pub use crate::writer::format::ExportFormat;
