use std::path::PathBuf;
use std::sync::Arc;

use crate::foundation::core::{FrameRange, Resolution};
use crate::foundation::error::{SceneportError, SceneportResult};
use crate::foundation::math::Mat4;
use crate::host::context::HostContext;
use crate::host::model::{DupliObject, HostObject, ObjectId};
use crate::renderer::image::{PassType, RenderImage};
use crate::session::settings::RenderSettings;

/// Read-only scene graph of one render invocation.
///
/// Every method reads host state and must be called with the host context held.
pub trait SceneHandle: Send + Sync {
    /// Scene name.
    fn name(&self) -> &str;
    /// Top-level objects in host order.
    fn objects(&self) -> &[HostObject];
    /// Look up an object by id.
    fn object(&self, id: ObjectId) -> Option<&HostObject> {
        self.objects().iter().find(|o| o.id == id)
    }
    /// Bit mask of the active layers.
    fn active_layers(&self) -> u32;
    /// Scene animation range.
    fn frame_range(&self) -> FrameRange;
    /// Current frame.
    fn frame_current(&self) -> i32;
    /// Move the scene to `frame` (re-evaluates animated state).
    fn frame_set(&self, frame: i32);
    /// Resolve the instances a duplicator produces at `frame`.
    fn dupli_list(&self, object: &HostObject, frame: i32) -> SceneportResult<DupliList>;
    /// Names of the render layers.
    fn render_layers(&self) -> Vec<String>;
    /// Output resolution.
    fn resolution(&self) -> Resolution;
    /// Active scene camera.
    fn active_camera(&self) -> Option<ObjectId>;
}

/// Resolved instances of one duplicator, released when dropped.
pub struct DupliList {
    objects: Vec<DupliObject>,
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl DupliList {
    /// Wrap resolved instances.
    pub fn new(objects: Vec<DupliObject>) -> Self {
        Self {
            objects,
            on_release: None,
        }
    }

    /// Run `f` when the list is released.
    pub fn on_release(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_release = Some(Box::new(f));
        self
    }

    /// Resolved instances.
    pub fn objects(&self) -> &[DupliObject] {
        &self.objects
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Return `true` when nothing was instanced.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Drop for DupliList {
    fn drop(&mut self) {
        if let Some(f) = self.on_release.take() {
            f();
        }
    }
}

impl std::fmt::Debug for DupliList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DupliList")
            .field("objects", &self.objects.len())
            .finish()
    }
}

/// Severity of a report shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportLevel {
    /// Informational.
    Info,
    /// Recoverable problem.
    Warning,
    /// Failure.
    Error,
}

/// One pass of a host render result.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderPass {
    /// Pass kind.
    pub pass: PassType,
    /// Latest pixels, once fetched.
    pub image: Option<RenderImage>,
}

/// Host-side accumulator for one render layer's pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderResult {
    /// Render layer name.
    pub layer: String,
    /// Result size.
    pub size: Resolution,
    /// Requested passes.
    pub passes: Vec<RenderPass>,
}

impl RenderResult {
    /// Result with empty `passes`.
    pub fn new(layer: impl Into<String>, size: Resolution, passes: &[PassType]) -> Self {
        Self {
            layer: layer.into(),
            size,
            passes: passes
                .iter()
                .map(|&pass| RenderPass { pass, image: None })
                .collect(),
        }
    }

    /// Combined pass pixels, if fetched.
    pub fn combined(&self) -> Option<&RenderImage> {
        self.passes
            .iter()
            .find(|p| p.pass == PassType::Combined)
            .and_then(|p| p.image.as_ref())
    }
}

/// Host render engine services: progress, reports, interruption, render results.
///
/// Every method except [`EngineHost::test_break`] must be called with the host context held.
/// `test_break` only reads a flag and may be polled from any thread.
pub trait EngineHost: Send + Sync {
    /// Report overall progress in `[0, 1]`.
    fn update_progress(&self, fraction: f32);
    /// Show a message to the user.
    fn report(&self, level: ReportLevel, message: &str);
    /// Return `true` when the user requested interruption.
    fn test_break(&self) -> bool;
    /// Open a render result for `layer`, or `None` when the host declines.
    fn begin_result(&self, layer: &str, size: Resolution) -> Option<RenderResult>;
    /// Push partial pixels of an open result.
    fn update_result(&self, result: &RenderResult);
    /// Close a result; `cancel` discards it.
    fn end_result(&self, result: &RenderResult, cancel: bool);
}

/// User preferences relevant to exporting.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserPreferences {
    /// Directory relative file targets resolve against.
    pub export_dir: PathBuf,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("."),
        }
    }
}

/// Viewport region size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Interactive viewport state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
    /// View matrix (row-major, world to view).
    pub view_matrix: Mat4,
    /// Perspective (`true`) or orthographic projection.
    pub perspective: bool,
    /// Lens field of view in radians.
    pub fov: f32,
}

/// Raw, possibly missing handles as handed over by the host at session creation.
#[derive(Default)]
pub struct HostHandles {
    /// Render engine.
    pub engine: Option<Arc<dyn EngineHost>>,
    /// Scene data.
    pub scene: Option<Arc<dyn SceneHandle>>,
    /// Host execution context.
    pub context: Option<HostContext>,
    /// User preferences.
    pub preferences: Option<UserPreferences>,
    /// Viewport region (interactive sessions).
    pub region: Option<Region>,
    /// Viewport state (interactive sessions).
    pub view: Option<ViewState>,
    /// Render settings.
    pub settings: Option<RenderSettings>,
}

/// Validated, typed host capabilities for one session.
#[derive(Clone)]
pub struct HostBinding {
    /// Render engine.
    pub engine: Arc<dyn EngineHost>,
    /// Scene data.
    pub scene: Arc<dyn SceneHandle>,
    /// Host execution context.
    pub context: HostContext,
    /// User preferences.
    pub preferences: UserPreferences,
    /// Viewport region (interactive sessions).
    pub region: Option<Region>,
    /// Viewport state (interactive sessions).
    pub view: Option<ViewState>,
}

impl HostBinding {
    /// Validate raw handles. Engine and scene are required; the rest have defaults.
    pub fn from_handles(
        handles: HostHandles,
    ) -> SceneportResult<(Self, Option<RenderSettings>)> {
        let engine = handles
            .engine
            .ok_or_else(|| SceneportError::validation("host handle 'engine' is missing"))?;
        let scene = handles
            .scene
            .ok_or_else(|| SceneportError::validation("host handle 'scene' is missing"))?;
        let binding = Self {
            engine,
            scene,
            context: handles.context.unwrap_or_default(),
            preferences: handles.preferences.unwrap_or_default(),
            region: handles.region,
            view: handles.view,
        };
        Ok((binding, handles.settings))
    }
}

impl std::fmt::Debug for HostBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBinding")
            .field("scene", &self.scene.name())
            .field("preferences", &self.preferences)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/binding.rs"]
mod tests;
