use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

use anyhow::Context;
use parking_lot::Mutex;

use crate::foundation::core::{FrameRange, Resolution};
use crate::foundation::error::{SceneportError, SceneportResult};
use crate::foundation::math::{mat4_mul, mat4_translation};
use crate::host::binding::{DupliList, EngineHost, RenderResult, ReportLevel, SceneHandle};
use crate::host::model::{DupliDef, DupliObject, HostObject, ObjectId, ParticleKind};
use crate::renderer::image::PassType;

/// Serializable description of an in-memory host scene.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SceneDef {
    /// Scene name.
    pub name: String,
    /// Animation range.
    #[serde(default = "default_range")]
    pub frame_range: FrameRange,
    /// Current frame (defaults to the range start).
    #[serde(default)]
    pub frame_current: Option<i32>,
    /// Active layer mask.
    #[serde(default = "default_layers")]
    pub active_layers: u32,
    /// Output resolution.
    #[serde(default)]
    pub resolution: Resolution,
    /// Render layer names.
    #[serde(default = "default_render_layers")]
    pub render_layers: Vec<String>,
    /// Active camera.
    #[serde(default)]
    pub active_camera: Option<ObjectId>,
    /// Objects in host order.
    #[serde(default)]
    pub objects: Vec<HostObject>,
}

fn default_range() -> FrameRange {
    FrameRange::single(1)
}

fn default_layers() -> u32 {
    1
}

fn default_render_layers() -> Vec<String> {
    vec!["RenderLayer".to_owned()]
}

impl SceneDef {
    /// Empty single-frame scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frame_range: default_range(),
            frame_current: None,
            active_layers: default_layers(),
            resolution: Resolution::default(),
            render_layers: default_render_layers(),
            active_camera: None,
            objects: Vec::new(),
        }
    }

    /// Append an object.
    pub fn object(mut self, object: HostObject) -> Self {
        self.objects.push(object);
        self
    }
}

/// Reference host scene held in memory.
#[derive(Debug)]
pub struct MemoryScene {
    def: SceneDef,
    frame: AtomicI32,
    frame_sets: AtomicUsize,
    live_duplis: Arc<AtomicUsize>,
}

impl MemoryScene {
    /// Validate and wrap a scene description.
    pub fn new(def: SceneDef) -> SceneportResult<Self> {
        def.frame_range.validate()?;
        let mut ids = HashSet::new();
        for ob in &def.objects {
            if !ids.insert(ob.id) {
                return Err(SceneportError::validation(format!(
                    "duplicate object id {} ('{}')",
                    ob.id.0, ob.name
                )));
            }
        }
        if let Some(cam) = def.active_camera
            && !ids.contains(&cam)
        {
            return Err(SceneportError::validation(format!(
                "active camera {} is not a scene object",
                cam.0
            )));
        }
        let frame = def.frame_current.unwrap_or(def.frame_range.start);
        Ok(Self {
            def,
            frame: AtomicI32::new(frame),
            frame_sets: AtomicUsize::new(0),
            live_duplis: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Parse a scene description from JSON.
    pub fn from_json_str(s: &str) -> SceneportResult<Self> {
        Self::new(serde_json::from_str(s)?)
    }

    /// Read a scene description from a JSON file.
    pub fn from_path(path: &Path) -> SceneportResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read scene json '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Scene description.
    pub fn def(&self) -> &SceneDef {
        &self.def
    }

    /// Number of duplication lists resolved but not yet released.
    pub fn live_dupli_lists(&self) -> usize {
        self.live_duplis.load(Ordering::SeqCst)
    }

    /// Number of `frame_set` calls.
    pub fn frame_sets(&self) -> usize {
        self.frame_sets.load(Ordering::SeqCst)
    }

    fn source(&self, id: ObjectId, owner: &HostObject) -> SceneportResult<&HostObject> {
        self.object(id).ok_or_else(|| {
            SceneportError::validation(format!(
                "'{}' instances unknown object {}",
                owner.name, id.0
            ))
        })
    }
}

impl SceneHandle for MemoryScene {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn objects(&self) -> &[HostObject] {
        &self.def.objects
    }

    fn active_layers(&self) -> u32 {
        self.def.active_layers
    }

    fn frame_range(&self) -> FrameRange {
        self.def.frame_range
    }

    fn frame_current(&self) -> i32 {
        self.frame.load(Ordering::SeqCst)
    }

    fn frame_set(&self, frame: i32) {
        self.frame.store(frame, Ordering::SeqCst);
        self.frame_sets.fetch_add(1, Ordering::SeqCst);
    }

    fn dupli_list(&self, object: &HostObject, frame: i32) -> SceneportResult<DupliList> {
        let base = object.matrix_world_at(frame);
        let mut out = Vec::new();
        match &object.dupli {
            Some(DupliDef::Group { objects }) => {
                for (i, &id) in objects.iter().enumerate() {
                    let src = self.source(id, object)?;
                    let m = mat4_mul(&base, &src.matrix_world_at(frame));
                    out.push(DupliObject::new(id, &[i as i32], m));
                }
            }
            Some(DupliDef::Array {
                object: id,
                count,
                offset,
            }) => {
                self.source(*id, object)?;
                for i in 0..*count {
                    let t = offset.map(|c| c * i as f32);
                    let m = mat4_mul(&base, &mat4_translation(t));
                    out.push(DupliObject::new(*id, &[i as i32], m));
                }
            }
            None => {}
        }
        for (si, ps) in object.render_particle_systems() {
            let Some(id) = ps.instance_object else {
                continue;
            };
            if ps.kind != ParticleKind::Emitter {
                continue;
            }
            self.source(id, object)?;
            for (pi, p) in ps.particles.iter().enumerate() {
                out.push(DupliObject::particle(id, si, pi, p));
            }
        }

        self.live_duplis.fetch_add(1, Ordering::SeqCst);
        let live = Arc::clone(&self.live_duplis);
        Ok(DupliList::new(out).on_release(move || {
            live.fetch_sub(1, Ordering::SeqCst);
        }))
    }

    fn render_layers(&self) -> Vec<String> {
        self.def.render_layers.clone()
    }

    fn resolution(&self) -> Resolution {
        self.def.resolution
    }

    fn active_camera(&self) -> Option<ObjectId> {
        self.def.active_camera
    }
}

/// Everything a [`RecordingEngine`] has been told.
#[derive(Clone, Debug, Default)]
pub struct EngineLog {
    /// Progress values in call order.
    pub progress: Vec<f32>,
    /// Reports in call order.
    pub reports: Vec<(ReportLevel, String)>,
    /// Number of results opened.
    pub results_begun: usize,
    /// Number of partial result pushes.
    pub result_updates: usize,
    /// Closed results with their cancel flag.
    pub results_ended: Vec<(RenderResult, bool)>,
}

impl EngineLog {
    /// Messages reported at `level`.
    pub fn messages(&self, level: ReportLevel) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.as_str())
            .collect()
    }
}

type BreakHook = Box<dyn Fn(&EngineLog) -> bool + Send + Sync>;

/// Reference render engine that records every call.
#[derive(Default)]
pub struct RecordingEngine {
    log: Mutex<EngineLog>,
    break_requested: AtomicBool,
    break_hook: Mutex<Option<BreakHook>>,
}

impl RecordingEngine {
    /// Create an engine with no pending interruption.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request interruption (as if the user pressed escape).
    pub fn request_break(&self) {
        self.break_requested.store(true, Ordering::SeqCst);
    }

    /// Request interruption as soon as `when` holds for the recorded calls.
    pub fn break_when(&self, when: impl Fn(&EngineLog) -> bool + Send + Sync + 'static) {
        *self.break_hook.lock() = Some(Box::new(when));
    }

    /// Snapshot of the recorded calls.
    pub fn log(&self) -> EngineLog {
        self.log.lock().clone()
    }
}

impl std::fmt::Debug for RecordingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingEngine")
            .field("break_requested", &self.break_requested.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl EngineHost for RecordingEngine {
    fn update_progress(&self, fraction: f32) {
        self.log.lock().progress.push(fraction);
    }

    fn report(&self, level: ReportLevel, message: &str) {
        match level {
            ReportLevel::Info => tracing::info!(target: "sceneport::host", "{message}"),
            ReportLevel::Warning => tracing::warn!(target: "sceneport::host", "{message}"),
            ReportLevel::Error => tracing::error!(target: "sceneport::host", "{message}"),
        }
        self.log.lock().reports.push((level, message.to_owned()));
    }

    fn test_break(&self) -> bool {
        if self.break_requested.load(Ordering::SeqCst) {
            return true;
        }
        let hook = self.break_hook.lock();
        let Some(when) = hook.as_ref() else {
            return false;
        };
        if when(&self.log.lock()) {
            self.break_requested.store(true, Ordering::SeqCst);
            return true;
        }
        false
    }

    fn begin_result(&self, layer: &str, size: Resolution) -> Option<RenderResult> {
        self.log.lock().results_begun += 1;
        Some(RenderResult::new(
            layer,
            size,
            &[PassType::Combined, PassType::Z],
        ))
    }

    fn update_result(&self, _result: &RenderResult) {
        self.log.lock().result_updates += 1;
    }

    fn end_result(&self, result: &RenderResult, cancel: bool) {
        self.log.lock().results_ended.push((result.clone(), cancel));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/memory.rs"]
mod tests;
