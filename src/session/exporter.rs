use std::sync::Arc;

use crate::export::PluginExporter;
use crate::foundation::core::{FrameRange, Resolution};
use crate::foundation::error::{SceneportError, SceneportResult};
use crate::foundation::math::Transform;
use crate::host::binding::{HostBinding, Region, ReportLevel, ViewState};
use crate::host::context::HostGuard;
use crate::host::model::{HostObject, ObjectId, ObjectKind};
use crate::plugin::desc::{PluginCategory, PluginDesc};
use crate::renderer::RendererRuntime;
use crate::renderer::image::{PassType, RenderImage};
use crate::scene::cache::NodeCache;
use crate::scene::walker::{SceneWalker, WalkReport};
use crate::session::progress::ProgressTracker;
use crate::session::render_session::RenderSession;
use crate::session::render_state::WaitOutcome;
use crate::session::settings::{AnimationMode, RenderSettings};
use crate::writer::vrscene::{FileOutputs, VrsceneExporter, VrsceneOpts};

/// Lifecycle state of a [`SceneExporter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing acquired.
    Idle,
    /// Render session acquired (live targets) and ready to export.
    Initialized,
    /// Walking the scene.
    Syncing,
    /// The renderer is working on a frame.
    Rendering,
    /// Rendering finished, was stopped, or failed.
    Stopped,
    /// Everything released; terminal.
    Released,
}

/// Result of one export run. Interrupted and aborted runs keep the frames finished before.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Every frame was exported (and rendered, for live targets).
    Completed {
        /// Frames in the run.
        frames: u32,
    },
    /// The user interrupted the run.
    Interrupted {
        /// Frames fully finished before the interruption.
        frames_done: u32,
        /// Frames in the run.
        frames_total: u32,
    },
    /// The renderer gave up on a frame.
    Aborted {
        /// Frames fully finished before the failure.
        frames_done: u32,
        /// Renderer supplied cause.
        reason: String,
    },
}

impl ExportOutcome {
    /// Frames fully finished.
    pub fn frames_done(&self) -> u32 {
        match self {
            Self::Completed { frames } => *frames,
            Self::Interrupted { frames_done, .. } | Self::Aborted { frames_done, .. } => {
                *frames_done
            }
        }
    }

    /// Return `true` unless every frame finished.
    pub fn is_partial(&self) -> bool {
        !matches!(self, Self::Completed { .. })
    }
}

#[derive(Clone, Copy, Debug)]
struct FramePlan {
    /// Frame the exported values and rendered image belong to.
    frame: i32,
    /// Scene frame to move to before walking.
    scene_frame: Option<i32>,
    camera: Option<ObjectId>,
}

/// Cameras of a camera-loop run: render-visible cameras sorted by name, ties broken by id.
pub fn camera_loop_order(objects: &[HostObject]) -> Vec<&HostObject> {
    let mut cams: Vec<&HostObject> = objects
        .iter()
        .filter(|o| o.kind == ObjectKind::Camera && !o.hide_render)
        .collect();
    cams.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    cams
}

/// Drives scene export and rendering for one host render invocation.
///
/// `Idle -> Initialized -> Syncing -> Rendering -> (Syncing | Stopped)`, terminal `Released`.
/// Every host-facing call takes the [`HostGuard`] proving the host context is held; waits on the
/// renderer release it.
pub struct SceneExporter {
    binding: HostBinding,
    settings: Arc<RenderSettings>,
    state: SessionState,
    cache: NodeCache,
    session: Option<RenderSession>,
}

impl SceneExporter {
    /// Create an idle exporter.
    pub fn new(binding: HostBinding, settings: Arc<RenderSettings>) -> SceneportResult<Self> {
        settings.validate()?;
        Ok(Self {
            binding,
            settings,
            state: SessionState::Idle,
            cache: NodeCache::new(),
            session: None,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Settings of this invocation.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Host capabilities.
    pub fn binding(&self) -> &HostBinding {
        &self.binding
    }

    /// Live render session, when rendering to a live target.
    pub fn render_session(&self) -> Option<&RenderSession> {
        self.session.as_ref()
    }

    /// Nodes retained across interactive updates.
    pub fn cached_nodes(&self) -> usize {
        self.cache.len()
    }

    /// Output resolution (settings override, else the scene's).
    pub fn resolution(&self) -> Resolution {
        self.settings
            .resolution
            .unwrap_or_else(|| self.binding.scene.resolution())
    }

    /// Timeline range (settings override, else the scene's).
    pub fn frame_range(&self) -> FrameRange {
        self.settings
            .frame_range
            .unwrap_or_else(|| self.binding.scene.frame_range())
    }

    /// Acquire the render session. File targets need no renderer and ignore `runtime`.
    #[tracing::instrument(skip_all, fields(scene = %self.binding.scene.name()))]
    pub fn init(
        &mut self,
        _host: &HostGuard<'_>,
        runtime: Option<&dyn RendererRuntime>,
    ) -> SceneportResult<()> {
        if self.state != SessionState::Idle {
            return Err(SceneportError::validation(format!(
                "init in state {:?}",
                self.state
            )));
        }
        if let Some(target) = self.settings.live_target() {
            let opened = runtime
                .ok_or_else(|| SceneportError::init("no renderer runtime is loaded"))
                .and_then(|rt| {
                    RenderSession::open(
                        rt,
                        &self.binding,
                        target,
                        self.resolution(),
                        self.settings.poll_interval(),
                    )
                });
            match opened {
                Ok(session) => self.session = Some(session),
                Err(e) => {
                    self.binding.engine.report(ReportLevel::Error, &e.to_string());
                    return Err(e);
                }
            }
        }
        self.state = SessionState::Initialized;
        Ok(())
    }

    fn check_ready(&self, op: &str) -> SceneportResult<()> {
        match self.state {
            SessionState::Initialized | SessionState::Rendering | SessionState::Stopped => Ok(()),
            s => Err(SceneportError::validation(format!("{op} in state {s:?}"))),
        }
    }

    /// Run a full export: every planned frame is synced and, for live targets, rendered to
    /// completion before the next one starts.
    ///
    /// Interruption is checked before each frame, during the walk and while waiting on the
    /// renderer. Fatal errors are reported to the host before being returned.
    #[tracing::instrument(skip_all, fields(scene = %self.binding.scene.name()))]
    pub fn export(&mut self, host: &mut HostGuard<'_>) -> SceneportResult<ExportOutcome> {
        self.check_ready("export")?;
        let plans = self.plan_frames()?;
        let scene = Arc::clone(&self.binding.scene);
        let original_frame = scene.frame_current();
        self.cache.clear();

        let res = if self.settings.file_target().is_some() {
            self.export_files(host, &plans)
        } else {
            self.render_frames(host, &plans)
        };

        if scene.frame_current() != original_frame {
            scene.frame_set(original_frame);
        }
        self.cache.clear();
        if self.state != SessionState::Released {
            self.state = SessionState::Stopped;
        }
        match &res {
            Ok(outcome) => tracing::info!(?outcome, "export finished"),
            Err(e) => {
                tracing::error!(error = %e, "export failed");
                self.binding.engine.report(ReportLevel::Error, &e.to_string());
            }
        }
        res
    }

    /// Re-sync the current frame into the live renderer and restart it without waiting.
    ///
    /// Nodes unchanged since the previous update are not sent again.
    #[tracing::instrument(skip_all)]
    pub fn update(&mut self, host: &mut HostGuard<'_>) -> SceneportResult<WalkReport> {
        self.check_ready("update")?;
        let session = self.session.as_ref().ok_or_else(|| {
            SceneportError::validation("interactive update needs a live render target")
        })?;
        let mut exporter = session.exporter()?;
        let scene = Arc::clone(&self.binding.scene);
        let plan = FramePlan {
            frame: scene.frame_current(),
            scene_frame: None,
            camera: scene.active_camera(),
        };
        let walk = self.sync_frame(host, &mut exporter, &plan, (plan.frame, plan.frame), false)?;
        if walk.interrupted {
            self.state = SessionState::Stopped;
            return Ok(walk);
        }
        if let Some(session) = &self.session {
            session.reset_progress(1);
            session.start_frame(host, plan.frame, &scene.render_layers())?;
            self.state = SessionState::Rendering;
        }
        Ok(walk)
    }

    /// Replace the viewport state used by later syncs. Returns `true` when it changed.
    pub fn set_view(&mut self, view: Option<ViewState>) -> bool {
        if self.binding.view == view {
            return false;
        }
        self.binding.view = view;
        true
    }

    /// Latest combined pass resampled to the viewport.
    pub fn draw(&self, viewport: Region) -> SceneportResult<Option<RenderImage>> {
        let Some(img) = self
            .session
            .as_ref()
            .and_then(|s| s.latest_image(PassType::Combined))
        else {
            return Ok(None);
        };
        Ok(Some(img.resized(Resolution::new(viewport.width, viewport.height)?)?))
    }

    /// Stop rendering. No-op unless a frame is rendering.
    pub fn stop(&mut self, host: &HostGuard<'_>) {
        if self.state != SessionState::Rendering {
            return;
        }
        if let Some(session) = &self.session {
            session.stop(host);
        }
        self.state = SessionState::Stopped;
    }

    /// Release the render session. Idempotent; also runs on drop.
    pub fn release(&mut self) {
        if self.state == SessionState::Released {
            return;
        }
        if let Some(mut session) = self.session.take() {
            session.release();
        }
        self.cache.clear();
        self.state = SessionState::Released;
        tracing::debug!("scene exporter released");
    }

    fn plan_frames(&self) -> SceneportResult<Vec<FramePlan>> {
        let scene = &self.binding.scene;
        let camera = scene.active_camera();
        match self.settings.animation.mode {
            AnimationMode::Off => Ok(vec![FramePlan {
                frame: scene.frame_current(),
                scene_frame: None,
                camera,
            }]),
            AnimationMode::Timeline => Ok(self
                .frame_range()
                .frames()
                .map(|f| FramePlan {
                    frame: f,
                    scene_frame: Some(f),
                    camera,
                })
                .collect()),
            AnimationMode::CameraLoop => {
                let cams = camera_loop_order(scene.objects());
                if cams.is_empty() {
                    return Err(SceneportError::validation(
                        "camera loop needs at least one render-visible camera",
                    ));
                }
                Ok(cams
                    .iter()
                    .enumerate()
                    .map(|(i, cam)| FramePlan {
                        frame: i as i32,
                        scene_frame: None,
                        camera: Some(cam.id),
                    })
                    .collect())
            }
        }
    }

    fn export_files(
        &mut self,
        host: &mut HostGuard<'_>,
        plans: &[FramePlan],
    ) -> SceneportResult<ExportOutcome> {
        let target = self
            .settings
            .file_target()
            .cloned()
            .ok_or_else(|| SceneportError::validation("no file target"))?;
        let (dir, base_name) = target.resolve(&self.binding.preferences.export_dir)?;
        let opts = VrsceneOpts {
            base_name,
            format: target.format,
            split: target.split,
        };
        let mut out = VrsceneExporter::new(opts, FileOutputs::new(dir))?;
        self.run_frames(host, plans, &mut out)
    }

    fn render_frames(
        &mut self,
        host: &mut HostGuard<'_>,
        plans: &[FramePlan],
    ) -> SceneportResult<ExportOutcome> {
        let mut exporter = self
            .session
            .as_ref()
            .ok_or_else(|| SceneportError::validation("live export without a render session"))?
            .exporter()?;
        self.run_frames(host, plans, &mut exporter)
    }

    fn run_frames(
        &mut self,
        host: &mut HostGuard<'_>,
        plans: &[FramePlan],
        exporter: &mut dyn PluginExporter,
    ) -> SceneportResult<ExportOutcome> {
        let engine = Arc::clone(&self.binding.engine);
        let scene = Arc::clone(&self.binding.scene);
        let animation = self.settings.is_animation();
        let live = self.settings.live_target().is_some();
        let total = plans.len() as u32;
        let span = match (plans.first(), plans.last()) {
            (Some(a), Some(b)) => (a.frame, b.frame),
            _ => return Ok(ExportOutcome::Completed { frames: 0 }),
        };
        let mut tracker = ProgressTracker::new(total);
        if let Some(session) = &self.session {
            session.reset_progress(total);
        }

        for (i, plan) in plans.iter().enumerate() {
            let done = i as u32;
            if engine.test_break() {
                tracing::info!(frames_done = done, "export interrupted between frames");
                return Ok(ExportOutcome::Interrupted {
                    frames_done: done,
                    frames_total: total,
                });
            }
            if let Some(f) = plan.scene_frame {
                scene.frame_set(f);
            }
            tracing::info!(frame = plan.frame, "frame {}/{}", i + 1, total);
            if animation && !live {
                exporter.set_current_frame(Some(plan.frame))?;
            }

            let walk = self.sync_frame(host, exporter, plan, span, !animation)?;
            tracing::debug!(?walk, "frame synced");
            if walk.interrupted {
                return Ok(ExportOutcome::Interrupted {
                    frames_done: done,
                    frames_total: total,
                });
            }

            let progress = match &self.session {
                Some(session) if live => {
                    self.state = SessionState::Rendering;
                    session.start_frame(host, plan.frame, &scene.render_layers())?;
                    match session.wait_frame(host, plan.frame) {
                        WaitOutcome::Ready => session.finish_frame(host, false),
                        WaitOutcome::Interrupted => {
                            tracing::info!(frames_done = done, "render interrupted");
                            session.stop(host);
                            return Ok(ExportOutcome::Interrupted {
                                frames_done: done,
                                frames_total: total,
                            });
                        }
                        WaitOutcome::Aborted(reason) => {
                            session.stop(host);
                            engine.report(ReportLevel::Error, &format!("Render aborted: {reason}"));
                            return Ok(ExportOutcome::Aborted {
                                frames_done: done,
                                reason,
                            });
                        }
                    }
                    session.frame_done()
                }
                _ => tracker.frame_done(),
            };
            if animation {
                engine.update_progress(progress);
            }
        }

        if let Some(session) = &self.session
            && live
        {
            engine.update_progress(session.finish_progress());
        } else if animation {
            engine.update_progress(tracker.finish());
        }
        Ok(ExportOutcome::Completed { frames: total })
    }

    fn sync_frame(
        &mut self,
        host: &HostGuard<'_>,
        exporter: &mut dyn PluginExporter,
        plan: &FramePlan,
        span: (i32, i32),
        report_progress: bool,
    ) -> SceneportResult<WalkReport> {
        self.state = SessionState::Syncing;
        let scene = Arc::clone(&self.binding.scene);
        let engine = Arc::clone(&self.binding.engine);
        let walk_frame = plan.scene_frame.unwrap_or_else(|| scene.frame_current());

        let camera = plan.camera.and_then(|id| scene.object(id));
        exporter.export_plugin(&self.render_view(camera, walk_frame))?;
        exporter.export_plugin(&self.settings_output(plan.frame, span))?;

        SceneWalker::new(
            scene.as_ref(),
            engine.as_ref(),
            &self.settings,
            &mut self.cache,
            exporter,
        )
        .report_progress(report_progress)
        .run(host, walk_frame)
    }

    fn render_view(&self, camera: Option<&HostObject>, frame: i32) -> PluginDesc {
        let mut view = PluginDesc::new("renderView", "RenderView", PluginCategory::Camera);
        if let Some(cam) = camera {
            view.set("transform", Transform::from_mat4(&cam.matrix_world_at(frame)));
            if let Some(data) = cam.camera {
                view.set("fov", data.fov);
                view.set("clipping_near", data.clip_start);
                view.set("clipping_far", data.clip_end);
                view.set("orthographic", data.orthographic);
            }
        }
        if let Some(v) = self.binding.view {
            view.set("fov", v.fov);
            view.set("orthographic", !v.perspective);
        }
        view
    }

    fn settings_output(&self, frame: i32, span: (i32, i32)) -> PluginDesc {
        let size = self.resolution();
        PluginDesc::new("settingsOutput", "SettingsOutput", PluginCategory::Settings)
            .with("img_width", size.width as i32)
            .with("img_height", size.height as i32)
            .with("anim_start", span.0)
            .with("anim_end", span.1)
            .with("frame_start", frame)
    }
}

impl Drop for SceneExporter {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SceneExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneExporter")
            .field("state", &self.state)
            .field("binding", &self.binding)
            .field("cached_nodes", &self.cache.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/exporter.rs"]
mod tests;
