use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::foundation::core::Resolution;
use crate::foundation::error::{SceneportError, SceneportResult};
use crate::host::binding::{EngineHost, HostBinding};
use crate::host::context::HostGuard;
use crate::renderer::RendererRuntime;
use crate::renderer::image::{PassType, RenderImage};
use crate::renderer::live::{LiveExporter, SharedRenderer};
use crate::session::render_loop::{LoopContext, RenderLoop, fill_results};
use crate::session::render_state::{RenderState, WaitOutcome};
use crate::session::settings::LiveTarget;

/// Live connection to a renderer plus the render loop draining its notifications.
///
/// Released exactly once: [`RenderSession::release`] is idempotent and also runs on drop. The
/// render loop is joined before the renderer is shut down.
pub struct RenderSession {
    renderer: Option<SharedRenderer>,
    state: Arc<RenderState>,
    render_loop: Option<RenderLoop>,
    engine: Arc<dyn EngineHost>,
    size: Resolution,
    poll: Duration,
}

impl RenderSession {
    /// Connect to a renderer and start the render loop.
    pub fn open(
        runtime: &dyn RendererRuntime,
        binding: &HostBinding,
        target: &LiveTarget,
        size: Resolution,
        poll: Duration,
    ) -> SceneportResult<Self> {
        let mut renderer = runtime.connect(size)?;
        renderer.show_frame_buffer(target.show_frame_buffer);
        let events = renderer
            .events()
            .ok_or_else(|| SceneportError::init("renderer event channel is already taken"))?;
        let renderer: SharedRenderer = Arc::new(Mutex::new(renderer));
        let state = Arc::new(RenderState::new());
        let render_loop = RenderLoop::spawn(
            LoopContext {
                state: Arc::clone(&state),
                renderer: Arc::clone(&renderer),
                engine: Arc::clone(&binding.engine),
                context: binding.context.clone(),
                poll,
                interactive: target.interactive,
            },
            events,
        )?;
        tracing::info!(runtime = runtime.name(), width = size.width, height = size.height, "render session opened");
        Ok(Self {
            renderer: Some(renderer),
            state,
            render_loop: Some(render_loop),
            engine: Arc::clone(&binding.engine),
            size,
            poll,
        })
    }

    /// Image size.
    pub fn size(&self) -> Resolution {
        self.size
    }

    /// Return `true` once released.
    pub fn is_released(&self) -> bool {
        self.renderer.is_none()
    }

    /// Return `true` while a frame is rendering.
    pub fn is_rendering(&self) -> bool {
        self.state.is_running()
    }

    fn renderer(&self) -> SceneportResult<&SharedRenderer> {
        self.renderer
            .as_ref()
            .ok_or_else(|| SceneportError::validation("render session is released"))
    }

    /// Plugin exporter feeding this session's renderer.
    pub fn exporter(&self) -> SceneportResult<LiveExporter> {
        Ok(LiveExporter::new(Arc::clone(self.renderer()?)))
    }

    /// Latest pixels of `pass`.
    pub fn latest_image(&self, pass: PassType) -> Option<RenderImage> {
        self.renderer.as_ref()?.lock().get_pass(pass)
    }

    pub(crate) fn reset_progress(&self, total: u32) {
        self.state.reset_progress(total);
    }

    pub(crate) fn frame_done(&self) -> f32 {
        self.state.progress(|t| t.frame_done())
    }

    pub(crate) fn finish_progress(&self) -> f32 {
        self.state.progress(|t| t.finish())
    }

    /// Open render results for `layers` and (re)start rendering `frame`.
    pub(crate) fn start_frame(
        &self,
        _host: &HostGuard<'_>,
        frame: i32,
        layers: &[String],
    ) -> SceneportResult<()> {
        let renderer = self.renderer()?;
        renderer.lock().stop();
        self.end_results(true);

        let results = layers
            .iter()
            .filter_map(|layer| self.engine.begin_result(layer, self.size))
            .collect();
        self.state.begin_frame(frame, results);
        let started = {
            let mut r = renderer.lock();
            r.set_current_frame(frame);
            r.start()
        };
        if let Err(e) = started {
            self.state.mark_stopped();
            self.end_results(true);
            return Err(e);
        }
        tracing::debug!(frame, "render started");
        Ok(())
    }

    /// Wait for `frame` with the host context released.
    pub(crate) fn wait_frame(&self, host: &mut HostGuard<'_>, frame: i32) -> WaitOutcome {
        let state = &self.state;
        let engine = &self.engine;
        let poll = self.poll;
        host.suspended(|| state.wait_frame(frame, poll, || engine.test_break()))
    }

    /// Push final pixels (unless `cancel`) and close the frame's render results.
    pub(crate) fn finish_frame(&self, _host: &HostGuard<'_>, cancel: bool) {
        if !cancel && let Some(renderer) = &self.renderer {
            self.state
                .with_results(|results| fill_results(&**renderer.lock(), results));
        }
        self.end_results(cancel);
    }

    fn end_results(&self, cancel: bool) {
        for result in self.state.take_results() {
            self.engine.end_result(&result, cancel);
        }
    }

    /// Stop rendering and discard open render results.
    pub(crate) fn stop(&self, _host: &HostGuard<'_>) {
        if let Some(r) = &self.renderer {
            r.lock().stop();
        }
        self.state.mark_stopped();
        self.end_results(true);
    }

    /// Join the render loop and shut the renderer down. Safe to call more than once.
    pub fn release(&mut self) {
        let Some(renderer) = self.renderer.take() else {
            return;
        };
        renderer.lock().stop();
        self.state.request_shutdown();
        if let Some(render_loop) = self.render_loop.take() {
            render_loop.join();
        }
        let dropped = self.state.take_results().len();
        if dropped > 0 {
            tracing::debug!(dropped, "open render results dropped on release");
        }
        renderer.lock().shutdown();
        tracing::info!("render session released");
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("size", &self.size)
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_session.rs"]
mod tests;
