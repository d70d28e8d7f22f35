use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::foundation::error::{SceneportError, SceneportResult};
use crate::host::binding::{EngineHost, RenderResult};
use crate::host::context::HostContext;
use crate::renderer::image::PassType;
use crate::renderer::live::SharedRenderer;
use crate::renderer::{Renderer, RendererEvent};
use crate::session::render_state::RenderState;

/// Everything the render loop thread needs.
pub(crate) struct LoopContext {
    pub(crate) state: Arc<RenderState>,
    pub(crate) renderer: SharedRenderer,
    pub(crate) engine: Arc<dyn EngineHost>,
    pub(crate) context: HostContext,
    pub(crate) poll: Duration,
    pub(crate) interactive: bool,
}

/// Background thread draining renderer notifications.
///
/// The loop re-checks for shutdown at least once per poll interval. Host calls are made only
/// through [`HostContext::try_enter_for`], so a driving thread that joins the loop while holding
/// the host context delays the loop by at most one interval instead of deadlocking it.
pub(crate) struct RenderLoop {
    handle: Option<JoinHandle<Receiver<RendererEvent>>>,
}

impl RenderLoop {
    pub(crate) fn spawn(ctx: LoopContext, events: Receiver<RendererEvent>) -> SceneportResult<Self> {
        let handle = std::thread::Builder::new()
            .name("sceneport-render-loop".to_owned())
            .spawn(move || run(ctx, events))
            .map_err(|e| SceneportError::init(format!("spawn render loop: {e}")))?;
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the loop to exit; the caller must have requested shutdown first.
    pub(crate) fn join(mut self) -> Option<Receiver<RendererEvent>> {
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(events) => Some(events),
            Err(_) => {
                tracing::error!("render loop thread panicked");
                None
            }
        }
    }
}

fn run(ctx: LoopContext, events: Receiver<RendererEvent>) -> Receiver<RendererEvent> {
    tracing::debug!(poll_ms = ctx.poll.as_millis() as u64, "render loop started");
    while !ctx.state.is_shutdown() {
        match events.recv_timeout(ctx.poll) {
            Ok(event) => {
                if std::panic::catch_unwind(AssertUnwindSafe(|| handle_event(&ctx, event)))
                    .is_err()
                {
                    tracing::error!("render loop panicked while handling a renderer event");
                    ctx.state.mark_aborted("render loop failed while handling a renderer event");
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                ctx.state.mark_lost("renderer closed its event channel");
                break;
            }
        }
    }
    tracing::debug!("render loop stopped");
    events
}

fn handle_event(ctx: &LoopContext, event: RendererEvent) {
    match event {
        RendererEvent::ImageUpdated => {
            ctx.state.mark_updated();
            push_partial(ctx);
        }
        RendererEvent::ImageReady { frame } => {
            tracing::info!(frame, "image ready");
            ctx.state.mark_ready(frame);
        }
        RendererEvent::Aborted { reason } => {
            tracing::error!(%reason, "renderer aborted");
            ctx.state.mark_aborted(reason);
        }
    }
}

fn push_partial(ctx: &LoopContext) {
    let fraction = ctx
        .renderer
        .lock()
        .get_pass(PassType::Combined)
        .map_or(0.0, |img| img.progress);

    let Some(_host) = ctx.context.try_enter_for(ctx.poll) else {
        tracing::trace!("host context busy; partial result skipped");
        return;
    };
    if ctx.interactive && ctx.state.take_dirty() {
        ctx.state.with_results(|results| {
            fill_results(&**ctx.renderer.lock(), results);
            for r in results.iter() {
                ctx.engine.update_result(r);
            }
        });
    }
    let p = ctx.state.progress(|t| t.frame_progress(fraction));
    ctx.engine.update_progress(p);
}

/// Copy every pass of every result whose size matches the rendered image.
pub(crate) fn fill_results(renderer: &dyn Renderer, results: &mut [RenderResult]) {
    for result in results {
        for pass in &mut result.passes {
            if let Some(img) = renderer.get_pass(pass.pass)
                && img.size() == result.size
            {
                pass.image = Some(img);
            }
        }
    }
}
