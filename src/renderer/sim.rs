use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::foundation::core::Resolution;
use crate::foundation::error::{SceneportError, SceneportResult};
use crate::plugin::desc::PluginDesc;
use crate::plugin::schema::conform;
use crate::plugin::value::{AttrValue, PluginRef};
use crate::renderer::image::{PassType, RenderImage};
use crate::renderer::{Renderer, RendererEvent, RendererRuntime};

/// Behaviour of the simulated renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct SimOptions {
    /// Partial updates per frame (at least one).
    pub steps: u32,
    /// Delay before each partial update.
    pub step_delay: Duration,
    /// Refuse to initialize, like a renderer without a license.
    pub fail_init: bool,
    /// Abort instead of finishing this frame.
    pub abort_at_frame: Option<i32>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            steps: 4,
            step_delay: Duration::from_millis(2),
            fail_init: false,
            abort_at_frame: None,
        }
    }
}

#[derive(Debug, Default)]
struct RuntimeShared {
    initialized: AtomicBool,
    connections: AtomicUsize,
    last: Mutex<Option<SimProbe>>,
}

/// In-process renderer runtime producing flat shaded images.
///
/// Clones share state, so a clone kept aside can inspect renderers handed out by another.
#[derive(Clone, Debug, Default)]
pub struct SimRuntime {
    opts: SimOptions,
    shared: Arc<RuntimeShared>,
}

impl SimRuntime {
    /// Create an uninitialized runtime.
    pub fn new(opts: SimOptions) -> Self {
        Self {
            opts,
            shared: Arc::default(),
        }
    }

    /// Return `true` after a successful [`RendererRuntime::initialize`].
    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::SeqCst)
    }

    /// Number of renderers opened so far.
    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Probe of the most recently opened renderer.
    pub fn last_renderer(&self) -> Option<SimProbe> {
        self.shared.last.lock().clone()
    }
}

impl RendererRuntime for SimRuntime {
    fn name(&self) -> &str {
        "sim"
    }

    fn initialize(&self) -> SceneportResult<()> {
        if self.opts.fail_init {
            return Err(SceneportError::init("simulated renderer refused to initialize"));
        }
        self.shared.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn connect(&self, size: Resolution) -> SceneportResult<Box<dyn Renderer>> {
        if !self.is_initialized() {
            return Err(SceneportError::init("renderer runtime is not initialized"));
        }
        Resolution::new(size.width, size.height)?;
        let renderer = SimRenderer::new(size, self.opts.clone());
        *self.shared.last.lock() = Some(renderer.probe());
        self.shared.connections.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(width = size.width, height = size.height, "sim renderer connected");
        Ok(Box::new(renderer))
    }
}

#[derive(Debug, Default)]
struct SimState {
    plugins: BTreeMap<String, PluginDesc>,
    frame: i32,
    passes: HashMap<PassType, RenderImage>,
    rendered: Vec<i32>,
    starts: usize,
    frame_buffer_shown: bool,
    shut_down: bool,
}

/// Read-only view of a simulated renderer that stays valid after the renderer is handed out.
#[derive(Clone, Debug)]
pub struct SimProbe {
    state: Arc<Mutex<SimState>>,
}

impl SimProbe {
    /// Registered plugin by name.
    pub fn plugin(&self, name: &str) -> Option<PluginDesc> {
        self.state.lock().plugins.get(name).cloned()
    }

    /// Registered plugin names, sorted.
    pub fn plugin_names(&self) -> Vec<String> {
        self.state.lock().plugins.keys().cloned().collect()
    }

    /// Current frame.
    pub fn current_frame(&self) -> i32 {
        self.state.lock().frame
    }

    /// Frames rendered to completion, in order.
    pub fn rendered_frames(&self) -> Vec<i32> {
        self.state.lock().rendered.clone()
    }

    /// Number of `start` calls.
    pub fn starts(&self) -> usize {
        self.state.lock().starts
    }

    /// Frame buffer window visibility.
    pub fn frame_buffer_shown(&self) -> bool {
        self.state.lock().frame_buffer_shown
    }

    /// Return `true` once the renderer has been shut down.
    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }
}

struct Worker {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Renderer that fills every pass with a flat color on a worker thread.
///
/// The combined pass takes the average color of the registered `LightOmni` plugins (mid grey
/// without lights), scaled by render progress. The Z pass holds the frame number.
pub struct SimRenderer {
    opts: SimOptions,
    size: Resolution,
    state: Arc<Mutex<SimState>>,
    events_tx: Option<Sender<RendererEvent>>,
    events_rx: Option<Receiver<RendererEvent>>,
    worker: Option<Worker>,
}

impl SimRenderer {
    /// Create a renderer for images of `size`.
    pub fn new(size: Resolution, opts: SimOptions) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            opts,
            size,
            state: Arc::default(),
            events_tx: Some(tx),
            events_rx: Some(rx),
            worker: None,
        }
    }

    /// Inspection handle.
    pub fn probe(&self) -> SimProbe {
        SimProbe {
            state: Arc::clone(&self.state),
        }
    }

    fn join_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.cancel.store(true, Ordering::SeqCst);
        if worker.handle.join().is_err() {
            tracing::error!("sim render worker panicked");
        }
    }
}

impl std::fmt::Debug for SimRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimRenderer")
            .field("size", &self.size)
            .field("rendering", &self.worker.is_some())
            .finish_non_exhaustive()
    }
}

impl Renderer for SimRenderer {
    fn export_plugin(&mut self, desc: &PluginDesc) -> SceneportResult<PluginRef> {
        let desc = conform(desc)?;
        let mut st = self.state.lock();
        if st.shut_down {
            return Err(SceneportError::renderer("renderer is shut down"));
        }
        let r = desc.plugin_ref();
        st.plugins.insert(desc.name.clone(), desc);
        Ok(r)
    }

    fn set_current_frame(&mut self, frame: i32) {
        self.state.lock().frame = frame;
    }

    fn start(&mut self) -> SceneportResult<()> {
        self.join_worker();
        let Some(tx) = self.events_tx.clone() else {
            return Err(SceneportError::renderer("renderer is shut down"));
        };
        let (frame, base) = {
            let mut st = self.state.lock();
            st.starts += 1;
            (st.frame, base_color(&st.plugins))
        };
        let cancel = Arc::new(AtomicBool::new(false));
        let job = FrameJob {
            frame,
            size: self.size,
            steps: self.opts.steps.max(1),
            delay: self.opts.step_delay,
            abort: self.opts.abort_at_frame == Some(frame),
            base,
            state: Arc::clone(&self.state),
            cancel: Arc::clone(&cancel),
            tx,
        };
        let handle = std::thread::Builder::new()
            .name("sceneport-sim-render".to_owned())
            .spawn(move || render_frame(job))
            .map_err(|e| SceneportError::renderer(format!("spawn render worker: {e}")))?;
        self.worker = Some(Worker { cancel, handle });
        tracing::debug!(frame, "sim render started");
        Ok(())
    }

    fn stop(&mut self) {
        self.join_worker();
    }

    fn get_pass(&self, pass: PassType) -> Option<RenderImage> {
        self.state.lock().passes.get(&pass).cloned()
    }

    fn show_frame_buffer(&mut self, show: bool) {
        self.state.lock().frame_buffer_shown = show;
    }

    fn events(&mut self) -> Option<Receiver<RendererEvent>> {
        self.events_rx.take()
    }

    fn shutdown(&mut self) {
        self.join_worker();
        self.events_tx = None;
        let mut st = self.state.lock();
        if !st.shut_down {
            st.shut_down = true;
            st.plugins.clear();
            st.passes.clear();
            tracing::debug!("sim renderer shut down");
        }
    }
}

impl Drop for SimRenderer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn base_color(plugins: &BTreeMap<String, PluginDesc>) -> [f32; 4] {
    let lights: Vec<[f32; 3]> = plugins
        .values()
        .filter(|d| d.plugin_id == "LightOmni")
        .filter_map(|d| {
            let Some(AttrValue::Color(c)) = d.get("color") else {
                return None;
            };
            let i = match d.get("intensity") {
                Some(AttrValue::Float(i)) => *i,
                _ => 1.0,
            };
            Some([c.r * i, c.g * i, c.b * i])
        })
        .collect();
    if lights.is_empty() {
        return [0.5, 0.5, 0.5, 1.0];
    }
    let n = lights.len() as f32;
    let sum = lights.iter().fold([0.0f32; 3], |acc, c| {
        [acc[0] + c[0], acc[1] + c[1], acc[2] + c[2]]
    });
    [
        (sum[0] / n).clamp(0.0, 1.0),
        (sum[1] / n).clamp(0.0, 1.0),
        (sum[2] / n).clamp(0.0, 1.0),
        1.0,
    ]
}

struct FrameJob {
    frame: i32,
    size: Resolution,
    steps: u32,
    delay: Duration,
    abort: bool,
    base: [f32; 4],
    state: Arc<Mutex<SimState>>,
    cancel: Arc<AtomicBool>,
    tx: Sender<RendererEvent>,
}

fn render_frame(job: FrameJob) {
    if std::panic::catch_unwind(AssertUnwindSafe(|| run_job(&job))).is_err() {
        tracing::error!(frame = job.frame, "sim render worker panicked");
        let _ = job.tx.send(RendererEvent::Aborted {
            reason: "render worker panicked".to_owned(),
        });
    }
}

fn run_job(job: &FrameJob) {
    for step in 1..=job.steps {
        if job.cancel.load(Ordering::SeqCst) {
            return;
        }
        std::thread::sleep(job.delay);
        if job.abort && step == job.steps {
            let _ = job.tx.send(RendererEvent::Aborted {
                reason: format!("simulated failure at frame {}", job.frame),
            });
            return;
        }
        let p = step as f32 / job.steps as f32;
        let [r, g, b, a] = job.base;
        {
            let mut st = job.state.lock();
            st.passes.insert(
                PassType::Combined,
                RenderImage::filled(job.size, [r * p, g * p, b * p, a], p),
            );
            let z = job.frame as f32;
            st.passes
                .insert(PassType::Z, RenderImage::filled(job.size, [z, z, z, 1.0], p));
        }
        if job.tx.send(RendererEvent::ImageUpdated).is_err() {
            return;
        }
    }
    if job.cancel.load(Ordering::SeqCst) {
        return;
    }
    job.state.lock().rendered.push(job.frame);
    let _ = job.tx.send(RendererEvent::ImageReady { frame: job.frame });
}

#[cfg(test)]
#[path = "../../tests/unit/renderer/sim.rs"]
mod tests;
