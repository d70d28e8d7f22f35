use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::host::binding::RenderResult;
use crate::session::progress::ProgressTracker;

/// How a render wait ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The frame finished rendering.
    Ready,
    /// The user interrupted the wait.
    Interrupted,
    /// The renderer gave up.
    Aborted(String),
}

#[derive(Debug)]
struct Inner {
    running: bool,
    frame: Option<i32>,
    last_ready: Option<i32>,
    aborted: Option<String>,
    image_dirty: bool,
    shutdown: bool,
    tracker: ProgressTracker,
    results: Vec<RenderResult>,
}

/// State touched by renderer notifications, shared by the driving thread and the render loop.
///
/// Lock order: host context, then this state, then the renderer.
#[derive(Debug)]
pub(crate) struct RenderState {
    inner: Mutex<Inner>,
    cond: Condvar,
}

impl RenderState {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                running: false,
                frame: None,
                last_ready: None,
                aborted: None,
                image_dirty: false,
                shutdown: false,
                tracker: ProgressTracker::new(1),
                results: Vec::new(),
            }),
            cond: Condvar::new(),
        }
    }

    /// Start tracking `frame` with freshly opened render results.
    pub(crate) fn begin_frame(&self, frame: i32, results: Vec<RenderResult>) {
        let mut inner = self.inner.lock();
        inner.running = true;
        inner.frame = Some(frame);
        inner.last_ready = None;
        inner.aborted = None;
        inner.image_dirty = false;
        inner.results = results;
    }

    pub(crate) fn mark_updated(&self) {
        self.inner.lock().image_dirty = true;
    }

    pub(crate) fn mark_ready(&self, frame: i32) {
        let mut inner = self.inner.lock();
        if inner.frame == Some(frame) {
            inner.running = false;
        }
        inner.last_ready = Some(frame);
        self.cond.notify_all();
    }

    pub(crate) fn mark_aborted(&self, reason: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.running = false;
        inner.aborted = Some(reason.into());
        self.cond.notify_all();
    }

    /// Abort only while a frame is rendering.
    pub(crate) fn mark_lost(&self, reason: &str) {
        let mut inner = self.inner.lock();
        if inner.running {
            inner.running = false;
            inner.aborted = Some(reason.to_owned());
            self.cond.notify_all();
        }
    }

    pub(crate) fn mark_stopped(&self) {
        let mut inner = self.inner.lock();
        inner.running = false;
        self.cond.notify_all();
    }

    pub(crate) fn request_shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.shutdown = true;
        inner.running = false;
        self.cond.notify_all();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.inner.lock().shutdown
    }

    pub(crate) fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    /// Return and clear the image-dirty flag.
    pub(crate) fn take_dirty(&self) -> bool {
        std::mem::take(&mut self.inner.lock().image_dirty)
    }

    pub(crate) fn reset_progress(&self, total: u32) {
        self.inner.lock().tracker = ProgressTracker::new(total);
    }

    pub(crate) fn progress(&self, f: impl FnOnce(&mut ProgressTracker) -> f32) -> f32 {
        f(&mut self.inner.lock().tracker)
    }

    pub(crate) fn with_results<R>(&self, f: impl FnOnce(&mut [RenderResult]) -> R) -> R {
        f(self.inner.lock().results.as_mut_slice())
    }

    pub(crate) fn take_results(&self) -> Vec<RenderResult> {
        std::mem::take(&mut self.inner.lock().results)
    }

    /// Block until `frame` is ready, the renderer aborts, or `interrupted` returns `true`.
    ///
    /// `interrupted` runs with the state unlocked, at least once per `poll`.
    pub(crate) fn wait_frame(
        &self,
        frame: i32,
        poll: Duration,
        interrupted: impl Fn() -> bool,
    ) -> WaitOutcome {
        let mut inner = self.inner.lock();
        loop {
            if let Some(outcome) = settled(&inner, frame) {
                return outcome;
            }
            if MutexGuard::unlocked(&mut inner, &interrupted) {
                return WaitOutcome::Interrupted;
            }
            if settled(&inner, frame).is_none() {
                self.cond.wait_for(&mut inner, poll);
            }
        }
    }
}

fn settled(inner: &Inner, frame: i32) -> Option<WaitOutcome> {
    if inner.last_ready == Some(frame) {
        return Some(WaitOutcome::Ready);
    }
    if let Some(reason) = &inner.aborted {
        return Some(WaitOutcome::Aborted(reason.clone()));
    }
    if inner.shutdown {
        return Some(WaitOutcome::Aborted("render session closed".to_owned()));
    }
    None
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_state.rs"]
mod tests;
