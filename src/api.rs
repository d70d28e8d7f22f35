//! Extension entry points called by the host: `load`, `unload`, `init`, `free`, `export`,
//! `update` and `draw`.
//!
//! An [`Extension`] owns the loaded renderer runtime and every open session. Entry points acquire
//! the session's host context themselves, so callers must not hold it.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::foundation::error::{SceneportError, SceneportResult};
use crate::host::binding::{HostBinding, HostHandles, Region, ViewState};
use crate::renderer::RendererRuntime;
use crate::renderer::image::RenderImage;
use crate::scene::walker::WalkReport;
use crate::session::exporter::{ExportOutcome, SceneExporter, SessionState};

/// Handle of a session opened by [`Extension::init`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Loaded extension: renderer runtime plus open sessions.
#[derive(Default)]
pub struct Extension {
    runtime: Option<Box<dyn RendererRuntime>>,
    sessions: BTreeMap<SessionId, SceneExporter>,
    next_id: u64,
}

impl Extension {
    /// Extension without a renderer runtime; only file targets can be exported.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize and keep `runtime`.
    ///
    /// Initialization failure is logged and leaves the extension without a runtime: file export
    /// keeps working, live sessions fail at `init`. A second load is ignored.
    pub fn load(&mut self, runtime: Box<dyn RendererRuntime>) {
        if let Some(current) = &self.runtime {
            tracing::debug!(runtime = current.name(), "renderer runtime already loaded");
            return;
        }
        match runtime.initialize() {
            Ok(()) => {
                tracing::info!(runtime = runtime.name(), "renderer runtime loaded");
                self.runtime = Some(runtime);
            }
            Err(e) => {
                tracing::error!(runtime = runtime.name(), error = %e, "renderer runtime failed to initialize");
            }
        }
    }

    /// Return `true` when a renderer runtime is loaded.
    pub fn is_loaded(&self) -> bool {
        self.runtime.is_some()
    }

    /// Free every session and drop the runtime.
    pub fn unload(&mut self) {
        let ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        for id in ids {
            self.free(id);
        }
        if let Some(rt) = self.runtime.take() {
            tracing::info!(runtime = rt.name(), "renderer runtime unloaded");
        }
    }

    /// Open a session from raw host handles. `settings` default when absent.
    pub fn init(&mut self, handles: HostHandles) -> SceneportResult<SessionId> {
        let (binding, settings) = HostBinding::from_handles(handles)?;
        let context = binding.context.clone();
        let mut exporter = SceneExporter::new(binding, Arc::new(settings.unwrap_or_default()))?;
        {
            let host = context.enter();
            exporter.init(&host, self.runtime.as_deref())?;
        }
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.sessions.insert(id, exporter);
        tracing::debug!(%id, "session opened");
        Ok(id)
    }

    /// Stop and release a session. Returns `false` for unknown or already freed sessions.
    pub fn free(&mut self, id: SessionId) -> bool {
        let Some(mut exporter) = self.sessions.remove(&id) else {
            return false;
        };
        let context = exporter.binding().context.clone();
        {
            let host = context.enter();
            exporter.stop(&host);
        }
        exporter.release();
        tracing::debug!(%id, "session freed");
        true
    }

    /// Lifecycle state of a session.
    pub fn state(&self, id: SessionId) -> Option<SessionState> {
        self.sessions.get(&id).map(SceneExporter::state)
    }

    /// Borrow a session.
    pub fn session(&self, id: SessionId) -> Option<&SceneExporter> {
        self.sessions.get(&id)
    }

    fn session_mut(&mut self, id: SessionId) -> SceneportResult<&mut SceneExporter> {
        self.sessions
            .get_mut(&id)
            .ok_or_else(|| SceneportError::validation(format!("unknown {id}")))
    }

    /// Run a full export of a session.
    pub fn export(&mut self, id: SessionId) -> SceneportResult<ExportOutcome> {
        let exporter = self.session_mut(id)?;
        let context = exporter.binding().context.clone();
        let mut host = context.enter();
        exporter.export(&mut host)
    }

    /// Interactive re-sync of a session.
    pub fn update(&mut self, id: SessionId) -> SceneportResult<WalkReport> {
        let exporter = self.session_mut(id)?;
        let context = exporter.binding().context.clone();
        let mut host = context.enter();
        exporter.update(&mut host)
    }

    /// Latest image of a session for `viewport`; a changed `view` applies from the next update.
    pub fn draw(
        &mut self,
        id: SessionId,
        viewport: Region,
        view: Option<ViewState>,
    ) -> SceneportResult<Option<RenderImage>> {
        let exporter = self.session_mut(id)?;
        if exporter.set_view(view) {
            tracing::debug!(%id, "viewport changed");
        }
        exporter.draw(viewport)
    }
}

impl Drop for Extension {
    fn drop(&mut self) {
        self.unload();
    }
}

impl std::fmt::Debug for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extension")
            .field("runtime", &self.runtime.as_ref().map(|r| r.name()))
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/unit/api.rs"]
mod tests;
