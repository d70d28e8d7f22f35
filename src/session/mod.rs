//! Render/export orchestration.
//!
//! [`exporter::SceneExporter`] sequences init, per-frame sync, render and teardown across
//! single-frame, timeline and camera-loop runs. Live targets own a
//! [`render_session::RenderSession`] whose render loop thread drains renderer notifications.

/// Export state machine and animation driver.
pub mod exporter;
/// Run progress composition.
pub mod progress;
pub(crate) mod render_loop;
/// Live renderer connection.
pub mod render_session;
pub(crate) mod render_state;
/// Invocation settings.
pub mod settings;
