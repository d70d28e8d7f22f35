//! Host interop adapter.
//!
//! The host scene graph and render engine are consumed through the [`binding::SceneHandle`] and
//! [`binding::EngineHost`] capability traits. Access to host state is serialized by the
//! [`context::HostContext`] execution lock.

/// Raw handle validation and host capability traits.
pub mod binding;
/// Exclusive host execution context.
pub mod context;
/// In-memory reference host (JSON scenes, recording engine).
pub mod memory;
/// Host object data model.
pub mod model;
