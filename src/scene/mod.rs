//! Scene walk and cross-frame change tracking.

/// Node arena and geometry stamps.
pub mod cache;
/// Stable node identities.
pub mod identity;
/// Exportable node records.
pub mod node;
/// Per-frame scene walk.
pub mod walker;
