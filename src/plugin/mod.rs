//! Renderer plugin descriptions: typed attribute values, named plugin instances and the
//! per-type attribute schema.

/// Plugin instance descriptions.
pub mod desc;
/// Attribute schema of the plugin types this crate emits.
pub mod schema;
/// Tagged attribute values.
pub mod value;
