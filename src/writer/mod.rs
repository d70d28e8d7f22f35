//! vrscene plugin description writer.
//!
//! `format` holds the binary list encodings, `plugin_writer` renders plugin blocks, `vrscene`
//! routes plugins into (optionally split) outputs and `decode` reads the text back.

/// Text parser and type-directed value decoder.
pub mod decode;
/// Hex and zip list payload encodings.
pub mod format;
/// Plugin block serialization.
pub mod plugin_writer;
/// File and in-memory vrscene exporters.
pub mod vrscene;
