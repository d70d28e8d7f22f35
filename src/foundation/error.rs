/// Convenience result type used across sceneport.
pub type SceneportResult<T> = Result<T, SceneportError>;

/// Top-level error taxonomy used by export and render APIs.
///
/// Cooperative interruption is not represented here: interrupted runs are reported through
/// [`crate::ExportOutcome`] and [`crate::WalkReport`] instead.
#[derive(thiserror::Error, Debug)]
pub enum SceneportError {
    /// The external renderer could not be reached or refused to start (licensing, runtime).
    #[error("renderer init error: {0}")]
    Init(String),

    /// Malformed attribute data that cannot be serialized.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The output sink could not be written.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid host data, settings, or an illegal lifecycle transition.
    #[error("validation error: {0}")]
    Validation(String),

    /// Fatal renderer-side failure reported while rendering.
    #[error("renderer error: {0}")]
    Renderer(String),

    /// Errors when serializing or deserializing configuration and scene data.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SceneportError {
    /// Build a [`SceneportError::Init`] value.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Build a [`SceneportError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`SceneportError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SceneportError::Renderer`] value.
    pub fn renderer(msg: impl Into<String>) -> Self {
        Self::Renderer(msg.into())
    }

    /// Build a [`SceneportError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for failures confined to a single exported object.
    ///
    /// The scene walk logs and skips these; everything else aborts the export.
    pub fn is_object_local(&self) -> bool {
        matches!(self, Self::Encoding(_) | Self::Validation(_))
    }
}

impl From<serde_json::Error> for SceneportError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
