use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

use crate::foundation::core::{FrameRange, Resolution};
use crate::foundation::error::{SceneportError, SceneportResult};
use crate::writer::format::ExportFormat;

/// Upper bound of the render-wait poll interval; every wait re-checks interruption at least
/// this often.
pub const MAX_POLL_INTERVAL_MS: u64 = 250;

/// Animation mode of one invocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationMode {
    /// Single frame (the scene's current frame).
    #[default]
    Off,
    /// Every frame of the range.
    Timeline,
    /// One frame per scene camera, cameras ordered by name.
    CameraLoop,
}

/// Animation settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnimationSettings {
    /// Animation mode.
    #[serde(default)]
    pub mode: AnimationMode,
}

/// vrscene file target.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FileTarget {
    /// Output path of the base file (relative paths resolve against the export directory).
    pub path: PathBuf,
    /// List encoding.
    #[serde(default)]
    pub format: ExportFormat,
    /// Split plugins by category into partition files.
    #[serde(default)]
    pub split: bool,
}

impl FileTarget {
    /// Output directory and base name (file stem) for `export_dir`.
    pub fn resolve(&self, export_dir: &Path) -> SceneportResult<(PathBuf, String)> {
        let full = if self.path.is_absolute() {
            self.path.clone()
        } else {
            export_dir.join(&self.path)
        };
        let base = full
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                SceneportError::validation(format!(
                    "file target '{}' has no file name",
                    self.path.display()
                ))
            })?
            .to_owned();
        let dir = full
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok((dir, base))
    }
}

/// Live renderer target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LiveTarget {
    /// Show the renderer's own frame buffer window.
    #[serde(default)]
    pub show_frame_buffer: bool,
    /// Feed partial results to an interactive view.
    #[serde(default = "yes")]
    pub interactive: bool,
}

impl Default for LiveTarget {
    fn default() -> Self {
        Self {
            show_frame_buffer: false,
            interactive: true,
        }
    }
}

/// Export target of one invocation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportTarget {
    /// Write vrscene files.
    File(FileTarget),
    /// Drive a live renderer.
    Live(LiveTarget),
}

impl Default for ExportTarget {
    fn default() -> Self {
        Self::Live(LiveTarget::default())
    }
}

fn yes() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    50
}

/// Configuration of one export/render invocation; immutable while it runs.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderSettings {
    /// Animation settings.
    #[serde(default)]
    pub animation: AnimationSettings,
    /// Override of the scene's frame range.
    #[serde(default)]
    pub frame_range: Option<FrameRange>,
    /// Export target.
    #[serde(default)]
    pub target: ExportTarget,
    /// Override of the scene's output resolution.
    #[serde(default)]
    pub resolution: Option<Resolution>,
    /// Skip objects outside the active layers.
    #[serde(default = "yes")]
    pub use_active_layers: bool,
    /// Export `Node` plugins.
    #[serde(default = "yes")]
    pub export_nodes: bool,
    /// Export geometry plugins (otherwise nodes reference existing geometry).
    #[serde(default = "yes")]
    pub export_geometry: bool,
    /// Export hair strands.
    #[serde(default = "yes")]
    pub export_hair: bool,
    /// Export lamps.
    #[serde(default = "yes")]
    pub export_lights: bool,
    /// Write duplicator instances as one instancer instead of one node each.
    #[serde(default)]
    pub use_instancer: bool,
    /// Render-wait poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            animation: AnimationSettings::default(),
            frame_range: None,
            target: ExportTarget::default(),
            resolution: None,
            use_active_layers: true,
            export_nodes: true,
            export_geometry: true,
            export_hair: true,
            export_lights: true,
            use_instancer: false,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl RenderSettings {
    /// Parse and validate settings JSON.
    pub fn from_json_str(s: &str) -> SceneportResult<Self> {
        let settings: Self = serde_json::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read and validate a settings JSON file.
    pub fn from_path(path: &Path) -> SceneportResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read settings json '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Check setting invariants.
    pub fn validate(&self) -> SceneportResult<()> {
        if !(1..=MAX_POLL_INTERVAL_MS).contains(&self.poll_interval_ms) {
            return Err(SceneportError::validation(format!(
                "poll_interval_ms must be in 1..={MAX_POLL_INTERVAL_MS}, got {}",
                self.poll_interval_ms
            )));
        }
        if let Some(r) = &self.frame_range {
            r.validate()?;
        }
        if let Some(r) = self.resolution {
            Resolution::new(r.width, r.height)?;
        }
        if let ExportTarget::File(f) = &self.target
            && f.path.file_stem().is_none()
        {
            return Err(SceneportError::validation(format!(
                "file target '{}' has no file name",
                f.path.display()
            )));
        }
        Ok(())
    }

    /// Return `true` for timeline and camera-loop runs.
    pub fn is_animation(&self) -> bool {
        self.animation.mode != AnimationMode::Off
    }

    /// File target, if exporting to files.
    pub fn file_target(&self) -> Option<&FileTarget> {
        match &self.target {
            ExportTarget::File(f) => Some(f),
            ExportTarget::Live(_) => None,
        }
    }

    /// Live target, if driving a renderer.
    pub fn live_target(&self) -> Option<&LiveTarget> {
        match &self.target {
            ExportTarget::Live(l) => Some(l),
            ExportTarget::File(_) => None,
        }
    }

    /// Render-wait poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/settings.rs"]
mod tests;
