use crate::foundation::error::{SceneportError, SceneportResult};

/// Inclusive, stepped frame range in host timeline space.
///
/// Host frames may be negative; `end` is inclusive to match host scene ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// First frame.
    pub start: i32,
    /// Last frame (inclusive).
    pub end: i32,
    /// Frame step, must be >= 1.
    #[serde(default = "default_step")]
    pub step: u32,
}

fn default_step() -> u32 {
    1
}

impl FrameRange {
    /// Create a validated range with `start <= end` and `step >= 1`.
    pub fn new(start: i32, end: i32, step: u32) -> SceneportResult<Self> {
        let r = Self { start, end, step };
        r.validate()?;
        Ok(r)
    }

    /// Single-frame range.
    pub fn single(frame: i32) -> Self {
        Self {
            start: frame,
            end: frame,
            step: 1,
        }
    }

    /// Check the range invariants.
    pub fn validate(&self) -> SceneportResult<()> {
        if self.step == 0 {
            return Err(SceneportError::validation("frame step must be >= 1"));
        }
        if self.start > self.end {
            return Err(SceneportError::validation(
                "frame range start must be <= end",
            ));
        }
        Ok(())
    }

    /// Number of frames visited by [`FrameRange::frames`].
    pub fn len_frames(self) -> u32 {
        if self.step == 0 || self.start > self.end {
            return 0;
        }
        let span = (i64::from(self.end) - i64::from(self.start)) as u64;
        (span / u64::from(self.step)) as u32 + 1
    }

    /// Iterate frames from `start` to `end` inclusive, advancing by `step`.
    pub fn frames(self) -> impl Iterator<Item = i32> {
        let step = self.step.max(1) as usize;
        let n = self.len_frames() as usize;
        (self.start..=self.end).step_by(step).take(n)
    }

    /// Return `true` when `frame` is visited by this range.
    pub fn contains(self, frame: i32) -> bool {
        if frame < self.start || frame > self.end || self.step == 0 {
            return false;
        }
        (i64::from(frame) - i64::from(self.start)) % i64::from(self.step) == 0
    }
}

/// Output image dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Create a validated non-zero resolution.
    pub fn new(width: u32, height: u32) -> SceneportResult<Self> {
        if width == 0 || height == 0 {
            return Err(SceneportError::validation(
                "resolution width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels.
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
