/// Composes per-image progress into run progress.
///
/// For a run of `total` frames, progress is `(frames_done + image_fraction) / total`. Reported
/// values never decrease, and [`ProgressTracker::finish`] reports exactly `1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressTracker {
    total: u32,
    done: u32,
    last: f32,
}

impl ProgressTracker {
    /// Tracker for `total` frames (at least one).
    pub fn new(total: u32) -> Self {
        Self {
            total: total.max(1),
            done: 0,
            last: 0.0,
        }
    }

    /// Frames in the run.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Frames completed so far.
    pub fn frames_done(&self) -> u32 {
        self.done
    }

    /// Last reported value.
    pub fn last(&self) -> f32 {
        self.last
    }

    /// Progress for `fraction` of the current frame.
    pub fn frame_progress(&mut self, fraction: f32) -> f32 {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let done = self.done.min(self.total);
        self.advance((done as f32 + fraction) / self.total as f32)
    }

    /// Mark the current frame complete.
    pub fn frame_done(&mut self) -> f32 {
        self.done = (self.done + 1).min(self.total);
        self.advance(self.done as f32 / self.total as f32)
    }

    /// Mark the run complete.
    pub fn finish(&mut self) -> f32 {
        self.done = self.total;
        self.last = 1.0;
        self.last
    }

    fn advance(&mut self, value: f32) -> f32 {
        self.last = self.last.max(value.min(1.0));
        self.last
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/progress.rs"]
mod tests;
