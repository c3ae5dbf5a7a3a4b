//! Coalesced redraw requests.

/// Dirty flag that collapses any number of redraw requests into one paint.
///
/// The host drains it once per display frame with [`RedrawScheduler::take`].
#[derive(Debug, Clone, Default)]
pub struct RedrawScheduler {
    dirty: bool,
    frames: u64,
}

impl RedrawScheduler {
    /// Scheduler with a paint already pending, so the first frame draws.
    pub fn new() -> Self {
        Self {
            dirty: true,
            frames: 0,
        }
    }

    /// Mark the surface dirty. Idempotent.
    pub fn request(&mut self) {
        self.dirty = true;
    }

    /// Whether a paint is pending.
    pub fn is_pending(&self) -> bool {
        self.dirty
    }

    /// Consume the pending request. Returns `true` at most once per request burst.
    pub fn take(&mut self) -> bool {
        if std::mem::take(&mut self.dirty) {
            self.frames += 1;
            true
        } else {
            false
        }
    }

    /// Number of paints handed out so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
