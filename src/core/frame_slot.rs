use std::sync::Arc;
use std::time::{Duration, Instant};

use super::frame::Bitmap;

/// Single-slot holder for the most recently submitted bitmap
///
/// Not synchronized on its own; it lives inside the viewer state mutex.
/// `put` replaces the whole slot, so readers see a complete bitmap or none.
#[derive(Debug, Default)]
pub struct FrameSlot {
    current: Option<Arc<Bitmap>>,
    inserted_at: Option<Instant>,
    painted_at: Option<Instant>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current bitmap; the previous one is dropped unseen if no tick ran
    pub fn put(&mut self, bitmap: Arc<Bitmap>, now: Instant) {
        self.current = Some(bitmap);
        self.inserted_at = Some(now);
    }

    /// Snapshot of the current bitmap, safe to paint after the lock is released
    pub fn peek(&self) -> Option<Arc<Bitmap>> {
        self.current.clone()
    }

    pub fn mark_painted(&mut self, now: Instant) {
        self.painted_at = Some(now);
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn painted_at(&self) -> Option<Instant> {
        self.painted_at
    }

    /// Time left before the current frame has been up for `interval`
    ///
    /// An empty slot counts as having been up forever.
    pub fn remaining(&self, interval: Duration, now: Instant) -> Duration {
        match self.inserted_at {
            Some(inserted) => interval.saturating_sub(now.saturating_duration_since(inserted)),
            None => Duration::ZERO,
        }
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.current.as_ref().map(|bitmap| bitmap.dimensions())
    }
}
