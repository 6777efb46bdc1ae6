use std::sync::Arc;

use crate::core::frame::Bitmap;

/// Painter - puts a bitmap on screen (or anywhere else)
///
/// Called from the viewer thread only, with the state lock released.
pub trait Painter {
    /// Draw `bitmap`. Called on every paint tick, so the same bitmap arrives
    /// repeatedly until the producer replaces it.
    fn paint(&mut self, bitmap: &Arc<Bitmap>) -> anyhow::Result<()>;

    /// The drawable area changed size
    fn resize(&mut self, _width: u32, _height: u32) {}
}
