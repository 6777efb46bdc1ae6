//! Display-less backend for tests and batch runs
//!
//! Runs the same `RenderLoop` as the winit backend on the viewer thread, but
//! paints into any `Painter` and takes key presses from a channel.
use crossbeam_channel::{never, unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::core::frame::Bitmap;
use crate::core::input::{Command, Key};
use crate::core::render_loop::{RenderLoop, TickOutcome};
use crate::core::timer::TickTimer;
use crate::traits::{Backend, Painter};
use crate::window::window_size;

/// Sends key presses to a running `HeadlessBackend`
#[derive(Debug, Clone)]
pub struct KeyInjector {
    sender: Sender<Key>,
}

impl KeyInjector {
    /// Queue a key press. Returns false once the backend has stopped.
    pub fn press(&self, key: Key) -> bool {
        self.sender.send(key).is_ok()
    }

    pub fn press_char(&self, c: char) -> bool {
        self.press(Key::Char(c))
    }
}

/// Backend without a window
pub struct HeadlessBackend<P> {
    painter: P,
    keys: Receiver<Key>,
}

impl<P: Painter + Send + 'static> HeadlessBackend<P> {
    pub fn new(painter: P) -> (Self, KeyInjector) {
        let (sender, keys) = unbounded();
        (Self { painter, keys }, KeyInjector { sender })
    }
}

impl<P: Painter + Send + 'static> Backend for HeadlessBackend<P> {
    fn run(self: Box<Self>, mut render_loop: RenderLoop) -> anyhow::Result<()> {
        let HeadlessBackend { mut painter, mut keys } = *self;
        let mut timer = TickTimer::new(render_loop.period(), Instant::now());

        // size the painter the way a window without a monitor would be sized
        let (width, height) = window_size(
            render_loop.settings().size,
            render_loop.frame_dimensions(),
            None,
        );
        painter.resize(width, height);
        render_loop.window_opened();
        log::debug!("headless viewer running");

        while !render_loop.is_closed() {
            match keys.recv_deadline(timer.next_deadline()) {
                Ok(key) => {
                    if render_loop.handle_key(key) == Command::Quit {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                // every injector is gone; keep ticking on the timer alone
                Err(RecvTimeoutError::Disconnected) => keys = never(),
            }

            if timer.poll(Instant::now()) && render_loop.tick(&mut painter) == TickOutcome::Closed {
                break;
            }
        }

        log::debug!("headless viewer stopped");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PaintLog {
    count: usize,
    /// One entry per distinct bitmap, in paint order
    distinct: Vec<Arc<Bitmap>>,
    sizes: Vec<(u32, u32)>,
}

/// Painter that remembers what it was asked to paint
///
/// Clones share the same log, so a test keeps one clone and hands the other to
/// the backend.
#[derive(Debug, Clone, Default)]
pub struct RecordingPainter {
    log: Arc<Mutex<PaintLog>>,
}

impl RecordingPainter {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_log<R>(&self, f: impl FnOnce(&mut PaintLog) -> R) -> R {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut log)
    }

    /// Number of paint calls so far
    pub fn paint_count(&self) -> usize {
        self.with_log(|log| log.count)
    }

    pub fn last_painted(&self) -> Option<Arc<Bitmap>> {
        self.with_log(|log| log.distinct.last().cloned())
    }

    /// Every bitmap that reached the screen, repeats collapsed
    pub fn distinct_painted(&self) -> Vec<Arc<Bitmap>> {
        self.with_log(|log| log.distinct.clone())
    }

    /// Sizes passed to `resize`; the headless backend reports its virtual window once at start
    pub fn resizes(&self) -> Vec<(u32, u32)> {
        self.with_log(|log| log.sizes.clone())
    }
}

impl Painter for RecordingPainter {
    fn paint(&mut self, bitmap: &Arc<Bitmap>) -> anyhow::Result<()> {
        self.with_log(|log| {
            log.count += 1;
            if !log.distinct.last().is_some_and(|last| Arc::ptr_eq(last, bitmap)) {
                log.distinct.push(bitmap.clone());
            }
        });
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.with_log(|log| log.sizes.push((width, height)));
    }
}
