//! Blocking image display on the calling thread
//!
//! `imshow` opens a window for a single image or a slideshow and returns once
//! the user closes it. Unlike `Viewer` it needs the event loop on the calling
//! thread, which is the only option on macOS.
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow},
    window::{Window, WindowId},
};

use crate::core::frame::{Bitmap, Frame};
use crate::core::input::{Command, InputHandler, Key};
use crate::core::input_adapter::key_from_event;
use crate::core::render_loop::WindowSettings;
use crate::core::surface_renderer::SurfaceRenderer;
use crate::core::timer::TickTimer;
use crate::error::ViewerError;
use crate::traits::Painter;
use crate::window::{build_event_loop, display_available, open_window, EventLoopLease};

/// Images for `imshow`
pub enum ImageSource {
    Single(Frame),
    /// Finite list, navigable both ways
    Sequence(Vec<Frame>),
    /// Frames pulled on demand; there is no going back
    Lazy(Box<dyn Iterator<Item = Frame>>),
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Single(frame) => f.debug_tuple("Single").field(&(frame.width, frame.height)).finish(),
            ImageSource::Sequence(frames) => f.debug_tuple("Sequence").field(&frames.len()).finish(),
            ImageSource::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

impl From<Frame> for ImageSource {
    fn from(frame: Frame) -> Self {
        ImageSource::Single(frame)
    }
}

impl From<Vec<Frame>> for ImageSource {
    fn from(frames: Vec<Frame>) -> Self {
        ImageSource::Sequence(frames)
    }
}

/// Caller-supplied key action, called with every image and the current index
pub type KeyAction = Box<dyn FnMut(&[Arc<Bitmap>], usize)>;

/// Extra key for a slideshow, consulted before the built-in bindings
pub struct KeyBinding {
    pub key: Key,
    /// Shown next to the key in the help text
    pub description: String,
    pub action: KeyAction,
}

impl fmt::Debug for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBinding")
            .field("key", &self.key)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct ImshowOptions {
    pub caption: String,
    /// Autoplay period
    pub interval: Duration,
    pub margin: f32,
    pub size: Option<[u32; 2]>,
    /// Extra keys; only finite sequences accept them
    pub keymap: Vec<KeyBinding>,
}

impl ImshowOptions {
    /// Add a key binding; a later binding for the same key wins
    pub fn bind(
        mut self,
        key: Key,
        description: impl Into<String>,
        action: impl FnMut(&[Arc<Bitmap>], usize) + 'static,
    ) -> Self {
        self.keymap.retain(|binding| binding.key != key);
        self.keymap.push(KeyBinding {
            key,
            description: description.into(),
            action: Box::new(action),
        });
        self
    }

    pub fn validate(&self) -> Result<(), ViewerError> {
        if !(self.margin > 0.0 && self.margin <= 1.0) {
            return Err(ViewerError::Config(format!(
                "margin must be in (0, 1], got {}",
                self.margin
            )));
        }
        if self.interval.is_zero() || Instant::now().checked_add(self.interval).is_none() {
            return Err(ViewerError::Config(format!(
                "autoplay interval must be positive and finite, got {:?}",
                self.interval
            )));
        }
        if let Some([width, height]) = self.size {
            if width == 0 || height == 0 {
                return Err(ViewerError::Config(format!(
                    "window size must be non-zero, got {width}x{height}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ImshowOptions {
    fn default() -> Self {
        Self {
            caption: "imshow".to_string(),
            interval: Duration::from_millis(500),
            margin: 0.95,
            size: None,
            keymap: Vec::new(),
        }
    }
}

enum Images {
    Single(Arc<Bitmap>),
    Sequence {
        bitmaps: Vec<Arc<Bitmap>>,
        index: usize,
    },
    Lazy {
        frames: Box<dyn Iterator<Item = Frame>>,
        current: Arc<Bitmap>,
        index: usize,
    },
}

/// Next displayable frame of an iterator; invalid ones are skipped
fn pull(frames: &mut dyn Iterator<Item = Frame>) -> Option<Arc<Bitmap>> {
    for frame in frames {
        match Bitmap::try_from(frame) {
            Ok(bitmap) => return Some(Arc::new(bitmap)),
            Err(err) => log::warn!("skipping frame: {err}"),
        }
    }
    None
}

/// Navigation and autoplay state of an `imshow` window
///
/// Sequences and lazy sources start paused; `s` starts autoplay, which stops
/// by itself at the end.
pub struct Slideshow {
    images: Images,
    input: InputHandler,
    keymap: Vec<KeyBinding>,
    caption: String,
    playing: bool,
    autoplay: TickTimer,
    closed: bool,
}

impl Slideshow {
    pub fn new(source: ImageSource, options: ImshowOptions, now: Instant) -> Result<Self, ViewerError> {
        options.validate()?;
        if !options.keymap.is_empty() && !matches!(source, ImageSource::Sequence(_)) {
            return Err(ViewerError::Config(
                "custom key bindings need a finite image sequence".into(),
            ));
        }

        let (images, input) = match source {
            ImageSource::Single(frame) => (
                Images::Single(Arc::new(Bitmap::try_from(frame)?)),
                InputHandler::still(),
            ),
            ImageSource::Sequence(frames) => {
                if frames.is_empty() {
                    return Err(ViewerError::InvalidFrame("image sequence is empty".into()));
                }
                let bitmaps = frames
                    .into_iter()
                    .map(|frame| Bitmap::try_from(frame).map(Arc::new))
                    .collect::<Result<Vec<_>, _>>()?;
                (Images::Sequence { bitmaps, index: 0 }, InputHandler::slideshow())
            }
            ImageSource::Lazy(mut frames) => {
                let current = pull(frames.as_mut()).ok_or_else(|| {
                    ViewerError::InvalidFrame("image source yielded no displayable frame".into())
                })?;
                (Images::Lazy { frames, current, index: 0 }, InputHandler::threaded())
            }
        };

        Ok(Self {
            images,
            input,
            keymap: options.keymap,
            caption: options.caption,
            playing: false,
            autoplay: TickTimer::new(options.interval, now),
            closed: false,
        })
    }

    pub fn current(&self) -> &Arc<Bitmap> {
        match &self.images {
            Images::Single(bitmap) => bitmap,
            Images::Sequence { bitmaps, index } => &bitmaps[*index],
            Images::Lazy { current, .. } => current,
        }
    }

    /// Zero-based position of the current image
    pub fn index(&self) -> usize {
        match &self.images {
            Images::Single(_) => 0,
            Images::Sequence { index, .. } | Images::Lazy { index, .. } => *index,
        }
    }

    /// Window title: the caption plus the position, e.g. `photos [3/10]`
    pub fn title(&self) -> String {
        match &self.images {
            Images::Single(_) => self.caption.clone(),
            Images::Sequence { bitmaps, index } => {
                format!("{} [{}/{}]", self.caption, index + 1, bitmaps.len())
            }
            Images::Lazy { index, .. } => format!("{} [{}]", self.caption, index + 1),
        }
    }

    /// Largest image size in the source, used to size the window
    pub fn max_dimensions(&self) -> (u32, u32) {
        match &self.images {
            Images::Sequence { bitmaps, .. } => bitmaps.iter().fold((1, 1), |(w, h), bitmap| {
                (w.max(bitmap.width()), h.max(bitmap.height()))
            }),
            _ => self.current().dimensions(),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// When autoplay wants to advance next, if it is running
    pub fn next_deadline(&self) -> Option<Instant> {
        self.playing.then(|| self.autoplay.next_deadline())
    }

    /// Apply a key press. Returns the command it mapped to.
    pub fn handle_key(&mut self, key: Key, now: Instant) -> Command {
        if let Images::Sequence { bitmaps, index } = &self.images {
            if let Some(binding) = self.keymap.iter_mut().find(|binding| binding.key == key) {
                (binding.action)(bitmaps.as_slice(), *index);
                return Command::Custom(key);
            }
        }

        let command = self.input.handle(key);
        match command {
            Command::Quit => self.closed = true,
            Command::Next => {
                if !self.advance() {
                    eprintln!("Press 'q' to quit");
                }
            }
            Command::Previous => {
                self.go_back();
            }
            Command::TogglePlay => {
                self.playing = !self.playing;
                if self.playing {
                    self.autoplay.reset(now);
                }
            }
            Command::Help => eprintln!("{}", self.usage()),
            Command::Unbound(_) => eprintln!("Press 'h' to show help"),
            Command::Captured(_) | Command::Custom(_) => {}
        }
        command
    }

    /// Help text: custom bindings first, then the built-in ones
    pub fn usage(&self) -> String {
        let builtin = self.input.usage();
        let mut text = String::from("Usage:");
        for binding in &self.keymap {
            text.push_str(&format!("\n\t{}: {}", binding.key, binding.description));
        }
        text.push_str(builtin.strip_prefix("Usage:").unwrap_or(builtin.as_str()));
        text
    }

    /// Advance if autoplay is due. Returns true when the image changed.
    pub fn poll_autoplay(&mut self, now: Instant) -> bool {
        if !self.playing || !self.autoplay.poll(now) {
            return false;
        }
        if self.advance() {
            return true;
        }
        eprintln!("Press 'q' to quit");
        self.playing = false;
        false
    }

    /// Move to the next image. Returns false at the end of the source.
    fn advance(&mut self) -> bool {
        match &mut self.images {
            Images::Single(_) => false,
            Images::Sequence { bitmaps, index } => {
                if *index + 1 >= bitmaps.len() {
                    return false;
                }
                *index += 1;
                true
            }
            Images::Lazy { frames, current, index } => match pull(frames.as_mut()) {
                Some(bitmap) => {
                    *current = bitmap;
                    *index += 1;
                    true
                }
                None => false,
            },
        }
    }

    fn go_back(&mut self) -> bool {
        match &mut self.images {
            Images::Sequence { index, .. } if *index > 0 => {
                *index -= 1;
                true
            }
            _ => false,
        }
    }
}

/// Show `source` in a window on the calling thread until the user closes it
///
/// Keys: `q` quit, `h` help; for sequences `n`/`p` next/previous and `s`
/// autoplay every `options.interval`; lazy sources have no `p`. Sequences
/// also take the extra keys in `options.keymap`.
pub fn imshow(source: impl Into<ImageSource>, options: ImshowOptions) -> Result<(), ViewerError> {
    let (size, margin) = (options.size, options.margin);
    let slideshow = Slideshow::new(source.into(), options, Instant::now())?;

    let _lease = EventLoopLease::acquire()?;
    display_available()?;
    let event_loop = build_event_loop(false).map_err(|err| ViewerError::from_backend(&err))?;

    let mut app = ImshowApp {
        settings: WindowSettings {
            title: slideshow.title(),
            size,
            resizable: true,
            margin,
        },
        slideshow,
        window: None,
        renderer: None,
        setup_error: None,
    };
    event_loop
        .run_app(&mut app)
        .map_err(|err| ViewerError::Setup(format!("event loop failed: {err}")))?;

    match app.setup_error {
        Some(err) => Err(ViewerError::from_backend(&err)),
        None => Ok(()),
    }
}

struct ImshowApp {
    slideshow: Slideshow,
    settings: WindowSettings,
    window: Option<Arc<Window>>,
    renderer: Option<SurfaceRenderer>,
    setup_error: Option<anyhow::Error>,
}

impl ImshowApp {
    fn image_changed(&self) {
        if let Some(window) = &self.window {
            let title = self.slideshow.title();
            log::info!("{title}");
            window.set_title(&title);
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for ImshowApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let frame = Some(self.slideshow.max_dimensions());
        match open_window(event_loop, &self.settings, frame) {
            Ok((window, renderer)) => {
                window.request_redraw();
                self.window = Some(window);
                self.renderer = Some(renderer);
            }
            Err(err) => {
                log::error!("{err:#}");
                self.setup_error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size.width, size.height);
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let Some(key) = key_from_event(&event) else {
                    return;
                };
                let before = (self.slideshow.index(), Arc::as_ptr(self.slideshow.current()));
                self.slideshow.handle_key(key, Instant::now());

                if self.slideshow.is_closed() {
                    event_loop.exit();
                } else if before != (self.slideshow.index(), Arc::as_ptr(self.slideshow.current())) {
                    self.image_changed();
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(renderer) = self.renderer.as_mut() {
                    if let Err(err) = renderer.paint(self.slideshow.current()) {
                        log::warn!("paint failed: {err:#}");
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.slideshow.poll_autoplay(Instant::now()) {
            self.image_changed();
        }

        match self.slideshow.next_deadline() {
            Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.renderer = None;
        self.window = None;
    }
}
