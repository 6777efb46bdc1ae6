pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod headless;
pub mod imshow;
pub mod math;
pub mod traits;
pub mod viewer;
pub mod window;

pub use config::ViewerConfig;
pub use crate::core::{Bitmap, Command, Frame, Key, PixelFormat};
pub use error::ViewerError;
pub use headless::{HeadlessBackend, KeyInjector, RecordingPainter};
pub use imshow::{imshow, ImageSource, ImshowOptions, KeyAction, KeyBinding, Slideshow};
pub use traits::{Backend, Painter};
pub use viewer::Viewer;
pub use window::WinitBackend;
