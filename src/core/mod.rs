pub mod frame;
pub mod frame_slot;
pub mod geometry;
pub mod gpu_context;
pub mod input;
pub mod input_adapter;
pub mod playback;
pub mod render_loop;
pub mod shared;
pub mod surface_renderer;
pub mod timer;

pub use frame::{Bitmap, Frame, PixelFormat, MAX_DIMENSION};
pub use frame_slot::FrameSlot;
pub use geometry::{fit_centered, initial_window_size, Placement};
pub use gpu_context::GpuContext;
pub use input::{Command, InputHandler, Key};
pub use playback::{Playback, PlaybackMode};
pub use render_loop::{RenderLoop, TickOutcome, WindowSettings};
pub use shared::SharedViewer;
pub use surface_renderer::SurfaceRenderer;
pub use timer::TickTimer;
