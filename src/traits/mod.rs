pub mod backend;
pub mod painter;

pub use backend::*;
pub use painter::*;
