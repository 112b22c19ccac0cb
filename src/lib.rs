pub mod config;
pub mod draw;
pub mod field;
pub mod raster;
pub mod runner;

pub use config::{ConfigError, FieldParameters, Style};
pub use draw::{DrawCommand, Frame, Surface};
pub use field::{Connection, FieldError, Node, NodeField};
pub use raster::RasterSurface;
pub use runner::{CommandDump, FrameSink, PngSink, RenderError, ResizeEvent, Runner};
