pub mod blit;
pub mod error;
pub mod images;
pub mod render;
pub mod text;

pub use blit::blit_centered;
pub use error::RenderError;
pub use images::ImageCache;
pub use render::{FrameStats, SkiaRenderer};
pub use text::{TextCache, render_text_pixmap};
