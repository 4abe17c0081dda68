//! Overlay drawing for oxidized-rr scripts
//!
//! Scripts draw into an [`OverlayCanvas`] between frames; the host
//! composites the canvas onto each rendered [`FrameBuffer`].

pub mod canvas;
pub mod color;
pub mod font;
pub mod image;
pub mod screen;

pub use canvas::{blend, CanvasState, OverlayCanvas};
pub use color::{Channel, Color, ColorBuilder};
pub use image::{Blit, GdImage};
pub use screen::{composite_overlay, FrameBuffer, PixelFormat};
