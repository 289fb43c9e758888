// src/render/mod.rs
pub mod error;
pub mod frame;
pub mod png;

pub use error::RenderError;
pub use frame::{RenderFrame, Renderer};
pub use png::{render_frame_png, PlotStyle, PngRenderer};
