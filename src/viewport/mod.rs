// src/viewport/mod.rs
pub mod brush;
pub mod controller;
pub mod state;

pub use brush::{index_to_seconds, seconds_to_index, BrushThumb};
pub use controller::ViewportController;
pub use state::ViewportState;
