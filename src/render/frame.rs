// src/render/frame.rs
use crate::config::AxisMode;
use crate::render::RenderError;
use crate::store::Marker;
use crate::types::{Sample, ViewerEvent};
use crate::viewport::BrushThumb;

/// Everything a renderer needs to draw one viewport.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderFrame {
    pub channel: String,
    pub channels: Vec<String>,
    /// Visible window in seconds.
    pub window: (f64, f64),
    /// Samples of `channel` inside `window`.
    pub samples: Vec<Sample>,
    pub axis_mode: AxisMode,
    /// Amplitude range to draw, already resolved from `axis_mode`.
    pub y_range: (f32, f32),
    pub brush: BrushThumb,
    pub sample_rate_hz: f64,
    pub markers: Vec<Marker>,
}

impl RenderFrame {
    pub fn duration_seconds(&self) -> f64 {
        self.brush.total_samples as f64 / self.sample_rate_hz
    }
}

/// Draws frames and reports the user's gestures back as events.
///
/// Implementations keep no viewport state of their own beyond an in-progress
/// drag.
pub trait Renderer {
    fn draw(&mut self, frame: &RenderFrame) -> Result<Vec<ViewerEvent>, RenderError>;
}
