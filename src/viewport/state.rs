// src/viewport/state.rs
/// What the viewer currently shows.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewportState {
    pub window_start: f64,
    pub window_end: f64,
    pub selected_channel: String,
    pub auto_scale: bool,
}

impl ViewportState {
    pub fn width(&self) -> f64 {
        self.window_end - self.window_start
    }
}
