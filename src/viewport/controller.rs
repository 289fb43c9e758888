// src/viewport/controller.rs
use crate::config::{AxisMode, ViewerConfig};
use crate::store::Recording;
use crate::types::{PanDirection, ViewerEvent};
use crate::viewport::brush::{index_to_seconds, BrushThumb};
use crate::viewport::state::ViewportState;

/// Owns the viewport of one displayed recording.
///
/// Every operation is total: bad input is clamped or ignored so that after
/// any call `0 <= start < end <= duration` and `end - start >= min_window()`.
#[derive(Clone, Debug)]
pub struct ViewportController {
    state: ViewportState,
    channels: Vec<String>,
    duration: f64,
    sample_rate_hz: f64,
    total_samples: usize,
    default_window: f64,
    minimum_window: f64,
    fixed_axis: AxisMode,
}

impl ViewportController {
    pub fn new(recording: &Recording, config: &ViewerConfig) -> Self {
        let mut controller = Self {
            state: ViewportState {
                window_start: 0.0,
                window_end: 0.0,
                selected_channel: String::new(),
                auto_scale: true,
            },
            channels: Vec::new(),
            duration: 0.0,
            sample_rate_hz: 1.0,
            total_samples: 0,
            default_window: config.default_window_seconds,
            minimum_window: config.minimum_window_seconds,
            fixed_axis: config.fixed_axis(),
        };
        controller.on_recording_replaced(recording);
        controller
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Narrowest window allowed; never wider than the recording itself.
    pub fn min_window(&self) -> f64 {
        self.minimum_window.min(self.duration)
    }

    pub fn axis_mode(&self) -> AxisMode {
        if self.state.auto_scale {
            AxisMode::Auto
        } else {
            self.fixed_axis
        }
    }

    pub fn brush_thumb(&self) -> BrushThumb {
        BrushThumb::from_window(
            self.state.window_start,
            self.state.window_end,
            self.sample_rate_hz,
            self.total_samples,
        )
    }

    pub fn select_channel(&mut self, name: &str) {
        if self.channels.iter().any(|c| c == name) {
            self.state.selected_channel = name.to_owned();
        } else {
            log::debug!("ignoring unknown channel {name:?}");
        }
    }

    pub fn toggle_auto_scale(&mut self) {
        self.state.auto_scale = !self.state.auto_scale;
    }

    pub fn pan(&mut self, direction: PanDirection, shift_seconds: f64) {
        if !(shift_seconds.is_finite() && shift_seconds > 0.0) {
            log::debug!("ignoring pan by {shift_seconds}");
            return;
        }
        let ViewportState {
            window_start: start,
            window_end: end,
            ..
        } = self.state;
        let (start, end) = match direction {
            // Start clamps at 0 first; end never drops below the minimum width,
            // so the window may narrow at the left edge but never collapses.
            PanDirection::Earlier => (
                (start - shift_seconds).max(0.0),
                (end - shift_seconds).max(self.min_window()),
            ),
            PanDirection::Later => {
                if end + shift_seconds > self.duration {
                    let width = end - start;
                    ((self.duration - width).max(0.0), self.duration)
                } else {
                    (start + shift_seconds, end + shift_seconds)
                }
            }
        };
        self.commit(start, end);
    }

    /// Applies a brush drag reported in sample positions. A range with
    /// `end_index <= start_index` is rejected and the window is kept.
    pub fn set_window_by_brush(&mut self, start_index: usize, end_index: usize) {
        if end_index <= start_index {
            log::debug!("rejecting brush range {start_index}..{end_index}");
            return;
        }
        let start = index_to_seconds(start_index, self.sample_rate_hz).min(self.duration);
        let end = index_to_seconds(end_index, self.sample_rate_hz).min(self.duration);
        let min = self.min_window();
        let (start, end) = if end - start < min {
            let widened = start + min;
            if widened > self.duration {
                ((self.duration - min).max(0.0), self.duration)
            } else {
                (start, widened)
            }
        } else {
            (start, end)
        };
        self.commit(start, end);
    }

    /// Resets to the default viewport for `recording`.
    pub fn on_recording_replaced(&mut self, recording: &Recording) {
        self.channels = recording.channels().to_vec();
        self.duration = recording.duration_seconds();
        self.sample_rate_hz = recording.sample_rate_hz();
        self.total_samples = recording.sample_count();
        let window = self
            .default_window
            .max(self.min_window())
            .min(self.duration);
        self.state = ViewportState {
            window_start: 0.0,
            window_end: window,
            selected_channel: recording.first_channel().to_owned(),
            auto_scale: true,
        };
        log::debug!(
            "viewport reset: [0, {window}] of {:.3}s, channel {}",
            self.duration,
            self.state.selected_channel
        );
    }

    pub fn apply(&mut self, event: &ViewerEvent) {
        match event {
            ViewerEvent::Pan(direction, shift) => self.pan(*direction, *shift),
            ViewerEvent::Brush {
                start_index,
                end_index,
            } => self.set_window_by_brush(*start_index, *end_index),
            ViewerEvent::SelectChannel(name) => self.select_channel(name),
            ViewerEvent::ToggleAutoScale => self.toggle_auto_scale(),
        }
    }

    fn commit(&mut self, start: f64, end: f64) {
        self.state.window_start = start;
        self.state.window_end = end;
        log::debug!("viewport window [{start:.3}, {end:.3}]");
    }
}
