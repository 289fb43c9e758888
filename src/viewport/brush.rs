// src/viewport/brush.rs
//! Conversion between the brush's sample-index space and window seconds.
//!
//! The brush reports integer positions into the channel; a position `i` is the
//! sample at `i / sample_rate_hz` seconds.

pub fn index_to_seconds(index: usize, sample_rate_hz: f64) -> f64 {
    index as f64 / sample_rate_hz
}

/// Nearest sample position for `seconds`; negative times map to 0.
pub fn seconds_to_index(seconds: f64, sample_rate_hz: f64) -> usize {
    let pos = (seconds * sample_rate_hz).round();
    if pos.is_finite() && pos > 0.0 {
        pos as usize
    } else {
        0
    }
}

/// Visible thumb of the brush/minimap, in sample positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrushThumb {
    pub start_index: usize,
    pub end_index: usize,
    pub total_samples: usize,
}

impl BrushThumb {
    pub fn from_window(start: f64, end: f64, sample_rate_hz: f64, total_samples: usize) -> Self {
        Self {
            start_index: seconds_to_index(start, sample_rate_hz).min(total_samples),
            end_index: seconds_to_index(end, sample_rate_hz).min(total_samples),
            total_samples,
        }
    }

    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
