// src/store/recording.rs
use std::collections::HashSet;
use std::ops::Range;

use ndarray::{Array2, ArrayView1};

use crate::store::LoadError;
use crate::types::Sample;

// Slack, in sample positions, when turning float seconds into indices.
const INDEX_EPSILON: f64 = 1e-6;

/// Annotation read from a marker file, positioned in sample-index space.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub kind: String,
    pub description: String,
    /// Zero-based sample position.
    pub position: usize,
    /// Length in samples.
    pub length: usize,
    /// Channel the marker applies to; `None` means all channels.
    pub channel: Option<usize>,
}

/// Borrowed view of one named channel.
#[derive(Clone, Debug)]
pub struct ChannelSeries<'a> {
    pub name: &'a str,
    pub sample_rate_hz: f64,
    values: ArrayView1<'a, f32>,
}

impl<'a> ChannelSeries<'a> {
    /// Samples at positions `range`, with times derived from the sample rate.
    pub fn slice(&self, range: Range<usize>) -> Vec<Sample> {
        let end = range.end.min(self.values.len());
        let start = range.start.min(end);
        (start..end)
            .map(|i| Sample {
                time: i as f64 / self.sample_rate_hz,
                value: self.values[i],
            })
            .collect()
    }
}

/// Immutable multi-channel recording at a fixed sample rate.
///
/// Every channel has the same number of samples and sample `i` of every
/// channel sits at `i / sample_rate_hz` seconds.
#[derive(Clone, Debug)]
pub struct Recording {
    channel_labels: Vec<String>,
    sample_rate_hz: f64,
    data: Array2<f32>, // channels x samples
    markers: Vec<Marker>,
}

impl Recording {
    pub fn new(
        channel_labels: Vec<String>,
        sample_rate_hz: f64,
        data: Array2<f32>,
        markers: Vec<Marker>,
    ) -> Result<Self, LoadError> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(LoadError::malformed(format!(
                "sample rate must be positive, got {sample_rate_hz}"
            )));
        }
        if channel_labels.len() != data.nrows() {
            return Err(LoadError::malformed(format!(
                "{} channel labels for {} channels",
                channel_labels.len(),
                data.nrows()
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = channel_labels.iter().find(|l| !seen.insert(l.as_str())) {
            return Err(LoadError::malformed(format!("duplicate channel {dup}")));
        }
        if data.is_empty() {
            return Err(LoadError::Empty);
        }
        Ok(Self {
            channel_labels,
            sample_rate_hz,
            data,
            markers,
        })
    }

    /// Builds a recording from per-channel vectors of equal length.
    pub fn from_channels(
        channels: Vec<(String, Vec<f32>)>,
        sample_rate_hz: f64,
    ) -> Result<Self, LoadError> {
        let samples = channels.first().map(|(_, v)| v.len()).unwrap_or(0);
        if let Some((name, v)) = channels.iter().find(|(_, v)| v.len() != samples) {
            return Err(LoadError::malformed(format!(
                "channel {name} has {} samples, expected {samples}",
                v.len()
            )));
        }
        let rows = channels.len();
        let labels = channels.iter().map(|(name, _)| name.clone()).collect();
        let flat: Vec<f32> = channels.into_iter().flat_map(|(_, v)| v).collect();
        let data = Array2::from_shape_vec((rows, samples), flat)
            .map_err(|e| LoadError::malformed(e.to_string()))?;
        Self::new(labels, sample_rate_hz, data, Vec::new())
    }

    pub fn with_markers(mut self, markers: Vec<Marker>) -> Self {
        self.markers = markers;
        self
    }

    /// Channel names in source order.
    pub fn channels(&self) -> &[String] {
        &self.channel_labels
    }

    pub fn first_channel(&self) -> &str {
        // `new` guarantees at least one channel.
        self.channel_labels.first().map(String::as_str).unwrap_or_default()
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channel_index(name).is_some()
    }

    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channel_labels.iter().position(|l| l == name)
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn sample_count(&self) -> usize {
        self.data.ncols()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.sample_count() as f64 / self.sample_rate_hz
    }

    pub fn series(&self, name: &str) -> Option<ChannelSeries<'_>> {
        let idx = self.channel_index(name)?;
        Some(ChannelSeries {
            name: &self.channel_labels[idx],
            sample_rate_hz: self.sample_rate_hz,
            values: self.data.row(idx),
        })
    }

    /// Sample positions whose time lies in `[start, end]` after clamping both
    /// bounds to the recording. `None` when the clamped window is empty.
    pub fn index_range(&self, start: f64, end: f64) -> Option<Range<usize>> {
        let duration = self.duration_seconds();
        let start = start.clamp(0.0, duration);
        let end = end.clamp(0.0, duration);
        if !(start < end) {
            return None;
        }
        let rate = self.sample_rate_hz;
        let first = (start * rate - INDEX_EPSILON).ceil().max(0.0) as usize;
        let last = ((end * rate + INDEX_EPSILON).floor() as usize).min(self.sample_count() - 1);
        (first <= last).then_some(first..last + 1)
    }

    /// Samples of `channel` with `start <= time <= end`, in time order.
    ///
    /// Out-of-range bounds are clamped; an empty window or an unknown channel
    /// yields an empty vector.
    pub fn window(&self, channel: &str, start: f64, end: f64) -> Vec<Sample> {
        let (Some(series), Some(range)) = (self.series(channel), self.index_range(start, end))
        else {
            return Vec::new();
        };
        series.slice(range)
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn markers_in(&self, start: f64, end: f64) -> impl Iterator<Item = &Marker> + '_ {
        let rate = self.sample_rate_hz;
        self.markers.iter().filter(move |m| {
            let t = m.position as f64 / rate;
            t >= start && t <= end
        })
    }
}
