// src/store/brainvision.rs
//! Reader for BrainVision recordings: a text header (`.vhdr`), a text marker
//! file (`.vmrk`) and a little-endian binary sample file (`.eeg`).

use ndarray::Array2;

use crate::store::{LoadError, Marker};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataOrientation {
    /// Sample-major: all channels of sample 0, then sample 1, ...
    Multiplexed,
    /// Channel-major: every sample of channel 0, then channel 1, ...
    Vectorized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryFormat {
    Int16,
    Float32,
}

impl BinaryFormat {
    pub fn width(&self) -> usize {
        match self {
            BinaryFormat::Int16 => 2,
            BinaryFormat::Float32 => 4,
        }
    }

    fn read(&self, bytes: &[u8], offset: usize) -> f32 {
        match self {
            BinaryFormat::Int16 => i16::from_le_bytes([bytes[offset], bytes[offset + 1]]) as f32,
            BinaryFormat::Float32 => f32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ]),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntervalUnit {
    Microseconds,
    Milliseconds,
}

impl IntervalUnit {
    fn per_second(&self) -> f64 {
        match self {
            IntervalUnit::Microseconds => 1e6,
            IntervalUnit::Milliseconds => 1e3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChannelInfo {
    pub name: String,
    /// Multiplier from raw units to microvolts.
    pub scale_to_microvolts: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeaderInfo {
    pub data_file: Option<String>,
    pub marker_file: Option<String>,
    pub orientation: DataOrientation,
    pub binary_format: BinaryFormat,
    pub sampling_interval: f64,
    pub interval_unit: IntervalUnit,
    pub channels: Vec<ChannelInfo>,
}

impl HeaderInfo {
    pub fn sample_rate_hz(&self) -> f64 {
        self.interval_unit.per_second() / self.sampling_interval
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }
}

// `\1` is the BrainVision escape for a comma inside a field.
fn unescape(field: &str) -> String {
    field.replace("\\1", ",")
}

fn unit_scale(unit: &str) -> f32 {
    match unit.trim() {
        "nV" => 1e-3,
        "mV" => 1e3,
        "V" => 1e6,
        // µV, uV, or unspecified
        _ => 1.0,
    }
}

/// Iterates `(section, key, value)` for every `key=value` line.
fn entries(text: &str) -> impl Iterator<Item = (String, &str, &str)> + '_ {
    let mut section = String::new();
    text.lines().filter_map(move |raw| {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') {
            return None;
        }
        if line.starts_with('[') && line.ends_with(']') {
            section = line[1..line.len() - 1].trim().to_owned();
            return None;
        }
        let (key, value) = line.split_once('=')?;
        Some((section.clone(), key.trim(), value.trim()))
    })
}

// Well above any amplifier montage; larger counts are corrupt headers.
pub const MAX_CHANNELS: usize = 4096;

pub fn parse_header(text: &str) -> Result<HeaderInfo, LoadError> {
    let interval_unit = if text.contains("Sampling interval in microseconds") {
        IntervalUnit::Microseconds
    } else {
        IntervalUnit::Milliseconds
    };

    let mut data_file = None;
    let mut marker_file = None;
    let mut orientation = DataOrientation::Multiplexed;
    let mut binary_format = BinaryFormat::Int16;
    let mut channel_count: Option<usize> = None;
    let mut sampling_interval: Option<f64> = None;
    let mut channel_lines: Vec<(usize, &str)> = Vec::new();

    for (section, key, value) in entries(text) {
        match (section.as_str(), key) {
            ("Common Infos", "DataFile") => data_file = Some(value.to_owned()),
            ("Common Infos", "MarkerFile") => marker_file = Some(value.to_owned()),
            ("Common Infos", "DataFormat") if !value.eq_ignore_ascii_case("BINARY") => {
                return Err(LoadError::malformed(format!(
                    "unsupported DataFormat {value}"
                )));
            }
            ("Common Infos", "DataOrientation") => {
                orientation = match value.to_ascii_uppercase().as_str() {
                    "MULTIPLEXED" => DataOrientation::Multiplexed,
                    "VECTORIZED" => DataOrientation::Vectorized,
                    _ => {
                        return Err(LoadError::malformed(format!(
                            "unsupported DataOrientation {value}"
                        )))
                    }
                }
            }
            ("Common Infos", "NumberOfChannels") => {
                let n = value.parse::<usize>().map_err(|_| {
                    LoadError::malformed(format!("invalid NumberOfChannels {value:?}"))
                })?;
                channel_count = Some(n);
            }
            ("Common Infos", "SamplingInterval") => {
                let v = value.parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0);
                sampling_interval = Some(v.ok_or_else(|| {
                    LoadError::malformed(format!("invalid SamplingInterval {value:?}"))
                })?);
            }
            ("Binary Infos", "BinaryFormat") => {
                binary_format = match value.to_ascii_uppercase().as_str() {
                    "INT_16" => BinaryFormat::Int16,
                    "IEEE_FLOAT_32" => BinaryFormat::Float32,
                    _ => {
                        return Err(LoadError::malformed(format!(
                            "unsupported BinaryFormat {value}"
                        )))
                    }
                }
            }
            ("Channel Infos", key) => {
                if let Some(idx) = key.strip_prefix("Ch").and_then(|n| n.parse::<usize>().ok()) {
                    channel_lines.push((idx, value));
                }
            }
            _ => {}
        }
    }

    let channel_count = channel_count
        .filter(|n| *n > 0)
        .ok_or_else(|| LoadError::malformed("missing NumberOfChannels"))?;
    if channel_count > MAX_CHANNELS {
        return Err(LoadError::malformed(format!(
            "NumberOfChannels {channel_count} exceeds {MAX_CHANNELS}"
        )));
    }
    let sampling_interval = sampling_interval.unwrap_or_else(|| {
        log::warn!("header has no SamplingInterval; assuming an interval of 1");
        1.0
    });

    let mut channels: Vec<ChannelInfo> = (1..=channel_count)
        .map(|i| ChannelInfo {
            name: format!("Ch{i}"),
            scale_to_microvolts: 1.0,
        })
        .collect();
    for (idx, value) in channel_lines {
        let Some(slot) = idx.checked_sub(1).and_then(|i| channels.get_mut(i)) else {
            log::warn!("ignoring channel entry Ch{idx} beyond NumberOfChannels");
            continue;
        };
        let mut fields = value.split(',');
        let name = fields.next().map(unescape).unwrap_or_default();
        let _reference = fields.next();
        let resolution = match fields.next().map(str::trim) {
            None | Some("") => 1.0,
            Some(r) => r.parse::<f32>().map_err(|_| {
                LoadError::malformed(format!("invalid resolution {r:?} for Ch{idx}"))
            })?,
        };
        let unit = fields.next().unwrap_or("");
        if !name.is_empty() {
            slot.name = name;
        }
        slot.scale_to_microvolts = resolution * unit_scale(unit);
    }

    Ok(HeaderInfo {
        data_file,
        marker_file,
        orientation,
        binary_format,
        sampling_interval,
        interval_unit,
        channels,
    })
}

/// Parses the `[Marker Infos]` section. Unreadable entries are skipped.
pub fn parse_markers(text: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    for (section, key, value) in entries(text) {
        if section != "Marker Infos" || !key.starts_with("Mk") {
            continue;
        }
        let fields: Vec<&str> = value.split(',').collect();
        let position = fields.get(2).and_then(|p| p.trim().parse::<usize>().ok());
        let Some(position) = position else {
            log::warn!("skipping marker {key} with unreadable position");
            continue;
        };
        let length = fields
            .get(3)
            .and_then(|l| l.trim().parse::<usize>().ok())
            .unwrap_or(1);
        let channel = fields
            .get(4)
            .and_then(|c| c.trim().parse::<usize>().ok())
            .and_then(|c| c.checked_sub(1));
        markers.push(Marker {
            kind: fields.first().map(|s| unescape(s)).unwrap_or_default(),
            description: fields.get(1).map(|s| unescape(s)).unwrap_or_default(),
            position: position.saturating_sub(1),
            length,
            channel,
        });
    }
    markers
}

/// Decodes the binary sample file into a channels x samples matrix in µV.
pub fn decode_samples(bytes: &[u8], header: &HeaderInfo) -> Result<Array2<f32>, LoadError> {
    let channels = header.channels.len();
    let width = header.binary_format.width();
    let frame = channels * width;
    if frame == 0 || bytes.len() % frame != 0 {
        return Err(LoadError::malformed(format!(
            "{} data bytes is not a whole number of {channels}-channel frames",
            bytes.len()
        )));
    }
    let samples = bytes.len() / frame;
    if samples == 0 {
        return Err(LoadError::Empty);
    }
    let format = header.binary_format;
    let orientation = header.orientation;
    Ok(Array2::from_shape_fn((channels, samples), |(c, s)| {
        let slot = match orientation {
            DataOrientation::Multiplexed => s * channels + c,
            DataOrientation::Vectorized => c * samples + s,
        };
        format.read(bytes, slot * width) * header.channels[c].scale_to_microvolts
    }))
}
