// src/config.rs
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Amplitude axis handling for the waveform chart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AxisMode {
    /// Follow the min and max of the visible window.
    Auto,
    /// Pin the axis to a fixed microvolt range.
    Fixed { min: f32, max: f32 },
}

impl AxisMode {
    pub fn fixed_symmetric(microvolts: f32) -> Self {
        let mag = microvolts.abs().max(f32::EPSILON);
        AxisMode::Fixed {
            min: -mag,
            max: mag,
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, AxisMode::Auto)
    }

    /// Y range to draw for the given visible samples.
    pub fn y_range(&self, values: impl IntoIterator<Item = f32>) -> (f32, f32) {
        match *self {
            AxisMode::Fixed { min, max } => (min, max),
            AxisMode::Auto => {
                let mut min = f32::MAX;
                let mut max = f32::MIN;
                for v in values.into_iter().filter(|v| v.is_finite()) {
                    min = min.min(v);
                    max = max.max(v);
                }
                if min > max {
                    return (-1.0, 1.0);
                }
                // Avoid a zero-height axis.
                let (min, max) = (min as f64, max as f64);
                let pad = ((max - min) * 0.1).max(1.0);
                let lo = (min - pad).max(f32::MIN as f64) as f32;
                let hi = (max + pad).min(f32::MAX as f64) as f32;
                (lo, hi)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{0} must be a positive number of seconds")]
    NonPositive(&'static str),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub default_window_seconds: f64,
    pub minimum_window_seconds: f64,
    pub pan_step_seconds: f64,
    /// Half-height of the pinned axis when auto scale is off.
    pub fixed_range_microvolts: f32,
    pub uploads_dir: PathBuf,
    pub cache_path: PathBuf,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_window_seconds: 10.0,
            minimum_window_seconds: 1.0,
            pan_step_seconds: 5.0,
            fixed_range_microvolts: 10.0,
            uploads_dir: PathBuf::from("uploads"),
            cache_path: PathBuf::from("eeg-viewer-cache.json"),
        }
    }
}

impl ViewerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ViewerConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.default_window_seconds) {
            return Err(ConfigError::NonPositive("default_window_seconds"));
        }
        if !positive(self.minimum_window_seconds) {
            return Err(ConfigError::NonPositive("minimum_window_seconds"));
        }
        if !positive(self.pan_step_seconds) {
            return Err(ConfigError::NonPositive("pan_step_seconds"));
        }
        Ok(())
    }

    pub fn fixed_axis(&self) -> AxisMode {
        AxisMode::fixed_symmetric(self.fixed_range_microvolts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pan_step_seconds": 2.5}}"#).unwrap();
        let config = ViewerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.pan_step_seconds, 2.5);
        assert_eq!(config.default_window_seconds, 10.0);
        assert_eq!(config.fixed_axis(), AxisMode::Fixed { min: -10.0, max: 10.0 });
    }

    #[test]
    fn rejects_zero_minimum_window() {
        let config = ViewerConfig {
            minimum_window_seconds: 0.0,
            ..ViewerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive("minimum_window_seconds"))
        ));
    }

    #[test]
    fn auto_axis_pads_flat_signal() {
        let (lo, hi) = AxisMode::Auto.y_range([3.0, 3.0, 3.0]);
        assert_eq!((lo, hi), (2.0, 4.0));
        assert_eq!(AxisMode::Auto.y_range(std::iter::empty()), (-1.0, 1.0));
    }

    #[test]
    fn auto_axis_skips_non_finite_samples() {
        let (lo, hi) = AxisMode::Auto.y_range([0.0, f32::INFINITY, 10.0, f32::NAN, f32::NEG_INFINITY]);
        assert_eq!((lo, hi), (-1.0, 11.0));
        assert_eq!(AxisMode::Auto.y_range([f32::INFINITY, f32::NAN]), (-1.0, 1.0));
        let (lo, hi) = AxisMode::Auto.y_range([f32::MIN, f32::MAX]);
        assert!(lo.is_finite() && hi.is_finite() && lo < hi);
    }
}
