// src/types.rs
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// One amplitude reading on the recording timeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Seconds from the start of the recording.
    pub time: f64,
    /// Amplitude in microvolts.
    pub value: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanDirection {
    Earlier,
    Later,
}

// Renderer -> controller
#[derive(Clone, Debug, PartialEq)]
pub enum ViewerEvent {
    Pan(PanDirection, f64),
    Brush { start_index: usize, end_index: usize },
    SelectChannel(String),
    ToggleAutoScale,
}

/// Band powers in µV² reported alongside a classification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BandPowers {
    #[serde(deserialize_with = "number_or_string")]
    pub alpha: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub beta: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub theta: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub delta: f64,
}

impl BandPowers {
    /// (label, value) pairs in display order.
    pub fn rows(&self) -> [(&'static str, f64); 4] {
        [
            ("Alpha Power", self.alpha),
            ("Beta Power", self.beta),
            ("Theta Power", self.theta),
            ("Delta Power", self.delta),
        ]
    }
}

/// Classification produced by the external prediction service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: String,
    #[serde(flatten)]
    pub bands: BandPowers,
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prediction)?;
        for (label, value) in self.bands.rows() {
            write!(f, " | {label}: {value:.5e} µV²")?;
        }
        Ok(())
    }
}

// The prediction service formats band powers as "%.5e" strings.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(v) => Ok(v),
        Raw::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_accepts_string_band_powers() {
        let json = r#"{"prediction":"MDD","delta":"1.23450e-11","theta":"2.00000e-12","alpha":3.5e-12,"beta":" 4.1e-13"}"#;
        let result: PredictionResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.prediction, "MDD");
        assert!((result.bands.delta - 1.2345e-11).abs() < 1e-20);
        assert!((result.bands.alpha - 3.5e-12).abs() < 1e-20);
        assert!((result.bands.beta - 4.1e-13).abs() < 1e-20);
    }

    #[test]
    fn prediction_rejects_non_numeric_band_power() {
        let json = r#"{"prediction":"Healthy","delta":"n/a","theta":1,"alpha":1,"beta":1}"#;
        assert!(serde_json::from_str::<PredictionResult>(json).is_err());
    }

    #[test]
    fn display_lists_every_band() {
        let result = PredictionResult {
            prediction: "Healthy".into(),
            bands: BandPowers {
                alpha: 1.0,
                beta: 2.0,
                theta: 3.0,
                delta: 4.0,
            },
        };
        let text = result.to_string();
        assert!(text.starts_with("Healthy"));
        assert!(text.contains("Theta Power: 3.00000e0 µV²"));
    }
}
