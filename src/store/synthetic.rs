// src/store/synthetic.rs
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::store::{LoadError, Recording};

/// Parameters for a generated demo recording.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticSpec {
    pub channels: Vec<String>,
    pub sample_rate_hz: f64,
    pub duration_secs: f64,
    pub seed: u64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            channels: ["FP1", "FP2", "F3", "F4", "C3", "C4", "O1", "O2"]
                .into_iter()
                .map(String::from)
                .collect(),
            sample_rate_hz: 256.0,
            duration_secs: 120.0,
            seed: 7,
        }
    }
}

struct SignalGen {
    freq_hz: f64,
    phase: f64,
    amp_uv: f32,
    noise_uv: f32,
    cosine: bool,
}

impl SignalGen {
    fn sample(&self, t: f64, rng: &mut StdRng) -> f32 {
        let arg = 2.0 * std::f64::consts::PI * self.freq_hz * t + self.phase;
        let carrier = if self.cosine { arg.cos() } else { arg.sin() };
        let noise = rng.gen_range(-self.noise_uv..=self.noise_uv);
        carrier as f32 * self.amp_uv + noise
    }
}

/// Sine/cosine carriers with seeded noise; same seed, same samples.
pub fn generate(spec: &SyntheticSpec) -> Result<Recording, LoadError> {
    if !(spec.duration_secs.is_finite() && spec.duration_secs > 0.0) {
        return Err(LoadError::Empty);
    }
    let samples = (spec.duration_secs * spec.sample_rate_hz).round();
    if !(samples.is_finite() && samples >= 1.0) {
        return Err(LoadError::Empty);
    }
    let samples = samples as usize;
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let channels = spec
        .channels
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let gen = SignalGen {
                freq_hz: 8.0 + idx as f64 * 1.5,
                phase: idx as f64 * 0.6,
                amp_uv: 6.0,
                noise_uv: 1.5,
                cosine: idx % 2 == 1,
            };
            let values = (0..samples)
                .map(|i| gen.sample(i as f64 / spec.sample_rate_hz, &mut rng))
                .collect();
            (name.clone(), values)
        })
        .collect();
    log::debug!(
        "generated {} synthetic channels x {samples} samples",
        spec.channels.len()
    );
    Recording::from_channels(channels, spec.sample_rate_hz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_spec_matches_two_minute_recording() {
        let rec = generate(&SyntheticSpec::default()).unwrap();
        assert_eq!(rec.sample_count(), 120 * 256);
        assert_eq!(rec.channels()[0], "FP1");
        assert_eq!(rec.duration_seconds(), 120.0);
    }

    #[test]
    fn same_seed_same_samples() {
        let spec = SyntheticSpec {
            duration_secs: 2.0,
            ..SyntheticSpec::default()
        };
        let a = generate(&spec).unwrap();
        let b = generate(&spec).unwrap();
        assert_eq!(a.window("O2", 0.0, 2.0), b.window("O2", 0.0, 2.0));
    }

    #[test]
    fn zero_duration_is_empty() {
        let spec = SyntheticSpec {
            duration_secs: 0.0,
            ..SyntheticSpec::default()
        };
        assert!(matches!(generate(&spec), Err(LoadError::Empty)));
    }
}
