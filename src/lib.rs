// src/lib.rs
//! Windowed browsing of multi-channel EEG recordings.
//!
//! A [`store::Recording`] is loaded once, a [`viewport::ViewportController`]
//! turns user gestures into a visible window over it, and a
//! [`render::Renderer`] draws that window plus a brush over the whole
//! recording.

pub mod config;
pub mod gui;
pub mod loader;
pub mod persist;
pub mod render;
pub mod session;
pub mod store;
pub mod types;
pub mod viewport;

pub use config::{AxisMode, ViewerConfig};
pub use loader::{DisplayState, RecordingLoader};
pub use session::ViewerSession;
pub use store::{load_recording, LoadError, Recording, RecordingSpec};
pub use types::{PanDirection, Sample, ViewerEvent};
pub use viewport::{ViewportController, ViewportState};
