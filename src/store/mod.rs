// src/store/mod.rs
pub mod brainvision;
pub mod error;
pub mod recording;
pub mod source;
pub mod synthetic;

pub use error::LoadError;
pub use recording::{ChannelSeries, Marker, Recording};
pub use source::{
    load_brainvision, load_recording, DirectorySource, MemorySource, RecordingRef,
    RecordingSource, RecordingSpec,
};
pub use synthetic::SyntheticSpec;
