// src/store/source.rs
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::store::brainvision::{decode_samples, parse_header, parse_markers};
use crate::store::synthetic::{self, SyntheticSpec};
use crate::store::{LoadError, Recording};

/// Identifies an uploaded recording by its header file name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordingRef(String);

impl RecordingRef {
    pub fn new(header_name: impl Into<String>) -> Self {
        Self(header_name.into())
    }

    pub fn header_name(&self) -> &str {
        &self.0
    }

    /// Name of the file next to the header with extension `ext`.
    pub fn sibling(&self, ext: &str) -> String {
        Path::new(&self.0)
            .with_extension(ext)
            .to_string_lossy()
            .into_owned()
    }
}

impl fmt::Display for RecordingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Query interface to wherever uploaded recordings live.
pub trait RecordingSource: Send + Sync {
    /// Reference to the most recently uploaded recording.
    fn latest_reference(&self) -> Result<RecordingRef, LoadError>;

    /// Raw contents of `file`, which belongs to the same upload as `reference`.
    fn fetch_bytes(&self, reference: &RecordingRef, file: &str) -> Result<Vec<u8>, LoadError>;

    fn fetch_text(&self, reference: &RecordingRef, file: &str) -> Result<String, LoadError> {
        let bytes = self.fetch_bytes(reference, file)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// What to load.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordingSpec {
    Latest,
    Upload(RecordingRef),
    Synthetic(SyntheticSpec),
}

impl fmt::Display for RecordingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingSpec::Latest => f.write_str("latest upload"),
            RecordingSpec::Upload(r) => write!(f, "upload {r}"),
            RecordingSpec::Synthetic(s) => write!(
                f,
                "synthetic {}ch {}s @ {} Hz",
                s.channels.len(),
                s.duration_secs,
                s.sample_rate_hz
            ),
        }
    }
}

pub fn load_recording<S>(source: &S, spec: &RecordingSpec) -> Result<Recording, LoadError>
where
    S: RecordingSource + ?Sized,
{
    match spec {
        RecordingSpec::Latest => {
            let reference = source.latest_reference()?;
            load_brainvision(source, &reference)
        }
        RecordingSpec::Upload(reference) => load_brainvision(source, reference),
        RecordingSpec::Synthetic(spec) => synthetic::generate(spec),
    }
}

pub fn load_brainvision<S>(source: &S, reference: &RecordingRef) -> Result<Recording, LoadError>
where
    S: RecordingSource + ?Sized,
{
    let header_text = source.fetch_text(reference, reference.header_name())?;
    let header = parse_header(&header_text)?;

    let data_file = header
        .data_file
        .clone()
        .unwrap_or_else(|| reference.sibling("eeg"));
    let bytes = source.fetch_bytes(reference, &data_file)?;
    let data = decode_samples(&bytes, &header)?;

    let marker_file = header
        .marker_file
        .clone()
        .unwrap_or_else(|| reference.sibling("vmrk"));
    let markers = match source.fetch_text(reference, &marker_file) {
        Ok(text) => parse_markers(&text),
        Err(e) => {
            log::warn!("no markers for {reference}: {e}");
            Vec::new()
        }
    };

    let recording = Recording::new(header.channel_names(), header.sample_rate_hz(), data, markers)?;
    log::info!(
        "loaded {reference}: {} channels, {} samples @ {:.1} Hz, {} markers",
        recording.channels().len(),
        recording.sample_count(),
        recording.sample_rate_hz(),
        recording.markers().len()
    );
    Ok(recording)
}

/// Uploads stored as plain files in one directory.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    // Only the final path component is honoured so header fields cannot
    // point outside the uploads directory.
    fn resolve(&self, file: &str) -> Result<PathBuf, LoadError> {
        Path::new(file)
            .file_name()
            .map(|name| self.root.join(name))
            .ok_or_else(|| LoadError::NotFound(file.to_owned()))
    }
}

impl RecordingSource for DirectorySource {
    fn latest_reference(&self) -> Result<RecordingRef, LoadError> {
        let entries =
            fs::read_dir(&self.root).map_err(|e| LoadError::from_io(self.root.clone(), e))?;
        let mut latest: Option<(SystemTime, String)> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_header = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("vhdr"))
                .unwrap_or(false);
            if !is_header {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            let name = entry.file_name().to_string_lossy().into_owned();
            let newer = match &latest {
                None => true,
                Some((t, n)) => (modified, &name) > (*t, n),
            };
            if newer {
                latest = Some((modified, name));
            }
        }
        latest
            .map(|(_, name)| RecordingRef::new(name))
            .ok_or_else(|| {
                LoadError::NotFound(format!("no .vhdr upload in {}", self.root.display()))
            })
    }

    fn fetch_bytes(&self, _reference: &RecordingRef, file: &str) -> Result<Vec<u8>, LoadError> {
        let path = self.resolve(file)?;
        fs::read(&path).map_err(|e| LoadError::from_io(path, e))
    }
}

/// In-memory uploads, newest header last.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
    headers: Vec<String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) {
        let name = name.into();
        if name.to_ascii_lowercase().ends_with(".vhdr") {
            self.headers.retain(|h| h != &name);
            self.headers.push(name.clone());
        }
        self.files.insert(name, contents.into());
    }

    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(name, contents);
        self
    }
}

impl RecordingSource for MemorySource {
    fn latest_reference(&self) -> Result<RecordingRef, LoadError> {
        self.headers
            .last()
            .map(|h| RecordingRef::new(h.clone()))
            .ok_or_else(|| LoadError::NotFound("no uploaded recording".into()))
    }

    fn fetch_bytes(&self, _reference: &RecordingRef, file: &str) -> Result<Vec<u8>, LoadError> {
        self.files
            .get(file)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(file.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::brainvision::tests::{multiplexed_bytes, HEADER, MARKERS};

    fn upload() -> MemorySource {
        let frames: Vec<[i16; 3]> = (0..500).map(|i| [i as i16, 0, -(i as i16)]).collect();
        MemorySource::new()
            .with_file("rest.vhdr", HEADER)
            .with_file("rest.eeg", multiplexed_bytes(&frames))
            .with_file("rest.vmrk", MARKERS)
    }

    #[test]
    fn loads_latest_upload() {
        let rec = load_recording(&upload(), &RecordingSpec::Latest).unwrap();
        assert_eq!(rec.channels(), ["Fp1", "Fp2", "Cz"]);
        assert_eq!(rec.sample_count(), 500);
        assert!((rec.duration_seconds() - 2.0).abs() < 1e-9);
        assert_eq!(rec.markers().len(), 2);
        let fp1 = rec.window("Fp1", 1.0, 1.0 + 1e-9);
        assert!((fp1[0].value - 25.0).abs() < 1e-4);
    }

    #[test]
    fn missing_marker_file_is_tolerated() {
        let mut source = upload();
        source.files.remove("rest.vmrk");
        let rec = load_recording(&source, &RecordingSpec::Upload(RecordingRef::new("rest.vhdr")))
            .unwrap();
        assert!(rec.markers().is_empty());
    }

    #[test]
    fn missing_files_are_not_found() {
        let empty = MemorySource::new();
        assert!(matches!(
            load_recording(&empty, &RecordingSpec::Latest),
            Err(LoadError::NotFound(_))
        ));
        let header_only = MemorySource::new().with_file("rest.vhdr", HEADER);
        assert!(matches!(
            load_recording(&header_only, &RecordingSpec::Latest),
            Err(LoadError::NotFound(_))
        ));
        assert!(matches!(
            load_recording(&upload(), &RecordingSpec::Upload(RecordingRef::new("other.vhdr"))),
            Err(LoadError::NotFound(_))
        ));
    }

    #[test]
    fn latest_is_last_inserted_header() {
        let source = upload().with_file("second.vhdr", HEADER);
        assert_eq!(source.latest_reference().unwrap().header_name(), "second.vhdr");
    }

    #[test]
    fn directory_source_reads_newest_header() {
        let dir = tempfile::tempdir().unwrap();
        let frames: Vec<[i16; 3]> = (0..250).map(|_| [1, 2, 3]).collect();
        fs::write(dir.path().join("rest.vhdr"), HEADER).unwrap();
        fs::write(dir.path().join("rest.eeg"), multiplexed_bytes(&frames)).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(source.latest_reference().unwrap().header_name(), "rest.vhdr");
        let rec = load_recording(&source, &RecordingSpec::Latest).unwrap();
        assert_eq!(rec.sample_count(), 250);
        assert!(rec.markers().is_empty());
    }

    #[test]
    fn directory_source_without_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path());
        assert!(matches!(source.latest_reference(), Err(LoadError::NotFound(_))));
        let gone = DirectorySource::new(dir.path().join("missing"));
        assert!(matches!(gone.latest_reference(), Err(LoadError::NotFound(_))));
    }

    #[test]
    fn sibling_swaps_extension() {
        assert_eq!(RecordingRef::new("sub-1_eeg.vhdr").sibling("vmrk"), "sub-1_eeg.vmrk");
    }
}
