// src/loader.rs
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ViewerConfig;
use crate::session::ViewerSession;
use crate::store::{load_recording, LoadError, Recording, RecordingSource, RecordingSpec};

/// Hands out request generations; only the newest one is current.
#[derive(Debug, Default)]
pub struct LoadTracker {
    latest: u64,
}

impl LoadTracker {
    pub fn begin(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.latest
    }
}

/// Worker thread -> loader
struct LoadOutcome {
    generation: u64,
    spec: RecordingSpec,
    result: Result<Recording, LoadError>,
}

/// Runs recording loads off the UI thread. A newer request supersedes older
/// ones: their results are dropped when they arrive.
pub struct RecordingLoader {
    source: Arc<dyn RecordingSource>,
    tracker: LoadTracker,
    tx: Sender<LoadOutcome>,
    rx: Receiver<LoadOutcome>,
    pending: bool,
    discarded: usize,
}

impl RecordingLoader {
    pub fn new(source: Arc<dyn RecordingSource>) -> Self {
        let (tx, rx) = channel();
        Self {
            source,
            tracker: LoadTracker::default(),
            tx,
            rx,
            pending: false,
            discarded: 0,
        }
    }

    pub fn request(&mut self, spec: RecordingSpec) -> u64 {
        let generation = self.tracker.begin();
        self.pending = true;
        log::info!("loading {spec} (request #{generation})");
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                load_recording(source.as_ref(), &spec)
            }))
            .unwrap_or_else(|payload| Err(LoadError::Aborted(panic_message(payload.as_ref()))));
            // The loader may be gone; nothing to report to then.
            tx.send(LoadOutcome {
                generation,
                spec,
                result,
            })
            .ok();
        });
        generation
    }

    pub fn is_loading(&self) -> bool {
        self.pending
    }

    /// Number of superseded results dropped so far.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Drains finished loads without blocking and returns the current one,
    /// if it has arrived.
    pub fn poll(&mut self) -> Option<Result<Recording, LoadError>> {
        let mut latest = None;
        while let Ok(outcome) = self.rx.try_recv() {
            if let Some(result) = self.accept(outcome) {
                latest = Some(result);
            }
        }
        latest
    }

    /// Blocks until the current request finishes or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Option<Result<Recording, LoadError>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(outcome) => {
                    if let Some(result) = self.accept(outcome) {
                        return Some(result);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None
                }
            }
        }
    }

    fn accept(&mut self, outcome: LoadOutcome) -> Option<Result<Recording, LoadError>> {
        if !self.tracker.is_current(outcome.generation) {
            log::warn!(
                "discarding stale load of {} (request #{})",
                outcome.spec,
                outcome.generation
            );
            self.discarded += 1;
            return None;
        }
        self.pending = false;
        match &outcome.result {
            Ok(_) => log::info!("load of {} finished", outcome.spec),
            Err(e) => log::warn!("load of {} failed: {e}", outcome.spec),
        }
        Some(outcome.result)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "worker panicked".to_owned())
}

/// What the viewer area shows.
pub enum DisplayState {
    Idle,
    Loading,
    Failed(String),
    Ready(ViewerSession),
}

impl DisplayState {
    pub fn session(&self) -> Option<&ViewerSession> {
        match self {
            DisplayState::Ready(session) => Some(session),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut ViewerSession> {
        match self {
            DisplayState::Ready(session) => Some(session),
            _ => None,
        }
    }

    /// Folds a finished load into the display. A failure leaves the viewer
    /// empty with the error message.
    pub fn on_loaded(&mut self, result: Result<Recording, LoadError>, config: &ViewerConfig) {
        match result {
            Ok(recording) => {
                let recording = Arc::new(recording);
                match self {
                    DisplayState::Ready(session) => session.replace_recording(recording),
                    _ => *self = DisplayState::Ready(ViewerSession::new(recording, config)),
                }
            }
            Err(e) => *self = DisplayState::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemorySource, RecordingRef, SyntheticSpec};
    use std::sync::Mutex;

    /// Holds back fetches of `slow.vhdr` until released.
    struct GatedSource {
        inner: MemorySource,
        gate: Mutex<Receiver<()>>,
    }

    impl RecordingSource for GatedSource {
        fn latest_reference(&self) -> Result<RecordingRef, LoadError> {
            self.inner.latest_reference()
        }

        fn fetch_bytes(&self, reference: &RecordingRef, file: &str) -> Result<Vec<u8>, LoadError> {
            if file == "slow.vhdr" {
                if let Ok(gate) = self.gate.lock() {
                    gate.recv().ok();
                }
            }
            self.inner.fetch_bytes(reference, file)
        }
    }

    struct PanickingSource;

    impl RecordingSource for PanickingSource {
        fn latest_reference(&self) -> Result<RecordingRef, LoadError> {
            panic!("source exploded");
        }

        fn fetch_bytes(&self, _: &RecordingRef, _: &str) -> Result<Vec<u8>, LoadError> {
            panic!("source exploded");
        }
    }

    fn synthetic(seconds: f64) -> RecordingSpec {
        RecordingSpec::Synthetic(SyntheticSpec {
            duration_secs: seconds,
            ..SyntheticSpec::default()
        })
    }

    #[test]
    fn tracker_only_accepts_newest() {
        let mut tracker = LoadTracker::default();
        let first = tracker.begin();
        let second = tracker.begin();
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }

    #[test]
    fn loads_in_background() {
        let mut loader = RecordingLoader::new(Arc::new(MemorySource::new()));
        loader.request(synthetic(3.0));
        assert!(loader.is_loading());
        let rec = loader.wait(Duration::from_secs(10)).unwrap().unwrap();
        assert_eq!(rec.duration_seconds(), 3.0);
        assert!(!loader.is_loading());
    }

    #[test]
    fn newer_request_supersedes_in_flight_one() {
        let (release, gate) = channel();
        let source = GatedSource {
            inner: MemorySource::new().with_file("slow.vhdr", "[Common Infos]\n"),
            gate: Mutex::new(gate),
        };
        let mut loader = RecordingLoader::new(Arc::new(source));
        loader.request(RecordingSpec::Upload(RecordingRef::new("slow.vhdr")));
        loader.request(synthetic(2.0));

        let rec = loader.wait(Duration::from_secs(10)).unwrap().unwrap();
        assert_eq!(rec.duration_seconds(), 2.0);

        release.send(()).unwrap();
        assert!(loader.wait(Duration::from_millis(500)).is_none());
        assert_eq!(loader.discarded(), 1);
        assert!(loader.poll().is_none());
    }

    #[test]
    fn failures_surface_as_messages() {
        let mut loader = RecordingLoader::new(Arc::new(MemorySource::new()));
        loader.request(RecordingSpec::Latest);
        let result = loader.wait(Duration::from_secs(10)).unwrap();
        let mut display = DisplayState::Loading;
        display.on_loaded(result, &ViewerConfig::default());
        match display {
            DisplayState::Failed(msg) => assert!(msg.contains("not found"), "{msg}"),
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn ready_display_replaces_recording() {
        let config = ViewerConfig::default();
        let mut display = DisplayState::Idle;
        let first = crate::store::synthetic::generate(&SyntheticSpec::default()).unwrap();
        display.on_loaded(Ok(first), &config);
        display
            .session_mut()
            .unwrap()
            .apply(&crate::types::ViewerEvent::Pan(crate::types::PanDirection::Later, 30.0));

        let second = Recording::from_channels(vec![("Cz".into(), vec![0.0; 100])], 10.0).unwrap();
        display.on_loaded(Ok(second), &config);
        let session = display.session().unwrap();
        assert_eq!(session.state().selected_channel, "Cz");
        assert_eq!(session.state().window_start, 0.0);
    }

    #[test]
    fn oversized_header_fails_instead_of_hanging() {
        let source = MemorySource::new().with_file(
            "big.vhdr",
            "[Common Infos]\nNumberOfChannels=18446744073709551615\n",
        );
        let mut loader = RecordingLoader::new(Arc::new(source));
        loader.request(RecordingSpec::Upload(RecordingRef::new("big.vhdr")));
        let result = loader.wait(Duration::from_secs(10));
        assert!(matches!(result, Some(Err(LoadError::Malformed(_)))));
        assert!(!loader.is_loading());
    }

    #[test]
    fn worker_panic_is_reported() {
        let mut loader = RecordingLoader::new(Arc::new(PanickingSource));
        loader.request(RecordingSpec::Latest);
        match loader.wait(Duration::from_secs(10)) {
            Some(Err(LoadError::Aborted(msg))) => assert!(msg.contains("source exploded"), "{msg}"),
            _ => panic!("expected an aborted load"),
        }
        assert!(!loader.is_loading());

        let mut display = DisplayState::Loading;
        loader.request(RecordingSpec::Latest);
        let result = loader.wait(Duration::from_secs(10)).unwrap();
        display.on_loaded(result, &ViewerConfig::default());
        assert!(matches!(display, DisplayState::Failed(_)));
    }
}
