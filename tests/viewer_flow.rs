// tests/viewer_flow.rs
use std::fs;
use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};

use eeg_viewport::config::{AxisMode, ViewerConfig};
use eeg_viewport::render::{PlotStyle, PngRenderer};
use eeg_viewport::session::ViewerSession;
use eeg_viewport::store::{
    load_recording, DirectorySource, LoadError, Recording, RecordingRef, RecordingSpec,
    SyntheticSpec,
};
use eeg_viewport::types::{PanDirection, ViewerEvent};

const EPS: f64 = 1e-9;

fn synthetic(duration_secs: f64) -> Recording {
    load_recording(
        &DirectorySource::new("unused"),
        &RecordingSpec::Synthetic(SyntheticSpec {
            duration_secs,
            sample_rate_hz: 256.0,
            ..SyntheticSpec::default()
        }),
    )
    .unwrap()
}

fn session(duration_secs: f64) -> ViewerSession {
    ViewerSession::new(Arc::new(synthetic(duration_secs)), &ViewerConfig::default())
}

fn window(s: &ViewerSession) -> (f64, f64) {
    (s.state().window_start, s.state().window_end)
}

#[test]
fn default_window_on_load() {
    let s = session(120.0);
    assert_eq!(window(&s), (0.0, 10.0));
    assert_eq!(s.state().selected_channel, "FP1");
    assert!(s.state().auto_scale);
    assert_eq!(s.frame().axis_mode, AxisMode::Auto);
}

#[test]
fn window_invariant_holds_under_random_gestures() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut s = session(120.0);
    let total = s.recording().sample_count();
    for _ in 0..5_000 {
        let event = match rng.gen_range(0..4) {
            0 => ViewerEvent::Pan(PanDirection::Earlier, rng.gen_range(-5.0..200.0)),
            1 => ViewerEvent::Pan(PanDirection::Later, rng.gen_range(-5.0..200.0)),
            2 => ViewerEvent::Brush {
                start_index: rng.gen_range(0..total + 1000),
                end_index: rng.gen_range(0..total + 1000),
            },
            _ => ViewerEvent::ToggleAutoScale,
        };
        s.apply(&event);
        let (start, end) = window(&s);
        assert!(start >= 0.0, "{event:?} -> {start}");
        assert!(start < end, "{event:?} -> [{start}, {end}]");
        assert!(end <= 120.0 + EPS, "{event:?} -> {end}");
        assert!(end - start >= 1.0 - EPS, "{event:?} -> [{start}, {end}]");
    }
}

#[test]
fn panning_earlier_stops_at_zero() {
    let mut s = session(120.0);
    s.apply(&ViewerEvent::Brush {
        start_index: 256 * 60,
        end_index: 256 * 70,
    });
    for _ in 0..50 {
        s.apply(&ViewerEvent::Pan(PanDirection::Earlier, 5.0));
    }
    assert_eq!(s.state().window_start, 0.0);
    let before = window(&s);
    s.apply(&ViewerEvent::Pan(PanDirection::Earlier, 5.0));
    assert_eq!(window(&s), before);
}

#[test]
fn inverted_brush_and_unknown_channel_are_ignored() {
    let mut s = session(120.0);
    s.apply(&ViewerEvent::Pan(PanDirection::Later, 5.0));
    let before = s.state().clone();
    s.apply(&ViewerEvent::Brush {
        start_index: 100,
        end_index: 50,
    });
    assert_eq!(*s.state(), before);
    s.apply(&ViewerEvent::SelectChannel("ZZZ".into()));
    assert_eq!(*s.state(), before);
}

#[test]
fn double_toggle_restores_auto_scale() {
    let mut s = session(120.0);
    s.apply(&ViewerEvent::SelectChannel("O2".into()));
    let before = s.state().clone();
    s.apply(&ViewerEvent::ToggleAutoScale);
    assert_eq!(s.frame().axis_mode, AxisMode::fixed_symmetric(10.0));
    s.apply(&ViewerEvent::ToggleAutoScale);
    assert_eq!(*s.state(), before);
    assert_eq!(s.frame().axis_mode, AxisMode::Auto);
}

#[test]
fn window_queries_clamp() {
    let rec = synthetic(120.0);
    assert!(rec.window("FP1", 5.0, 5.0).is_empty());
    let all = rec.window("FP1", -1.0, 1000.0);
    assert_eq!(all.len(), rec.sample_count());
    assert_eq!(all[0].time, 0.0);
    assert!(all.windows(2).all(|w| w[0].time < w[1].time));
    assert!(rec.window("nope", 0.0, 10.0).is_empty());
}

fn write_float_upload(dir: &std::path::Path) {
    let header = "Brain Vision Data Exchange Header File Version 1.0\r
[Common Infos]\r
DataFile=sub-01.eeg\r
MarkerFile=sub-01.vmrk\r
DataFormat=BINARY\r
DataOrientation=VECTORIZED\r
NumberOfChannels=2\r
; Sampling interval in microseconds\r
SamplingInterval=2000\r
\r
[Binary Infos]\r
BinaryFormat=IEEE_FLOAT_32\r
\r
[Channel Infos]\r
Ch1=Oz,,,µV\r
Ch2=Pz,,0.5,µV\r
";
    let markers = "Brain Vision Data Exchange Marker File, Version 1.0\r
[Marker Infos]\r
Mk1=Stimulus,S  2,501,1,0\r
Mk2=Comment,blink,751,1,2\r
";
    let samples = 1000;
    let mut bytes = Vec::new();
    for ch in 0..2 {
        for i in 0..samples {
            let v = if ch == 0 { i as f32 } else { -(i as f32) };
            bytes.extend_from_slice(&v.to_le_bytes());
        }
    }
    fs::write(dir.join("sub-01.vhdr"), header).unwrap();
    fs::write(dir.join("sub-01.vmrk"), markers).unwrap();
    fs::write(dir.join("sub-01.eeg"), bytes).unwrap();
}

#[test]
fn loads_vectorized_float_upload_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_float_upload(dir.path());
    let source = DirectorySource::new(dir.path());

    let rec = load_recording(&source, &RecordingSpec::Latest).unwrap();
    assert_eq!(rec.channels(), ["Oz", "Pz"]);
    assert!((rec.sample_rate_hz() - 500.0).abs() < 1e-9);
    assert!((rec.duration_seconds() - 2.0).abs() < 1e-9);
    let pz = rec.window("Pz", 1.0, 1.0 + 1e-9);
    assert!((pz[0].value + 250.0).abs() < 1e-3);

    let mut s = ViewerSession::new(Arc::new(rec), &ViewerConfig::default());
    assert_eq!(window(&s), (0.0, 2.0));
    assert_eq!(s.frame().markers.len(), 1);
    s.apply(&ViewerEvent::SelectChannel("Pz".into()));
    assert_eq!(s.frame().markers.len(), 2);
}

#[test]
fn missing_and_truncated_uploads_fail_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let source = DirectorySource::new(dir.path());
    assert!(matches!(
        load_recording(&source, &RecordingSpec::Latest),
        Err(LoadError::NotFound(_))
    ));

    write_float_upload(dir.path());
    let eeg = dir.path().join("sub-01.eeg");
    let mut bytes = fs::read(&eeg).unwrap();
    bytes.truncate(bytes.len() - 3);
    fs::write(&eeg, bytes).unwrap();
    let spec = RecordingSpec::Upload(RecordingRef::new("sub-01.vhdr"));
    assert!(matches!(
        load_recording(&source, &spec),
        Err(LoadError::Malformed(_))
    ));
}

#[test]
fn exports_current_frame_as_png() {
    let mut s = session(30.0);
    s.apply(&ViewerEvent::Pan(PanDirection::Later, 12.5));
    let mut renderer = PngRenderer::new(PlotStyle {
        labels: false,
        ..PlotStyle::default()
    });
    assert_eq!(s.present(&mut renderer).unwrap(), 0);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("plot.png");
    renderer.save(&out).unwrap();
    let written = fs::read(&out).unwrap();
    assert!(written.starts_with(&[0x89, b'P', b'N', b'G']));
}
