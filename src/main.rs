// src/main.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use eframe::egui;

use eeg_viewport::config::ViewerConfig;
use eeg_viewport::gui::ViewerApp;
use eeg_viewport::loader::RecordingLoader;
use eeg_viewport::persist::{JsonFileStore, KeyValueStore, MemoryStore, PredictionCache};
use eeg_viewport::render::{PlotStyle, PngRenderer};
use eeg_viewport::session::ViewerSession;
use eeg_viewport::store::{DirectorySource, RecordingRef, RecordingSpec, SyntheticSpec};
use eeg_viewport::types::{PredictionResult, ViewerEvent};
use eeg_viewport::viewport::seconds_to_index;

const LOAD_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Parser, Debug)]
#[command(name = "eeg-viewer")]
#[command(about = "Browse BrainVision EEG recordings through a movable time window", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding uploaded .vhdr/.vmrk/.eeg files
    #[arg(long)]
    uploads: Option<PathBuf>,

    /// Header file name inside the uploads directory (default: newest upload)
    #[arg(long, conflicts_with = "synthetic")]
    recording: Option<String>,

    /// Show generated sine/cosine data instead of an upload
    #[arg(long)]
    synthetic: bool,

    /// Prediction service response (JSON) to cache and display
    #[arg(long)]
    prediction: Option<PathBuf>,

    /// Render one frame to this PNG and exit instead of opening a window
    #[arg(long)]
    export_png: Option<PathBuf>,

    /// Channel to export (default: first channel)
    #[arg(long, requires = "export_png")]
    channel: Option<String>,

    /// Window start in seconds for the export
    #[arg(long, requires = "export_png")]
    start: Option<f64>,

    /// Use a fixed amplitude axis for the export
    #[arg(long, requires = "export_png")]
    fixed_scale: bool,
}

impl Cli {
    fn recording_spec(&self) -> RecordingSpec {
        if self.synthetic {
            RecordingSpec::Synthetic(SyntheticSpec::default())
        } else if let Some(name) = &self.recording {
            RecordingSpec::Upload(RecordingRef::new(name.clone()))
        } else {
            RecordingSpec::Latest
        }
    }
}

fn load_config(cli: &Cli) -> Result<ViewerConfig> {
    let mut config = match &cli.config {
        Some(path) => ViewerConfig::from_file(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(dir) = &cli.uploads {
        config.uploads_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

fn open_cache(path: &Path) -> PredictionCache<Box<dyn KeyValueStore>> {
    match JsonFileStore::open(path) {
        Ok(store) => PredictionCache::new(Box::new(store)),
        Err(e) => {
            log::warn!("prediction cache unavailable, keeping it in memory: {e}");
            PredictionCache::new(Box::new(MemoryStore::new()))
        }
    }
}

fn import_prediction(cache: &mut PredictionCache<Box<dyn KeyValueStore>>, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading prediction {}", path.display()))?;
    let result: PredictionResult = serde_json::from_str(&text)
        .with_context(|| format!("parsing prediction {}", path.display()))?;
    log::info!("prediction: {result}");
    cache.save(&result).context("caching prediction")?;
    Ok(())
}

fn export_png(cli: &Cli, config: &ViewerConfig, source: Arc<DirectorySource>, out: &Path) -> Result<()> {
    let spec = cli.recording_spec();
    let mut loader = RecordingLoader::new(source);
    loader.request(spec.clone());
    let recording = loader
        .wait(LOAD_TIMEOUT)
        .ok_or_else(|| anyhow!("timed out loading {spec}"))?
        .with_context(|| format!("loading {spec}"))?;

    let mut session = ViewerSession::new(Arc::new(recording), config);
    if let Some(channel) = &cli.channel {
        if !session.recording().has_channel(channel) {
            return Err(anyhow!(
                "unknown channel {channel}; available: {}",
                session.recording().channels().join(", ")
            ));
        }
        session.apply(&ViewerEvent::SelectChannel(channel.clone()));
    }
    if let Some(start) = cli.start {
        let rate = session.recording().sample_rate_hz();
        let width = session.state().width();
        session.apply(&ViewerEvent::Brush {
            start_index: seconds_to_index(start, rate),
            end_index: seconds_to_index(start + width, rate),
        });
    }
    if cli.fixed_scale {
        session.apply(&ViewerEvent::ToggleAutoScale);
    }

    let mut renderer = PngRenderer::new(PlotStyle::default());
    session.present(&mut renderer).context("rendering frame")?;
    renderer
        .save(out)
        .with_context(|| format!("writing {}", out.display()))?;
    let state = session.state();
    println!(
        "wrote {} ({} {:.2}s - {:.2}s)",
        out.display(),
        state.selected_channel,
        state.window_start,
        state.window_end
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let source = Arc::new(DirectorySource::new(config.uploads_dir.clone()));

    let mut cache = open_cache(&config.cache_path);
    if let Some(path) = &cli.prediction {
        import_prediction(&mut cache, path)?;
    }

    if let Some(out) = &cli.export_png {
        return export_png(&cli, &config, source, out);
    }

    let initial = cli.recording_spec();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title("EEG Viewer"),
        ..Default::default()
    };
    eframe::run_native(
        "eeg-viewer",
        options,
        Box::new(move |_cc| Box::new(ViewerApp::new(config, source, initial, cache))),
    )
    .map_err(|e| anyhow!("viewer window failed: {e}"))
}
