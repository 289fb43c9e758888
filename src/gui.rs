// src/gui.rs
use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use egui::{Color32, RichText};
use egui_plot::{Line, Plot, PlotBounds, PlotPoints, Polygon, VLine};

use crate::config::ViewerConfig;
use crate::loader::{DisplayState, RecordingLoader};
use crate::persist::{KeyValueStore, PredictionCache};
use crate::render::{RenderError, RenderFrame, Renderer};
use crate::store::{RecordingSource, RecordingSpec, SyntheticSpec};
use crate::types::{PanDirection, ViewerEvent};

const TRACE: Color32 = Color32::from_rgb(0, 255, 255);
const MARKER: Color32 = Color32::from_rgb(255, 210, 60);
const THUMB: Color32 = Color32::from_rgb(90, 140, 255);

/// In-progress gesture on the minimap, in sample positions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum BrushDrag {
    #[default]
    Idle,
    /// Sweeping out a new range from `anchor`.
    Selecting { anchor: f64 },
    /// Sliding the existing thumb, grabbed at `grab`.
    Moving { grab: f64, thumb: (usize, usize) },
}

impl BrushDrag {
    pub fn begin(pointer: f64, thumb: (usize, usize)) -> Self {
        if pointer >= thumb.0 as f64 && pointer <= thumb.1 as f64 {
            BrushDrag::Moving {
                grab: pointer,
                thumb,
            }
        } else {
            BrushDrag::Selecting { anchor: pointer }
        }
    }

    /// Brush event for a release at `pointer`; `None` when nothing was dragged.
    pub fn finish(self, pointer: f64, total: usize) -> Option<ViewerEvent> {
        let clamp = |x: f64| x.round().clamp(0.0, total as f64) as usize;
        match self {
            BrushDrag::Idle => None,
            BrushDrag::Selecting { anchor } => {
                let (a, b) = (clamp(anchor), clamp(pointer));
                Some(ViewerEvent::Brush {
                    start_index: a.min(b),
                    end_index: a.max(b),
                })
            }
            BrushDrag::Moving { grab, thumb } => {
                let width = thumb.1 - thumb.0;
                let max_start = total.saturating_sub(width) as f64;
                let start = (thumb.0 as f64 + pointer - grab).round().clamp(0.0, max_start) as usize;
                if start == thumb.0 {
                    return None;
                }
                Some(ViewerEvent::Brush {
                    start_index: start,
                    end_index: start + width,
                })
            }
        }
    }
}

/// Draws a frame into an egui `Ui` and turns clicks and drags into events.
pub struct EguiRenderer<'a> {
    ui: &'a mut egui::Ui,
    drag: &'a mut BrushDrag,
    pan_step: f64,
}

impl<'a> EguiRenderer<'a> {
    pub fn new(ui: &'a mut egui::Ui, drag: &'a mut BrushDrag, pan_step: f64) -> Self {
        Self { ui, drag, pan_step }
    }

    fn controls(&mut self, frame: &RenderFrame, events: &mut Vec<ViewerEvent>) {
        let step = self.pan_step;
        self.ui.horizontal(|ui| {
            if ui.button(format!("◀ {step:.0}s")).clicked() {
                events.push(ViewerEvent::Pan(PanDirection::Earlier, step));
            }
            if ui.button(format!("{step:.0}s ▶")).clicked() {
                events.push(ViewerEvent::Pan(PanDirection::Later, step));
            }
            ui.separator();
            egui::ComboBox::from_label("Channel")
                .selected_text(frame.channel.as_str())
                .show_ui(ui, |ui| {
                    for name in &frame.channels {
                        if ui.selectable_label(*name == frame.channel, name.as_str()).clicked()
                            && *name != frame.channel
                        {
                            events.push(ViewerEvent::SelectChannel(name.clone()));
                        }
                    }
                });
            let mut auto = frame.axis_mode.is_auto();
            if ui.checkbox(&mut auto, "Auto scale").changed() {
                events.push(ViewerEvent::ToggleAutoScale);
            }
        });
        let (start, end) = frame.window;
        self.ui.label(
            RichText::new(format!(
                "{}  {start:.2}s – {end:.2}s of {:.1}s  ({} samples)",
                frame.channel,
                frame.duration_seconds(),
                frame.samples.len()
            ))
            .monospace(),
        );
    }

    fn waveform(&mut self, frame: &RenderFrame) {
        let (start, end) = frame.window;
        let (y_min, y_max) = frame.y_range;
        let points = PlotPoints::from_iter(frame.samples.iter().map(|s| [s.time, s.value as f64]));
        let markers: Vec<(f64, String)> = frame
            .markers
            .iter()
            .map(|m| (m.position as f64 / frame.sample_rate_hz, m.description.clone()))
            .collect();
        Plot::new("waveform")
            .height((self.ui.available_height() - 90.0).max(160.0))
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .allow_double_click_reset(false)
            .x_axis_label("Time (s)")
            .y_axis_label("µV")
            .show(self.ui, |plot_ui| {
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                    [start, y_min as f64],
                    [end, y_max as f64],
                ));
                plot_ui.line(Line::new(points).color(TRACE).name(&frame.channel));
                for (t, label) in markers {
                    plot_ui.vline(VLine::new(t).color(MARKER).name(label));
                }
            });
    }

    fn minimap(&mut self, frame: &RenderFrame, events: &mut Vec<ViewerEvent>) {
        let total = frame.brush.total_samples;
        let thumb = (frame.brush.start_index, frame.brush.end_index);
        let preview = match *self.drag {
            BrushDrag::Selecting { anchor } => Some(anchor),
            _ => None,
        };
        let rect = |x0: f64, x1: f64| PlotPoints::new(vec![[x0, 0.0], [x1, 0.0], [x1, 1.0], [x0, 1.0]]);
        let response = Plot::new("brush")
            .height(56.0)
            .show_axes([false, false])
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .allow_double_click_reset(false)
            .show(self.ui, |plot_ui| {
                plot_ui.set_plot_bounds(PlotBounds::from_min_max([0.0, 0.0], [total as f64, 1.0]));
                plot_ui.polygon(
                    Polygon::new(rect(thumb.0 as f64, thumb.1 as f64))
                        .fill_color(THUMB.gamma_multiply(0.6))
                        .stroke(egui::Stroke::new(1.0, THUMB)),
                );
                let pointer = plot_ui.pointer_coordinate().map(|p| p.x);
                if let (Some(anchor), Some(x)) = (preview, pointer) {
                    plot_ui.polygon(
                        Polygon::new(rect(anchor.min(x), anchor.max(x)))
                            .fill_color(Color32::WHITE.gamma_multiply(0.2)),
                    );
                }
                pointer
            });

        let pointer = response.inner;
        let resp = response.response;
        if resp.drag_started() {
            if let Some(x) = pointer {
                *self.drag = BrushDrag::begin(x, thumb);
            }
        }
        if resp.drag_released() {
            let drag = std::mem::take(self.drag);
            if let Some(event) = pointer.and_then(|x| drag.finish(x, total)) {
                events.push(event);
            }
        } else if resp.clicked() {
            // A click re-centres the thumb on the pointer.
            if let Some(x) = pointer {
                let width = thumb.1 - thumb.0;
                let start = (x - width as f64 / 2.0)
                    .round()
                    .clamp(0.0, total.saturating_sub(width) as f64) as usize;
                events.push(ViewerEvent::Brush {
                    start_index: start,
                    end_index: start + width,
                });
            }
        }
        if *self.drag != BrushDrag::Idle {
            self.ui.ctx().request_repaint();
        }
    }
}

impl Renderer for EguiRenderer<'_> {
    fn draw(&mut self, frame: &RenderFrame) -> Result<Vec<ViewerEvent>, RenderError> {
        let mut events = Vec::new();
        self.controls(frame, &mut events);
        self.waveform(frame);
        self.minimap(frame, &mut events);
        Ok(events)
    }
}

pub struct ViewerApp {
    config: ViewerConfig,
    loader: RecordingLoader,
    display: DisplayState,
    current: RecordingSpec,
    drag: BrushDrag,
    cache: PredictionCache<Box<dyn KeyValueStore>>,
    status: Vec<String>,
}

impl ViewerApp {
    pub fn new(
        config: ViewerConfig,
        source: Arc<dyn RecordingSource>,
        initial: RecordingSpec,
        cache: PredictionCache<Box<dyn KeyValueStore>>,
    ) -> Self {
        let mut app = Self {
            config,
            loader: RecordingLoader::new(source),
            display: DisplayState::Idle,
            current: initial.clone(),
            drag: BrushDrag::Idle,
            cache,
            status: vec!["EEG viewer ready.".to_owned()],
        };
        app.request(initial);
        app
    }

    fn log(&mut self, msg: String) {
        self.status.push(format!("> {msg}"));
        if self.status.len() > 8 {
            self.status.remove(0);
        }
    }

    fn request(&mut self, spec: RecordingSpec) {
        self.log(format!("loading {spec}"));
        self.loader.request(spec.clone());
        self.current = spec;
        self.display = DisplayState::Loading;
        self.drag = BrushDrag::Idle;
    }

    fn poll_loader(&mut self) {
        if let Some(result) = self.loader.poll() {
            match &result {
                Ok(rec) => self.log(format!(
                    "{} channels, {:.1}s",
                    rec.channels().len(),
                    rec.duration_seconds()
                )),
                Err(e) => self.log(format!("load failed: {e}")),
            }
            self.display.on_loaded(result, &self.config);
        }
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        ui.add_space(10.0);
        ui.heading("EEG Viewer");
        ui.label(RichText::new(self.current.to_string()).small());
        ui.separator();

        if ui.button("Load latest upload").clicked() {
            self.request(RecordingSpec::Latest);
        }
        if ui.button("Synthetic demo").clicked() {
            self.request(RecordingSpec::Synthetic(SyntheticSpec::default()));
        }
        if ui.button("🔄 Reload").clicked() {
            self.request(self.current.clone());
        }
        if self.loader.is_loading() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading…");
            });
        }

        ui.add_space(20.0);
        ui.separator();
        ui.label("PREDICTION");
        match self.cache.load() {
            Some(result) => {
                ui.label(RichText::new(&result.prediction).heading().color(Color32::LIGHT_BLUE));
                egui::Grid::new("bands").num_columns(2).show(ui, |ui| {
                    for (label, value) in result.bands.rows() {
                        ui.label(label);
                        ui.monospace(format!("{value:.5e} µV²"));
                        ui.end_row();
                    }
                });
                if ui.small_button("Clear").clicked() {
                    if let Err(e) = self.cache.clear() {
                        log::warn!("failed to clear prediction cache: {e}");
                    }
                }
            }
            None => {
                ui.label(RichText::new("No prediction yet").weak());
            }
        }

        ui.add_space(10.0);
        egui::ScrollArea::vertical().max_height(140.0).show(ui, |ui| {
            for m in &self.status {
                ui.monospace(m);
            }
        });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_loader();
        if self.loader.is_loading() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        let mut visuals = egui::Visuals::dark();
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(10, 10, 15);
        ctx.set_visuals(visuals);

        egui::SidePanel::left("controls")
            .min_width(240.0)
            .show(ctx, |ui| self.side_panel(ui));

        egui::CentralPanel::default().show(ctx, |ui| match &mut self.display {
            DisplayState::Idle => {
                ui.label("No recording selected.");
            }
            DisplayState::Loading => {
                ui.centered_and_justified(|ui| {
                    ui.spinner();
                });
            }
            DisplayState::Failed(msg) => {
                ui.label(RichText::new(format!("⚠ {msg}")).color(Color32::RED));
                ui.label("No data");
            }
            DisplayState::Ready(session) => {
                let mut renderer = EguiRenderer::new(ui, &mut self.drag, self.config.pan_step_seconds);
                if let Err(e) = session.present(&mut renderer) {
                    log::error!("render failed: {e}");
                }
            }
        });
    }
}
