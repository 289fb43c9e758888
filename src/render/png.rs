// src/render/png.rs
use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;

use crate::render::{RenderError, RenderFrame, Renderer};
use crate::types::ViewerEvent;

// Height of the brush strip under the waveform.
const BRUSH_HEIGHT: u32 = 48;

#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub trace: RGBColor,
    pub marker: RGBColor,
    pub thumb: RGBColor,
    /// Draw caption and axis labels; needs a system font.
    pub labels: bool,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(10, 10, 10),
            trace: CYAN,
            marker: YELLOW,
            thumb: RGBColor(90, 140, 255),
            labels: true,
        }
    }
}

/// Draws the waveform of the visible window plus the brush strip and
/// returns PNG bytes.
pub fn render_frame_png(frame: &RenderFrame, style: &PlotStyle) -> Result<Vec<u8>, RenderError> {
    if style.height <= BRUSH_HEIGHT || style.width == 0 {
        return Err(RenderError::Plot(format!(
            "image {}x{} too small",
            style.width, style.height
        )));
    }
    let (start, end) = frame.window;
    if !(start < end) {
        return Err(RenderError::Plot(format!("empty window [{start}, {end}]")));
    }
    let (y_min, y_max) = frame.y_range;
    if !(y_min < y_max) {
        return Err(RenderError::Plot(format!("empty y range [{y_min}, {y_max}]")));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let (wave_area, brush_area) = root.split_vertically(style.height - BRUSH_HEIGHT);

        let mut builder = ChartBuilder::on(&wave_area);
        builder.margin(10);
        if style.labels {
            let caption = format!("{}  [{start:.2}s - {end:.2}s]", frame.channel);
            builder
                .caption(caption, ("sans-serif", 20).into_font().color(&WHITE))
                .set_label_area_size(LabelAreaPosition::Left, 55)
                .set_label_area_size(LabelAreaPosition::Bottom, 40);
        }
        let mut chart = builder.build_cartesian_2d(start..end, y_min..y_max)?;
        if style.labels {
            chart
                .configure_mesh()
                .light_line_style(&WHITE.mix(0.1))
                .x_desc("Time (s)")
                .y_desc("Amplitude (µV)")
                .label_style(("sans-serif", 12).into_font().color(&WHITE))
                .axis_desc_style(("sans-serif", 14).into_font().color(&WHITE))
                .draw()?;
        }
        let series = frame
            .samples
            .iter()
            .map(|s| (s.time, s.value.clamp(y_min, y_max)));
        chart.draw_series(LineSeries::new(series, &style.trace))?;
        let marker_color = style.marker.mix(0.7);
        chart.draw_series(frame.markers.iter().map(|m| {
            let t = m.position as f64 / frame.sample_rate_hz;
            PathElement::new(vec![(t, y_min), (t, y_max)], &marker_color)
        }))?;

        let total = frame.brush.total_samples.max(1) as f64;
        let mut strip = ChartBuilder::on(&brush_area)
            .margin_left(if style.labels { 65 } else { 10 })
            .margin_right(10)
            .margin_bottom(8)
            .build_cartesian_2d(0f64..total, 0f64..1f64)?;
        strip.draw_series(std::iter::once(Rectangle::new(
            [(0.0, 0.0), (total, 1.0)],
            WHITE.mix(0.15).filled(),
        )))?;
        strip.draw_series(std::iter::once(Rectangle::new(
            [
                (frame.brush.start_index as f64, 0.0),
                (frame.brush.end_index as f64, 1.0),
            ],
            style.thumb.mix(0.8).filled(),
        )))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| RenderError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

/// Headless renderer keeping the last drawn frame as PNG bytes.
#[derive(Debug, Default)]
pub struct PngRenderer {
    pub style: PlotStyle,
    last: Vec<u8>,
}

impl PngRenderer {
    pub fn new(style: PlotStyle) -> Self {
        Self {
            style,
            last: Vec::new(),
        }
    }

    pub fn last_png(&self) -> &[u8] {
        &self.last
    }

    pub fn save(&self, path: &Path) -> Result<(), RenderError> {
        if self.last.is_empty() {
            return Err(RenderError::Plot("nothing rendered yet".into()));
        }
        std::fs::write(path, &self.last)?;
        Ok(())
    }
}

impl Renderer for PngRenderer {
    fn draw(&mut self, frame: &RenderFrame) -> Result<Vec<ViewerEvent>, RenderError> {
        self.last = render_frame_png(frame, &self.style)?;
        Ok(Vec::new())
    }
}
