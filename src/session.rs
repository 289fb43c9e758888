// src/session.rs
use std::sync::Arc;

use crate::config::ViewerConfig;
use crate::render::{RenderError, RenderFrame, Renderer};
use crate::store::Recording;
use crate::types::ViewerEvent;
use crate::viewport::{ViewportController, ViewportState};

/// One displayed recording and the viewport bound to it.
pub struct ViewerSession {
    recording: Arc<Recording>,
    controller: ViewportController,
}

impl ViewerSession {
    pub fn new(recording: Arc<Recording>, config: &ViewerConfig) -> Self {
        let controller = ViewportController::new(&recording, config);
        Self {
            recording,
            controller,
        }
    }

    pub fn recording(&self) -> &Arc<Recording> {
        &self.recording
    }

    pub fn controller(&self) -> &ViewportController {
        &self.controller
    }

    pub fn state(&self) -> &ViewportState {
        self.controller.state()
    }

    pub fn apply(&mut self, event: &ViewerEvent) {
        self.controller.apply(event);
    }

    /// Swaps in a new recording; the viewport starts over.
    pub fn replace_recording(&mut self, recording: Arc<Recording>) {
        self.controller.on_recording_replaced(&recording);
        self.recording = recording;
    }

    pub fn frame(&self) -> RenderFrame {
        let state = self.controller.state();
        let (start, end) = (state.window_start, state.window_end);
        let samples = self
            .recording
            .window(&state.selected_channel, start, end);
        let axis_mode = self.controller.axis_mode();
        let y_range = axis_mode.y_range(samples.iter().map(|s| s.value));
        let channel_idx = self.recording.channel_index(&state.selected_channel);
        let markers = self
            .recording
            .markers_in(start, end)
            .filter(|m| m.channel.is_none() || m.channel == channel_idx)
            .cloned()
            .collect();
        RenderFrame {
            channel: state.selected_channel.clone(),
            channels: self.recording.channels().to_vec(),
            window: (start, end),
            samples,
            axis_mode,
            y_range,
            brush: self.controller.brush_thumb(),
            sample_rate_hz: self.recording.sample_rate_hz(),
            markers,
        }
    }

    /// Draws the current frame and feeds the renderer's events back into the
    /// controller. Returns how many events were applied.
    pub fn present<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> Result<usize, RenderError> {
        let events = renderer.draw(&self.frame())?;
        for event in &events {
            self.controller.apply(event);
        }
        Ok(events.len())
    }
}
