pub mod term;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::audio::{AnalysisTap, TAP_SIZE};

/// Drawing surface for the waveform. Styling lives behind this seam.
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn clear(&mut self);
    fn stroke_polyline(&mut self, points: &[(f32, f32)]);
}

/// Waveform renderer: one frame per call. While audio plays it strokes
/// a connected polyline of the tap's current time-domain signal across
/// the full canvas width; idle it draws a single flat center line.
pub struct Visualizer<C: Canvas> {
    canvas: C,
    tap: AnalysisTap,
    data: Vec<u8>,
}

impl<C: Canvas> Visualizer<C> {
    pub fn new(canvas: C, tap: AnalysisTap) -> Self {
        Self {
            canvas,
            tap,
            data: vec![0; TAP_SIZE],
        }
    }

    /// Render the live signal. Each byte maps to a vertical position as
    /// its deviation from the 128 center, at a constant horizontal step
    /// of `width / buffer_len`; the line closes at the center on the
    /// right edge.
    pub fn render_wave(&mut self) {
        self.tap.time_domain(&mut self.data);

        let width = self.canvas.width() as f32;
        let height = self.canvas.height() as f32;
        let step = width / self.data.len() as f32;

        let mut points = Vec::with_capacity(self.data.len() + 1);
        for (i, &byte) in self.data.iter().enumerate() {
            let v = byte as f32 / 128.0;
            points.push((i as f32 * step, v * height / 2.0));
        }
        points.push((width, height / 2.0));

        self.canvas.clear();
        self.canvas.stroke_polyline(&points);
    }

    /// Render the idle frame: one flat line across the vertical center.
    pub fn render_idle(&mut self) {
        let width = self.canvas.width() as f32;
        let mid = self.canvas.height() as f32 / 2.0;
        self.canvas.clear();
        self.canvas.stroke_polyline(&[(0.0, mid), (width, mid)]);
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }
}

/// Cooperatively rescheduled render loop. Each tick redraws the wave
/// and yields until the next refresh; on the first tick where `playing`
/// reports false the idle frame is drawn exactly once and the loop
/// stops rescheduling itself.
pub struct RenderLoop {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RenderLoop {
    pub fn spawn<C, F>(mut visualizer: Visualizer<C>, refresh: Duration, mut playing: F) -> Self
    where
        C: Canvas + Send + 'static,
        F: FnMut() -> bool + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let handle = std::thread::spawn(move || {
            while flag.load(Ordering::SeqCst) && playing() {
                visualizer.render_wave();
                std::thread::sleep(refresh);
            }
            visualizer.render_idle();
        });
        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Cancel the pending reschedule. The running flag clears
    /// synchronously; the loop draws its final idle frame and exits
    /// before this returns.
    pub fn cancel(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}
