// src/app.rs
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use eframe::egui;
use tracing::{debug, info};

use crate::overlay::OverlayRenderer;
use crate::pipeline::FramePipeline;
use crate::tracking::LandmarkSource;
use crate::ui::{EguiDisplay, VideoWidget};
use crate::video::{CaptureError, Frame, FrameSource};

/// Where annotated frames go, and where the quit request comes from.
pub trait DisplaySink {
    fn show(&mut self, frame: &Frame);

    /// Returns `true` once the user asked to quit. Blocks for at most `wait`.
    fn poll_quit(&mut self, wait: Duration) -> bool;

    fn close(&mut self);
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub quit_key: egui::Key,
    /// Upper bound on the quit-key wait; also paces the loop.
    pub poll_interval: Duration,
    pub camera_index: u32,
    /// Log frame statistics every this many frames, 0 disables.
    pub stats_interval: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Hand Gesture Control".to_string(),
            quit_key: egui::Key::Q,
            poll_interval: Duration::from_millis(1),
            camera_index: 0,
            stats_interval: 150,
        }
    }
}

/// Why the capture loop stopped.
#[derive(Debug)]
pub enum LoopExit {
    QuitKey,
    StreamEnded(CaptureError),
    DetectionFailed(anyhow::Error),
}

impl LoopExit {
    pub fn exit_code(&self) -> i32 {
        match self {
            LoopExit::QuitKey | LoopExit::StreamEnded(_) => 0,
            LoopExit::DetectionFailed(_) => 1,
        }
    }
}

impl fmt::Display for LoopExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopExit::QuitKey => write!(f, "quit requested"),
            LoopExit::StreamEnded(e) => write!(f, "camera stream ended: {}", e),
            LoopExit::DetectionFailed(e) => write!(f, "hand detection failed: {:#}", e),
        }
    }
}

#[derive(Debug)]
pub enum Step {
    Continue,
    Exit(LoopExit),
}

/// Rolling averages over the last few shown frames.
#[derive(Clone, Debug)]
pub struct PerformanceMetrics {
    /// Display rate, from the spacing between shown frames.
    pub avg_fps: f32,
    /// Seconds spent reading and annotating one frame.
    pub avg_processing_time: f32,
    processing_times: VecDeque<f32>,
    frame_intervals: VecDeque<f32>,
    last_shown: Option<Instant>,
}

impl PerformanceMetrics {
    const WINDOW: usize = 30;

    pub fn new() -> Self {
        Self {
            avg_fps: 0.0,
            avg_processing_time: 0.0,
            processing_times: VecDeque::with_capacity(Self::WINDOW),
            frame_intervals: VecDeque::with_capacity(Self::WINDOW),
            last_shown: None,
        }
    }

    pub fn record(&mut self, shown_at: Instant, processing: Duration) {
        self.avg_processing_time = push_average(&mut self.processing_times, processing);

        if let Some(previous) = self.last_shown.replace(shown_at) {
            let interval = shown_at.saturating_duration_since(previous);
            let avg_interval = push_average(&mut self.frame_intervals, interval);
            self.avg_fps = if avg_interval > 0.0 {
                1.0 / avg_interval
            } else {
                0.0
            };
        }
    }
}

fn push_average(window: &mut VecDeque<f32>, sample: Duration) -> f32 {
    window.push_front(sample.as_secs_f32());
    if window.len() > PerformanceMetrics::WINDOW {
        window.pop_back();
    }
    window.iter().sum::<f32>() / window.len() as f32
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the camera and drives one frame through the pipeline per step.
pub struct CaptureLoop<C, S, R> {
    camera: C,
    pipeline: FramePipeline<S, R>,
    poll_interval: Duration,
    stats_interval: u64,
    frames_shown: u64,
    metrics: PerformanceMetrics,
}

impl<C, S, R> CaptureLoop<C, S, R>
where
    C: FrameSource,
    S: LandmarkSource,
    R: OverlayRenderer,
{
    pub fn new(camera: C, pipeline: FramePipeline<S, R>, config: &LoopConfig) -> Self {
        Self {
            camera,
            pipeline,
            poll_interval: config.poll_interval,
            stats_interval: config.stats_interval,
            frames_shown: 0,
            metrics: PerformanceMetrics::new(),
        }
    }

    /// Read, annotate, show, then poll for quit.
    pub fn step<D: DisplaySink>(&mut self, display: &mut D) -> Step {
        let started = Instant::now();

        let mut frame = match self.camera.read_frame() {
            Ok(frame) => frame,
            Err(e) => return Step::Exit(LoopExit::StreamEnded(e)),
        };

        if let Err(e) = self.pipeline.process(&mut frame) {
            return Step::Exit(LoopExit::DetectionFailed(anyhow::Error::new(e)));
        }

        display.show(&frame);
        self.frames_shown += 1;
        let shown_at = Instant::now();
        self.metrics.record(shown_at, shown_at - started);

        if self.stats_interval > 0 && self.frames_shown % self.stats_interval == 0 {
            debug!(
                "{} frames, {:.1} fps, {:.1} ms processing/frame",
                self.frames_shown,
                self.metrics.avg_fps,
                self.metrics.avg_processing_time * 1000.0
            );
        }

        if display.poll_quit(self.poll_interval) {
            return Step::Exit(LoopExit::QuitKey);
        }

        Step::Continue
    }

    /// Releases the camera and closes the display. Safe to call more than once.
    pub fn shutdown<D: DisplaySink>(&mut self, display: &mut D) {
        self.camera.release();
        display.close();
    }

    pub fn finish<D: DisplaySink>(&mut self, display: &mut D, reason: LoopExit) -> LoopExit {
        info!(
            "leaving capture loop after {} frames: {}",
            self.frames_shown, reason
        );
        self.shutdown(display);
        reason
    }

    /// Steps until the loop exits, then shuts down.
    #[cfg(test)]
    pub fn run<D: DisplaySink>(&mut self, display: &mut D) -> LoopExit {
        loop {
            if let Step::Exit(reason) = self.step(display) {
                return self.finish(display, reason);
            }
        }
    }
}

/// Window that runs one capture step per repaint.
pub struct GestureApp<C, S, R> {
    capture: CaptureLoop<C, S, R>,
    video: VideoWidget,
    quit_key: egui::Key,
    outcome: Rc<RefCell<Option<LoopExit>>>,
    finished: bool,
}

impl<C, S, R> GestureApp<C, S, R>
where
    C: FrameSource,
    S: LandmarkSource,
    R: OverlayRenderer,
{
    /// `outcome` receives the exit reason once the loop stops.
    pub fn new(
        capture: CaptureLoop<C, S, R>,
        quit_key: egui::Key,
        outcome: Rc<RefCell<Option<LoopExit>>>,
    ) -> Self {
        Self {
            capture,
            video: VideoWidget::new(),
            quit_key,
            outcome,
            finished: false,
        }
    }
}

impl<C, S, R> eframe::App for GestureApp<C, S, R>
where
    C: FrameSource,
    S: LandmarkSource,
    R: OverlayRenderer,
{
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.finished {
            let mut display = EguiDisplay::new(ctx, &mut self.video, self.quit_key);
            if let Step::Exit(reason) = self.capture.step(&mut display) {
                let reason = self.capture.finish(&mut display, reason);
                *self.outcome.borrow_mut() = Some(reason);
                self.finished = true;
            }
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::BLACK))
            .show(ctx, |ui| self.video.show(ui));
    }
}
