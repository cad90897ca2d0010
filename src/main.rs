// src/main.rs
mod app;
mod gesture;
mod mediapipe_bridge;
mod overlay;
mod pipeline;
mod tracking;
mod ui;
mod video;

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use eframe::egui;
use tracing::{error, info};

use app::{CaptureLoop, GestureApp, LoopConfig, LoopExit};
use mediapipe_bridge::MediaPipeWrapper;
use overlay::SkeletonRenderer;
use pipeline::FramePipeline;
use tracking::DetectorConfig;
use video::CameraSource;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = LoopConfig::default();

    video::log_available_cameras();
    let camera = CameraSource::open(config.camera_index)
        .with_context(|| format!("camera {} is unavailable", config.camera_index))?;

    let detector = MediaPipeWrapper::new(&DetectorConfig::default())
        .context("hand landmark detector is unavailable")?;

    let pipeline = FramePipeline::new(detector, SkeletonRenderer::default());
    let capture = CaptureLoop::new(camera, pipeline, &config);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 720.0]),
        centered: true,
        ..Default::default()
    };

    let outcome = Rc::new(RefCell::new(None));
    let app_outcome = Rc::clone(&outcome);
    let quit_key = config.quit_key;

    eframe::run_native(
        &config.window_title,
        options,
        Box::new(move |_cc| Box::new(GestureApp::new(capture, quit_key, app_outcome))),
    )
    .map_err(|e| anyhow!("failed to run window: {}", e))?;

    // Closing the window directly counts as quitting.
    let exit = outcome.borrow_mut().take().unwrap_or(LoopExit::QuitKey);
    let code = exit.exit_code();
    if code != 0 {
        error!("{}", exit);
        std::process::exit(code);
    }

    info!("{}", exit);
    Ok(())
}
