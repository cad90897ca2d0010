// src/video.rs - Camera capture
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{Camera, NokhwaError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// One captured raster, RGB ordered. Lives for a single loop iteration.
pub type Frame = RgbImage;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open camera {index}")]
    Open {
        index: u32,
        #[source]
        source: NokhwaError,
    },
    #[error("failed to open camera stream")]
    Stream(#[source] NokhwaError),
    #[error("failed to capture frame")]
    Read(#[source] NokhwaError),
    #[error("failed to decode frame")]
    Decode(#[source] NokhwaError),
    #[error("camera has been released")]
    Released,
}

/// Something that yields frames until it fails or runs dry.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Gives the device back. Reads after this fail with [`CaptureError::Released`].
    fn release(&mut self);
}

/// Logs every camera the platform backend can see.
pub fn log_available_cameras() {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(cameras) => {
            info!("found {} camera(s)", cameras.len());
            for (i, camera) in cameras.iter().enumerate() {
                debug!("  [{}] {}", i, camera.human_name());
            }
        }
        Err(e) => warn!("failed to query cameras: {}", e),
    }
}

pub struct CameraSource {
    camera: Option<Camera>,
}

impl CameraSource {
    /// Opens the camera at `index` and starts streaming.
    pub fn open(index: u32) -> Result<Self, CaptureError> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|source| CaptureError::Open { index, source })?;
        camera.open_stream().map_err(CaptureError::Stream)?;

        let resolution = camera.resolution();
        info!(
            "camera {} streaming at {}x{} @ {} fps",
            index,
            resolution.width(),
            resolution.height(),
            camera.frame_rate()
        );

        Ok(Self {
            camera: Some(camera),
        })
    }
}

impl FrameSource for CameraSource {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let camera = self.camera.as_mut().ok_or(CaptureError::Released)?;

        let buffer = camera.frame().map_err(CaptureError::Read)?;
        buffer
            .decode_image::<RgbFormat>()
            .map_err(CaptureError::Decode)
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                warn!("failed to stop camera stream: {}", e);
            }
            debug!("camera released");
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}
