use super::CaptureSource;
use anyhow::{Context, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

/// Webcam preview stream
pub struct WebcamCapture {
    camera: Camera,
    width: u32,
    height: u32,
}

impl WebcamCapture {
    /// Open the camera at `device_index` and start its preview stream
    ///
    /// The camera is asked for its highest resolution up to the requested
    /// preview size. The size it actually delivers is reported by `resolution`.
    pub fn new(device_index: u32, preview_width: u32, preview_height: u32) -> Result<Self> {
        tracing::info!(
            "Opening camera {} with preview resolution {}x{}",
            device_index,
            preview_width,
            preview_height
        );

        let index = CameraIndex::Index(device_index);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::HighestResolution(
            Resolution::new(preview_width, preview_height),
        ));

        let mut camera = Camera::new(index, requested).context("Failed to open camera")?;
        camera
            .open_stream()
            .context("Failed to start camera preview")?;

        let resolution = camera.resolution();
        let (width, height) = (resolution.width(), resolution.height());
        if (width, height) != (preview_width, preview_height) {
            tracing::warn!(
                "Camera negotiated {}x{} instead of {}x{}",
                width,
                height,
                preview_width,
                preview_height
            );
        }

        tracing::info!("Camera preview running at {}x{}", width, height);

        Ok(Self {
            camera,
            width,
            height,
        })
    }
}

impl CaptureSource for WebcamCapture {
    fn capture_frame(&mut self) -> Result<RgbImage> {
        let buffer = self
            .camera
            .frame()
            .context("Failed to read camera frame")?;

        let decoded = buffer
            .decode_image::<RgbFormat>()
            .context("Failed to decode camera frame")?;

        // nokhwa links its own `image` version, so move the pixels over raw
        let (width, height) = (decoded.width(), decoded.height());
        RgbImage::from_raw(width, height, decoded.into_raw())
            .context("Camera frame has an unexpected buffer size")
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        if let Err(err) = self.camera.stop_stream() {
            tracing::warn!("Failed to stop camera preview: {}", err);
        }
    }
}
