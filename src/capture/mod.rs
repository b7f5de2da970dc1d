mod webcam;

pub use webcam::WebcamCapture;

use crate::matting::Feature;
use anyhow::Result;
use image::RgbImage;

/// Source of camera preview frames
pub trait CaptureSource {
    /// Block until the next frame is available
    fn capture_frame(&mut self) -> Result<RgbImage>;

    /// Next frame wrapped as a predictor input
    fn capture_feature(&mut self) -> Result<Feature> {
        self.capture_frame().map(Feature::Image)
    }

    /// Negotiated preview resolution as (width, height)
    fn resolution(&self) -> (u32, u32);
}
