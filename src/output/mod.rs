mod loopback;

pub use loopback::V4L2Output;

use anyhow::Result;
use image::RgbaImage;

/// Destination for rendered matte surfaces
pub trait OutputSink {
    /// Present one rendered surface
    fn write_frame(&mut self, surface: &RgbaImage) -> Result<()>;

    /// Resolution frames are delivered at as (width, height)
    fn resolution(&self) -> (u32, u32);
}
