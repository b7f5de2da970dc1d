use super::OutputSink;
use anyhow::{Context, Result};
use image::{imageops, RgbaImage};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

/// v4l2loopback virtual camera
///
/// Frames are converted to YUYV and written straight to the device node.
pub struct V4L2Output {
    // Held open so the negotiated format stays in place
    _device: Device,
    file: File,
    width: u32,
    height: u32,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;
        let requested = Format::new(width, height, FourCC::new(b"YUYV"));
        let negotiated = Output::set_format(&device, &requested)
            .context("Failed to set v4l2loopback output format")?;
        tracing::debug!("v4l2loopback format: {}", negotiated);

        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            _device: device,
            file,
            width,
            height,
        })
    }
}

/// Pack an RGBA surface as YUV 4:2:2 (YUYV), ignoring alpha
///
/// Odd widths repeat the last pixel to complete the pair.
pub fn rgba_to_yuyv(surface: &RgbaImage) -> Vec<u8> {
    let (width, height) = surface.dimensions();
    let pairs = width.div_ceil(2);
    let mut yuyv = Vec::with_capacity((pairs * 4 * height) as usize);

    for y in 0..height {
        for x in (0..width).step_by(2) {
            let first = surface.get_pixel(x, y);
            let second = if x + 1 < width {
                surface.get_pixel(x + 1, y)
            } else {
                first
            };

            let (y0, u0, v0) = rgb_to_yuv(first[0], first[1], first[2]);
            let (y1, u1, v1) = rgb_to_yuv(second[0], second[1], second[2]);

            // Chroma is shared by the pair
            let u = ((u0 as u16 + u1 as u16) / 2) as u8;
            let v = ((v0 as u16 + v1 as u16) / 2) as u8;

            yuyv.extend_from_slice(&[y0, u, y1, v]);
        }
    }

    yuyv
}

/// BT.601 RGB to YUV
fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r = r as f32;
    let g = g as f32;
    let b = b as f32;

    let y = (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8;
    let u = (-0.147 * r - 0.289 * g + 0.436 * b + 128.0).round().clamp(0.0, 255.0) as u8;
    let v = (0.615 * r - 0.515 * g - 0.100 * b + 128.0).round().clamp(0.0, 255.0) as u8;

    (y, u, v)
}

impl OutputSink for V4L2Output {
    fn write_frame(&mut self, surface: &RgbaImage) -> Result<()> {
        let yuyv = if surface.dimensions() != (self.width, self.height) {
            let resized = imageops::resize(
                surface,
                self.width,
                self.height,
                imageops::FilterType::Triangle,
            );
            rgba_to_yuyv(&resized)
        } else {
            rgba_to_yuyv(surface)
        };

        self.file
            .write_all(&yuyv)
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn gray_levels_have_neutral_chroma() {
        assert_eq!(rgb_to_yuv(0, 0, 0), (0, 128, 128));
        assert_eq!(rgb_to_yuv(255, 255, 255), (255, 128, 128));
        let (_, u, v) = rgb_to_yuv(128, 128, 128);
        assert_eq!((u, v), (128, 128));
    }

    #[test]
    fn packs_two_bytes_per_pixel() {
        let surface = RgbaImage::from_pixel(4, 2, Rgba([255, 255, 255, 255]));
        let yuyv = rgba_to_yuyv(&surface);
        assert_eq!(yuyv.len(), 4 * 2 * 2);
        assert_eq!(&yuyv[..4], &[255, 128, 255, 128]);
    }

    #[test]
    fn odd_width_pads_last_pair() {
        let mut surface = RgbaImage::from_pixel(3, 1, Rgba([0, 0, 0, 255]));
        surface.put_pixel(2, 0, Rgba([255, 255, 255, 0]));
        let yuyv = rgba_to_yuyv(&surface);
        assert_eq!(yuyv.len(), 8);
        assert_eq!(&yuyv[4..], &[255, 128, 255, 128]);
    }
}
