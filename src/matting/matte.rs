use super::error::MattingError;
use image::{imageops, ImageBuffer, Luma, Rgba, RgbaImage};

/// Single channel `f32` surface holding matte probabilities
pub type MatteSurface = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Alpha matte
///
/// Each value is the probability of that pixel location being a person (~1.0)
/// or background (~0.0), flattened in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Matte {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Matte {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self, MattingError> {
        if data.len() != width as usize * height as usize {
            return Err(MattingError::MatteShape {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Foreground probability at a pixel, `None` outside the matte
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.data.get(index).copied()
    }

    /// Upload the probabilities into a single channel surface
    pub fn to_luma(&self) -> MatteSurface {
        // Length is checked in `new`
        MatteSurface::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| MatteSurface::new(self.width, self.height))
    }

    /// Render the matte into an RGBA surface
    ///
    /// Each pixel becomes `(p, p, p, 255)` where `p` is the foreground
    /// probability. The matte is scaled bilinearly when the destination size
    /// differs from the matte size.
    pub fn render(&self, destination: &mut RgbaImage) -> Result<(), MattingError> {
        let _span = tracing::debug_span!("render_matte").entered();

        let (width, height) = destination.dimensions();
        if width == 0 || height == 0 || self.data.is_empty() {
            return Err(MattingError::EmptySurface);
        }

        let surface = self.to_luma();
        let surface = if surface.dimensions() != (width, height) {
            imageops::resize(&surface, width, height, imageops::FilterType::Triangle)
        } else {
            surface
        };

        for (src, dst) in surface.pixels().zip(destination.pixels_mut()) {
            let value = (src[0].clamp(0.0, 1.0) * 255.0).round() as u8;
            *dst = Rgba([value, value, value, 255]);
        }

        Ok(())
    }
}
