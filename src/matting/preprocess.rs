use anyhow::{bail, Result};
use image::{imageops, RgbImage};
use ndarray::{Array4, ArrayD, Ix4};

/// Preprocessor for converting RGB images to model input tensors
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
        }
    }

    /// Preprocess an RGB image into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Resize to target dimensions
    /// 2. Convert to float and normalize to [0, 1]
    /// 3. Transpose from HWC to NCHW format
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized = if image.dimensions() != (self.target_width, self.target_height) {
            imageops::resize(
                image,
                self.target_width,
                self.target_height,
                imageops::FilterType::Lanczos3,
            )
        } else {
            image.clone()
        };

        let (width, height) = resized.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                tensor[[0, c, y, x]] = pixel[c] as f32 / 255.0;
            }
        }

        tensor
    }

    /// Convert an NCHW array with values in [0, 1] back to an RGB image
    ///
    /// Single channel arrays are replicated to gray, a fourth channel is ignored.
    pub fn array_to_image(array: &ArrayD<f32>) -> Result<RgbImage> {
        let array = array.view().into_dimensionality::<Ix4>()?;
        let (batch, channels, height, width) = array.dim();
        if batch != 1 || !matches!(channels, 1 | 3 | 4) {
            bail!("array of shape {:?} is not an image", array.shape());
        }

        let image = RgbImage::from_fn(width as u32, height as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            let channel = |c: usize| {
                let c = if channels == 1 { 0 } else { c };
                (array[[0, c, y, x]] * 255.0).round().clamp(0.0, 255.0) as u8
            };
            image::Rgb([channel(0), channel(1), channel(2)])
        });

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use ndarray::IxDyn;

    #[test]
    fn preprocess_produces_normalized_nchw() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([255, 0, 51]));
        image.put_pixel(1, 0, Rgb([0, 255, 0]));

        let tensor = Preprocessor::new(2, 1).preprocess(&image);
        assert_eq!(tensor.shape(), &[1, 3, 1, 2]);
        assert_eq!(tensor[[0, 0, 0, 0]], 1.0);
        assert_eq!(tensor[[0, 1, 0, 0]], 0.0);
        assert!((tensor[[0, 2, 0, 0]] - 0.2).abs() < 1e-6);
        assert_eq!(tensor[[0, 1, 0, 1]], 1.0);
    }

    #[test]
    fn preprocess_resizes_to_target() {
        let image = RgbImage::from_pixel(64, 32, Rgb([128, 128, 128]));
        let tensor = Preprocessor::new(16, 8).preprocess(&image);
        assert_eq!(tensor.shape(), &[1, 3, 8, 16]);
    }

    #[test]
    fn gray_arrays_become_gray_images() {
        let array = ArrayD::from_elem(IxDyn(&[1, 1, 2, 3]), 1.0f32);
        let image = Preprocessor::array_to_image(&array).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert!(image.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn non_image_arrays_are_rejected() {
        let array = ArrayD::<f32>::zeros(IxDyn(&[1, 16, 4, 4]));
        assert!(Preprocessor::array_to_image(&array).is_err());
        let array = ArrayD::<f32>::zeros(IxDyn(&[4, 4]));
        assert!(Preprocessor::array_to_image(&array).is_err());
    }
}
