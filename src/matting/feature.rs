use image::RgbImage;
use ndarray::{ArrayD, IxDyn};

/// Type of an image feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageType {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl ImageType {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            channels: 3,
        }
    }

    /// Interpret a feature type as an image type
    ///
    /// Array types count as images when they look like a single NCHW frame:
    /// rank 4, batch size 1 and 1, 3 or 4 channels.
    pub fn from_type(ty: &FeatureType) -> Option<ImageType> {
        match ty {
            FeatureType::Image(image) => Some(*image),
            FeatureType::Array(array) => match array.shape.as_slice() {
                &[1, channels, height, width] if matches!(channels, 1 | 3 | 4) => Some(ImageType {
                    width: width as u32,
                    height: height as u32,
                    channels: channels as u32,
                }),
                _ => None,
            },
        }
    }
}

/// Type of a dense `f32` array feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayType {
    pub shape: Vec<usize>,
}

impl ArrayType {
    pub fn new(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
        }
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureType {
    Image(ImageType),
    Array(ArrayType),
}

impl FeatureType {
    pub fn is_image(&self) -> bool {
        ImageType::from_type(self).is_some()
    }
}

/// Dense `f32` array feature
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayFeature {
    data: ArrayD<f32>,
}

impl ArrayFeature {
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>) -> anyhow::Result<Self> {
        let data = ArrayD::from_shape_vec(IxDyn(shape), data)?;
        Ok(Self { data })
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }
}

/// Input value handed to a predictor
#[derive(Debug, Clone)]
pub enum Feature {
    Image(RgbImage),
    Array(ArrayFeature),
}

impl Feature {
    pub fn feature_type(&self) -> FeatureType {
        match self {
            Feature::Image(image) => {
                let (width, height) = image.dimensions();
                FeatureType::Image(ImageType::new(width, height))
            }
            Feature::Array(array) => FeatureType::Array(ArrayType::new(array.shape())),
        }
    }
}

impl From<RgbImage> for Feature {
    fn from(image: RgbImage) -> Self {
        Feature::Image(image)
    }
}

impl From<ArrayFeature> for Feature {
    fn from(array: ArrayFeature) -> Self {
        Feature::Array(array)
    }
}
