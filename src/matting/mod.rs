mod error;
pub mod feature;
mod matte;
mod ort_model;
mod predictor;
mod preprocess;
pub mod types;

pub use error::MattingError;
pub use feature::{ArrayFeature, ArrayType, Feature, FeatureType, ImageType};
pub use matte::{Matte, MatteSurface};
pub use ort_model::{ModelConfig, OrtFeature, OrtModel};
pub use predictor::{
    recurrent_state_shapes, RobustVideoMattingPredictor, RECURRENT_STATE_SHAPES, STATE_CHANNELS,
};
pub use preprocess::Preprocessor;
pub use types::{EdgeFeature, EdgeModel, Predictor};

use anyhow::Result;
use std::path::Path;

/// Load the RVM ONNX model and wrap it in a predictor
pub fn create_default_predictor<P: AsRef<Path>>(
    model_path: P,
    config: &ModelConfig,
) -> Result<RobustVideoMattingPredictor<OrtModel>> {
    let model = OrtModel::load(model_path, config)?;
    let predictor = RobustVideoMattingPredictor::with_state_shapes(model, &config.state_shapes)?;
    Ok(predictor)
}
