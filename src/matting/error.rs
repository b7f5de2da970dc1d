use super::feature::FeatureType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MattingError {
    #[error("Robust Video Matting predictor expects a single feature, got {0}")]
    InputCount(usize),

    #[error("Robust Video Matting predictor expects an array or image feature, got {0:?}")]
    InputType(FeatureType),

    #[error("model returned {actual} outputs, expected {expected}")]
    OutputCount { expected: usize, actual: usize },

    #[error("matte of {width}x{height} cannot hold {len} values")]
    MatteShape { width: u32, height: u32, len: usize },

    #[error("alpha output has shape {0:?}, expected (1, 1, H, W)")]
    AlphaShape(Vec<usize>),

    #[error("cannot render to or from an empty surface")]
    EmptySurface,

    #[error("predictor has been disposed")]
    Disposed,

    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}
