use super::error::MattingError;
use super::feature::{Feature, FeatureType};
use anyhow::Result;

/// Tensor owned by an inference engine
///
/// Dropping the value releases it.
pub trait EdgeFeature {
    /// Tensor dimensions
    fn shape(&self) -> &[usize];

    /// Copy the tensor out as `f32` values in row-major order
    fn to_vec(&self) -> Result<Vec<f32>>;
}

/// On-device inference engine
///
/// Allows swapping between different backends (ONNX Runtime, mocks in tests, etc.)
pub trait EdgeModel {
    type Feature: EdgeFeature;

    /// Input types in the order `predict` expects them
    fn inputs(&self) -> &[FeatureType];

    /// Marshal a client feature into an engine tensor of the given type
    fn create_feature(&self, feature: &Feature, ty: &FeatureType) -> Result<Self::Feature>;

    /// Run the model once
    fn predict(&mut self, inputs: &[&Self::Feature]) -> Result<Vec<Self::Feature>>;
}

/// Stateful predictor built on top of an edge model
pub trait Predictor {
    type Output;

    /// Run a prediction on the given input features
    fn predict(&mut self, inputs: &[Feature]) -> Result<Self::Output, MattingError>;

    /// Reset internal state (for models with temporal/recurrent components)
    ///
    /// Call this when:
    /// - Switching cameras
    /// - Scene cuts detected
    /// - Starting a new video session
    fn reset_state(&mut self) -> Result<(), MattingError> {
        Ok(())
    }

    /// Release the model and any retained tensors
    ///
    /// Safe to call more than once.
    fn dispose(&mut self);
}
