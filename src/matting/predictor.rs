use super::error::MattingError;
use super::feature::{ArrayFeature, ArrayType, Feature, FeatureType, ImageType};
use super::matte::Matte;
use super::types::{EdgeFeature, EdgeModel, Predictor};

/// Recurrent state shapes of the 1920x1080 RVM export (downsample ratio 0.25)
pub const RECURRENT_STATE_SHAPES: [[usize; 4]; 4] = [
    [1, 16, 135, 240],
    [1, 20, 68, 120],
    [1, 40, 34, 60],
    [1, 64, 17, 30],
];

/// Channels of the r1-r4 states in the MobileNetV3 RVM export
pub const STATE_CHANNELS: [usize; 4] = [16, 20, 40, 64];

/// Recurrent state shapes for a model input size and downsample ratio
///
/// The frame is downsampled by `downsample_ratio`, then each state is half
/// the size of the previous one, rounding up like the encoder's strided convs.
pub fn recurrent_state_shapes(width: u32, height: u32, downsample_ratio: f32) -> Vec<[usize; 4]> {
    let mut h = (height as f32 * downsample_ratio).ceil() as usize;
    let mut w = (width as f32 * downsample_ratio).ceil() as usize;

    STATE_CHANNELS
        .iter()
        .map(|&channels| {
            h = h.div_ceil(2);
            w = w.div_ceil(2);
            [1, channels, h, w]
        })
        .collect()
}

/// Number of outputs RVM produces: fgr, pha and one per recurrent state
const FIXED_OUTPUTS: usize = 2;

/// Robust Video Matting predictor
///
/// Owns the model and the recurrent hidden states (r1-r4). States are fed
/// into every inference and replaced by the states the model returns, which
/// keeps mattes temporally consistent across frames.
pub struct RobustVideoMattingPredictor<M: EdgeModel> {
    model: Option<M>,
    state_shapes: Vec<[usize; 4]>,
    recurrent_state: Vec<M::Feature>,
}

impl<M: EdgeModel> RobustVideoMattingPredictor<M> {
    /// Create a predictor with the default recurrent state shapes
    pub fn new(model: M) -> Result<Self, MattingError> {
        Self::with_state_shapes(model, &RECURRENT_STATE_SHAPES)
    }

    /// Create a predictor for an export with a different state geometry
    pub fn with_state_shapes(model: M, state_shapes: &[[usize; 4]]) -> Result<Self, MattingError> {
        let recurrent_state = Self::initial_state(&model, state_shapes)?;
        Ok(Self {
            model: Some(model),
            state_shapes: state_shapes.to_vec(),
            recurrent_state,
        })
    }

    /// Zero-filled state tensors allocated by the model
    fn initial_state(model: &M, state_shapes: &[[usize; 4]]) -> Result<Vec<M::Feature>, MattingError> {
        tracing::debug!("Initializing {} recurrent states", state_shapes.len());

        state_shapes
            .iter()
            .map(|shape| {
                let ty = FeatureType::Array(ArrayType::new(shape));
                let zeros = Feature::Array(ArrayFeature::zeros(shape));
                Ok(model.create_feature(&zeros, &ty)?)
            })
            .collect()
    }

    /// Recurrent state tensors currently retained by the predictor
    pub fn recurrent_state(&self) -> &[M::Feature] {
        &self.recurrent_state
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.model.is_none()
    }
}

impl<M: EdgeModel> Predictor for RobustVideoMattingPredictor<M> {
    type Output = Matte;

    /// Compute a human alpha matte on an image
    fn predict(&mut self, inputs: &[Feature]) -> Result<Matte, MattingError> {
        let _span = tracing::debug_span!("rvm_predict").entered();

        let [input] = inputs else {
            return Err(MattingError::InputCount(inputs.len()));
        };
        let input_type = input.feature_type();
        if ImageType::from_type(&input_type).is_none() {
            return Err(MattingError::InputType(input_type));
        }
        let model = self.model.as_mut().ok_or(MattingError::Disposed)?;

        let image_type = model
            .inputs()
            .first()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("model declares no inputs"))?;
        let image = model.create_feature(input, &image_type)?;

        let mut outputs = {
            let mut features = Vec::with_capacity(1 + self.recurrent_state.len());
            features.push(&image);
            features.extend(self.recurrent_state.iter());
            model.predict(&features)?
        };

        let expected = FIXED_OUTPUTS + self.recurrent_state.len();
        if outputs.len() != expected {
            return Err(MattingError::OutputCount {
                expected,
                actual: outputs.len(),
            });
        }

        let states = outputs.split_off(FIXED_OUTPUTS);
        let alpha = outputs.swap_remove(1);
        drop(outputs);

        // Retire the previous states, retain the new ones
        for (state, next) in self.recurrent_state.iter_mut().zip(states) {
            *state = next;
        }

        let shape = alpha.shape();
        let &[1, 1, height, width] = shape else {
            return Err(MattingError::AlphaShape(shape.to_vec()));
        };
        let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
            return Err(MattingError::AlphaShape(shape.to_vec()));
        };
        Matte::new(width, height, alpha.to_vec()?)
    }

    fn reset_state(&mut self) -> Result<(), MattingError> {
        let Some(model) = self.model.as_ref() else {
            return Ok(());
        };

        tracing::info!("Resetting RVM hidden states");
        self.recurrent_state = Self::initial_state(model, &self.state_shapes)?;
        Ok(())
    }

    /// Dispose the predictor and release resources
    fn dispose(&mut self) {
        if self.model.is_none() {
            return;
        }
        tracing::debug!("Disposing RVM predictor");
        self.recurrent_state.clear();
        self.model = None;
    }
}

impl<M: EdgeModel> Drop for RobustVideoMattingPredictor<M> {
    fn drop(&mut self) {
        self.dispose();
    }
}
