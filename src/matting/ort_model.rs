use super::feature::{ArrayType, Feature, FeatureType, ImageType};
use super::predictor::{recurrent_state_shapes, RECURRENT_STATE_SHAPES};
use super::preprocess::Preprocessor;
use super::types::{EdgeFeature, EdgeModel};
use anyhow::{bail, Context, Result};
use ndarray::{Array4, Ix4};
use ort::execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionInputValue};
use ort::value::{DynValue, Tensor};
use std::path::Path;

/// Graph input carrying the downsample ratio in the upstream RVM export
const DOWNSAMPLE_RATIO_INPUT: &str = "downsample_ratio";

/// ONNX Runtime session settings
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model input width. `state_shapes` must follow the input size.
    pub input_width: u32,
    pub input_height: u32,
    /// Fed to graphs that declare a `downsample_ratio` input
    pub downsample_ratio: f32,
    pub intra_threads: usize,
    /// Register TensorRT and CUDA execution providers
    pub use_gpu: bool,
    pub state_shapes: Vec<[usize; 4]>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_width: 1920,
            input_height: 1080,
            downsample_ratio: 0.25,
            intra_threads: 4,
            use_gpu: false,
            state_shapes: RECURRENT_STATE_SHAPES.to_vec(),
        }
    }
}

impl ModelConfig {
    /// Config for a model input size, with state shapes derived from it
    pub fn with_input_size(input_width: u32, input_height: u32, downsample_ratio: f32) -> Self {
        Self {
            input_width,
            input_height,
            downsample_ratio,
            state_shapes: recurrent_state_shapes(input_width, input_height, downsample_ratio),
            ..Self::default()
        }
    }
}

/// Tensor held on behalf of an ONNX Runtime session
#[derive(Debug, Clone)]
pub struct OrtFeature {
    data: Array4<f32>,
}

impl OrtFeature {
    fn to_value(&self) -> Result<DynValue> {
        let (n, c, h, w) = self.data.dim();
        let data: Vec<f32> = self.data.iter().copied().collect();
        Ok(Tensor::from_array(([n, c, h, w], data.into_boxed_slice()))
            .context("failed to create input tensor")?
            .into_dyn())
    }

    fn from_output(shape: &[i64], data: &[f32]) -> Result<Self> {
        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        let &[n, c, h, w] = dims.as_slice() else {
            bail!("expected a rank 4 output, got shape {:?}", shape);
        };
        let data = Array4::from_shape_vec((n, c, h, w), data.to_vec())?;
        Ok(Self { data })
    }
}

impl EdgeFeature for OrtFeature {
    fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    fn to_vec(&self) -> Result<Vec<f32>> {
        Ok(self.data.iter().copied().collect())
    }
}

/// Robust Video Matting ONNX model
///
/// Inputs are the source frame followed by the recurrent states r1-r4.
/// Outputs are fgr (foreground), pha (alpha) and the updated states.
pub struct OrtModel {
    session: Session,
    input_types: Vec<FeatureType>,
    input_names: Vec<String>,
    output_names: Vec<String>,
    has_ratio_input: bool,
    downsample_ratio: f32,
}

impl OrtModel {
    /// Load an RVM model from an ONNX file
    pub fn load<P: AsRef<Path>>(model_path: P, config: &ModelConfig) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading RVM model from {}", path.display());

        let mut builder = Session::builder().context("failed to create ORT session builder")?;
        builder = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("failed to set ORT optimization level")?;
        builder = builder
            .with_intra_threads(config.intra_threads)
            .context("failed to set ORT intra threads")?;
        if config.use_gpu {
            builder = builder
                .with_execution_providers([
                    TensorRTExecutionProvider::default().build(),
                    CUDAExecutionProvider::default().build(),
                ])
                .context("failed to register execution providers")?;
        }
        let session = builder
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let has_ratio_input = session
            .inputs
            .iter()
            .any(|input| input.name == DOWNSAMPLE_RATIO_INPUT);
        let input_names: Vec<String> = session
            .inputs
            .iter()
            .map(|input| input.name.clone())
            .filter(|name| name != DOWNSAMPLE_RATIO_INPUT)
            .collect();
        let output_names: Vec<String> = session
            .outputs
            .iter()
            .map(|output| output.name.clone())
            .collect();

        tracing::debug!("Model inputs: {:?}", input_names);
        tracing::debug!("Model outputs: {:?}", output_names);

        let input_types = Self::input_types(config);
        if input_names.len() != input_types.len() {
            bail!(
                "model declares {} inputs, expected {} (frame and {} recurrent states)",
                input_names.len(),
                input_types.len(),
                config.state_shapes.len()
            );
        }

        tracing::info!("RVM model loaded successfully");

        Ok(Self {
            session,
            input_types,
            input_names,
            output_names,
            has_ratio_input,
            downsample_ratio: config.downsample_ratio,
        })
    }

    fn input_types(config: &ModelConfig) -> Vec<FeatureType> {
        std::iter::once(FeatureType::Image(ImageType::new(
            config.input_width,
            config.input_height,
        )))
        .chain(
            config
                .state_shapes
                .iter()
                .map(|shape| FeatureType::Array(ArrayType::new(shape))),
        )
        .collect()
    }
}

impl EdgeModel for OrtModel {
    type Feature = OrtFeature;

    fn inputs(&self) -> &[FeatureType] {
        &self.input_types
    }

    fn create_feature(&self, feature: &Feature, ty: &FeatureType) -> Result<OrtFeature> {
        match (feature, ty) {
            (Feature::Image(image), FeatureType::Image(target)) => {
                let data = Preprocessor::new(target.width, target.height).preprocess(image);
                Ok(OrtFeature { data })
            }
            (Feature::Array(array), FeatureType::Image(target)) => {
                let image = Preprocessor::array_to_image(array.data())?;
                let data = Preprocessor::new(target.width, target.height).preprocess(&image);
                Ok(OrtFeature { data })
            }
            (Feature::Array(array), FeatureType::Array(target)) => {
                if array.shape() != target.shape.as_slice() {
                    bail!(
                        "array of shape {:?} does not match {:?}",
                        array.shape(),
                        target.shape
                    );
                }
                let data = array.data().view().into_dimensionality::<Ix4>()?.to_owned();
                Ok(OrtFeature { data })
            }
            (Feature::Image(_), FeatureType::Array(target)) => {
                bail!("cannot create an array of shape {:?} from an image", target.shape)
            }
        }
    }

    fn predict(&mut self, inputs: &[&OrtFeature]) -> Result<Vec<OrtFeature>> {
        let _span = tracing::debug_span!("inference").entered();

        if inputs.len() != self.input_names.len() {
            bail!(
                "model expects {} inputs, got {}",
                self.input_names.len(),
                inputs.len()
            );
        }

        let mut values: Vec<(String, SessionInputValue<'static>)> = self
            .input_names
            .iter()
            .zip(inputs)
            .map(|(name, feature)| Ok((name.clone(), SessionInputValue::from(feature.to_value()?))))
            .collect::<Result<_>>()?;
        if self.has_ratio_input {
            let ratio = vec![self.downsample_ratio].into_boxed_slice();
            let ratio = Tensor::from_array(([1usize], ratio))
                .context("failed to create downsample ratio tensor")?;
            values.push((
                DOWNSAMPLE_RATIO_INPUT.to_string(),
                SessionInputValue::from(ratio.into_dyn()),
            ));
        }

        let outputs = self
            .session
            .run(values)
            .context("Failed to run inference")?;

        self.output_names
            .iter()
            .map(|name| {
                let (shape, data) = outputs[name.as_str()]
                    .try_extract_tensor::<f32>()
                    .with_context(|| format!("failed to extract output {name}"))?;
                OrtFeature::from_output(shape, data)
            })
            .collect()
    }
}
