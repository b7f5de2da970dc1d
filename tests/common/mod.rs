// tests/common/mod.rs: Mock inference engine shared by the integration tests.
//
// Every tensor the mock hands out gets a unique id, and dropping it records
// that id in a shared ledger, so tests can tell which tensors were released
// and how many times.

#![allow(dead_code)]

use anyhow::{bail, Result};
use rvm_matte::matting::{ArrayType, EdgeFeature, EdgeModel, Feature, FeatureType, ImageType};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Default)]
pub struct Ledger {
    next_id: Cell<usize>,
    released: RefCell<Vec<usize>>,
    /// Input ids of every predict call, in order
    calls: RefCell<Vec<Vec<usize>>>,
}

impl Ledger {
    pub fn released(&self) -> Vec<usize> {
        self.released.borrow().clone()
    }

    pub fn calls(&self) -> Vec<Vec<usize>> {
        self.calls.borrow().clone()
    }

    pub fn allocated(&self) -> usize {
        self.next_id.get()
    }
}

pub struct MockTensor {
    pub id: usize,
    shape: Vec<usize>,
    data: Vec<f32>,
    ledger: Rc<Ledger>,
}

impl EdgeFeature for MockTensor {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn to_vec(&self) -> Result<Vec<f32>> {
        Ok(self.data.clone())
    }
}

impl Drop for MockTensor {
    fn drop(&mut self) {
        self.ledger.released.borrow_mut().push(self.id);
    }
}

/// Fake RVM engine producing an alpha output of a fixed size
pub struct MockModel {
    inputs: Vec<FeatureType>,
    pub ledger: Rc<Ledger>,
    alpha_height: usize,
    alpha_width: usize,
    /// Alpha value for every pixel
    pub alpha: f32,
    /// Channel count of the alpha output; RVM emits 1
    pub alpha_channels: usize,
    /// Number of outputs to drop from the end of each result
    pub truncate_outputs: usize,
}

impl MockModel {
    pub fn new(alpha_width: usize, alpha_height: usize, state_shapes: &[[usize; 4]]) -> Self {
        let inputs = std::iter::once(FeatureType::Image(ImageType::new(16, 9)))
            .chain(
                state_shapes
                    .iter()
                    .map(|shape| FeatureType::Array(ArrayType::new(shape))),
            )
            .collect();
        Self {
            inputs,
            ledger: Rc::default(),
            alpha_height,
            alpha_width,
            alpha: 0.5,
            alpha_channels: 1,
            truncate_outputs: 0,
        }
    }

    fn tensor(&self, shape: &[usize], value: f32) -> MockTensor {
        let id = self.ledger.next_id.get() + 1;
        self.ledger.next_id.set(id);
        MockTensor {
            id,
            shape: shape.to_vec(),
            data: vec![value; shape.iter().product()],
            ledger: Rc::clone(&self.ledger),
        }
    }
}

impl EdgeModel for MockModel {
    type Feature = MockTensor;

    fn inputs(&self) -> &[FeatureType] {
        &self.inputs
    }

    fn create_feature(&self, feature: &Feature, ty: &FeatureType) -> Result<MockTensor> {
        match (feature, ty) {
            (Feature::Array(array), FeatureType::Array(target)) => {
                if array.shape() != target.shape.as_slice() {
                    bail!("shape mismatch");
                }
                Ok(self.tensor(&target.shape, 0.0))
            }
            (_, FeatureType::Image(image)) => Ok(self.tensor(
                &[1, 3, image.height as usize, image.width as usize],
                0.0,
            )),
            (Feature::Image(_), FeatureType::Array(_)) => bail!("image given for array input"),
        }
    }

    fn predict(&mut self, inputs: &[&MockTensor]) -> Result<Vec<MockTensor>> {
        self.ledger
            .calls
            .borrow_mut()
            .push(inputs.iter().map(|tensor| tensor.id).collect());

        let (h, w) = (self.alpha_height, self.alpha_width);
        let mut outputs = vec![
            self.tensor(&[1, 3, h, w], 0.0),
            self.tensor(&[1, self.alpha_channels, h, w], self.alpha),
        ];
        for state in &inputs[1..] {
            outputs.push(self.tensor(&state.shape, 1.0));
        }
        outputs.truncate(outputs.len() - self.truncate_outputs);
        Ok(outputs)
    }
}
