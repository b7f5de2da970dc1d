// tests/test_pipeline.rs: Frame loop tests with in-memory capture and output.

mod common;

use anyhow::{bail, Result};
use common::MockModel;
use image::{Rgb, RgbImage, RgbaImage};
use rvm_matte::capture::CaptureSource;
use rvm_matte::matting::{Predictor, RobustVideoMattingPredictor};
use rvm_matte::output::OutputSink;
use rvm_matte::pipeline::{run_pipeline, PipelineOptions};

const STATES: [[usize; 4]; 4] = [[1, 1, 4, 4], [1, 1, 2, 2], [1, 1, 2, 2], [1, 1, 1, 1]];

/// Produces solid frames until `fail_after` frames have been captured
struct StillCamera {
    width: u32,
    height: u32,
    captured: u64,
    fail_after: Option<u64>,
}

impl StillCamera {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            captured: 0,
            fail_after: None,
        }
    }
}

impl CaptureSource for StillCamera {
    fn capture_frame(&mut self) -> Result<RgbImage> {
        if self.fail_after == Some(self.captured) {
            bail!("camera unplugged");
        }
        self.captured += 1;
        Ok(RgbImage::from_pixel(self.width, self.height, Rgb([10, 20, 30])))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Default)]
struct Recorder {
    frames: Vec<RgbaImage>,
}

impl OutputSink for Recorder {
    fn write_frame(&mut self, surface: &RgbaImage) -> Result<()> {
        self.frames.push(surface.clone());
        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        self.frames.first().map_or((0, 0), |f| f.dimensions())
    }
}

fn options(max_frames: u64) -> PipelineOptions {
    PipelineOptions {
        target_fps: 1000,
        max_frames: Some(max_frames),
    }
}

#[test]
fn renders_one_surface_per_frame_at_preview_size() {
    let mut model = MockModel::new(4, 4, &STATES);
    model.alpha = 1.0;
    let mut predictor = RobustVideoMattingPredictor::with_state_shapes(model, &STATES).unwrap();
    let mut camera = StillCamera::new(12, 8);
    let mut output = Recorder::default();

    let stats = run_pipeline(&mut camera, &mut output, &mut predictor, options(3)).unwrap();

    assert_eq!(stats.frames, 3);
    assert_eq!(output.frames.len(), 3);
    for surface in &output.frames {
        assert_eq!(surface.dimensions(), (12, 8));
        assert!(surface.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }
}

#[test]
fn predictor_is_disposed_when_loop_ends() {
    let model = MockModel::new(4, 4, &STATES);
    let ledger = std::rc::Rc::clone(&model.ledger);
    let mut predictor = RobustVideoMattingPredictor::with_state_shapes(model, &STATES).unwrap();
    let mut camera = StillCamera::new(8, 8);
    let mut output = Recorder::default();

    run_pipeline(&mut camera, &mut output, &mut predictor, options(2)).unwrap();

    assert!(predictor.is_disposed());
    assert_eq!(ledger.released().len(), ledger.allocated());
}

#[test]
fn capture_failure_stops_loop_and_disposes() {
    let mut predictor =
        RobustVideoMattingPredictor::with_state_shapes(MockModel::new(4, 4, &STATES), &STATES)
            .unwrap();
    let mut camera = StillCamera::new(8, 8);
    camera.fail_after = Some(1);
    let mut output = Recorder::default();

    let err = run_pipeline(&mut camera, &mut output, &mut predictor, options(5)).unwrap_err();

    assert!(format!("{err:#}").contains("camera unplugged"));
    assert_eq!(output.frames.len(), 1);
    assert!(predictor.is_disposed());
    assert!(predictor.predict(&[]).is_err());
}
