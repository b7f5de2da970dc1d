use crate::capture::CaptureSource;
use crate::matting::{Matte, Predictor};
use crate::output::OutputSink;
use anyhow::{Context, Result};
use image::RgbaImage;
use std::time::{Duration, Instant};

/// Frames between timing reports
const STATS_INTERVAL: u64 = 30;

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub target_fps: u32,
    /// Stop after this many frames; run until an error otherwise
    pub max_frames: Option<u64>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            target_fps: 30,
            max_frames: None,
        }
    }
}

/// Accumulated per-stage timings
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameStats {
    pub frames: u64,
    pub capture: Duration,
    pub predict: Duration,
    pub render: Duration,
    pub output: Duration,
}

impl FrameStats {
    fn average_ms(&self, total: Duration) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        total.as_secs_f64() * 1000.0 / self.frames as f64
    }

    fn log(&self) {
        let capture_ms = self.average_ms(self.capture);
        let predict_ms = self.average_ms(self.predict);
        let render_ms = self.average_ms(self.render);
        let output_ms = self.average_ms(self.output);
        let total_ms = capture_ms + predict_ms + render_ms + output_ms;
        let fps = if total_ms > 0.0 { 1000.0 / total_ms } else { 0.0 };

        tracing::info!(
            "Frame {}: capture={:.1}ms, predict={:.1}ms, render={:.1}ms, output={:.1}ms, total={:.1}ms, fps={:.1}",
            self.frames,
            capture_ms,
            predict_ms,
            render_ms,
            output_ms,
            total_ms,
            fps
        );
    }
}

/// Camera → predictor → matte surface → output, one frame at a time
///
/// The predictor is disposed when the loop ends, whether it stopped after
/// `max_frames` or on an error.
pub fn run_pipeline<C, O, P>(
    capture: &mut C,
    output: &mut O,
    predictor: &mut P,
    options: PipelineOptions,
) -> Result<FrameStats>
where
    C: CaptureSource,
    O: OutputSink,
    P: Predictor<Output = Matte>,
{
    let result = run_frames(capture, output, predictor, options);
    predictor.dispose();
    result
}

fn run_frames<C, O, P>(
    capture: &mut C,
    output: &mut O,
    predictor: &mut P,
    options: PipelineOptions,
) -> Result<FrameStats>
where
    C: CaptureSource,
    O: OutputSink,
    P: Predictor<Output = Matte>,
{
    let frame_duration = Duration::from_secs_f32(1.0 / options.target_fps.max(1) as f32);

    // Matte surface matches the camera preview
    let (width, height) = capture.resolution();
    let mut surface = RgbaImage::new(width, height);
    let mut stats = FrameStats::default();

    tracing::info!("Starting matting loop with {}x{} matte surface", width, height);

    while options.max_frames.map_or(true, |max| stats.frames < max) {
        let loop_start = Instant::now();

        let capture_start = Instant::now();
        let frame = capture
            .capture_feature()
            .context("Failed to capture frame")?;
        stats.capture += capture_start.elapsed();

        let predict_start = Instant::now();
        let matte = predictor
            .predict(std::slice::from_ref(&frame))
            .context("Failed to predict matte")?;
        stats.predict += predict_start.elapsed();

        let render_start = Instant::now();
        matte
            .render(&mut surface)
            .context("Failed to render matte")?;
        stats.render += render_start.elapsed();

        let output_start = Instant::now();
        output
            .write_frame(&surface)
            .context("Failed to write frame")?;
        stats.output += output_start.elapsed();

        stats.frames += 1;
        if stats.frames % STATS_INTERVAL == 0 {
            stats.log();
        }

        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }

    tracing::info!("Matting loop finished after {} frames", stats.frames);
    Ok(stats)
}
