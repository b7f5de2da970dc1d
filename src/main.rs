use anyhow::{Context, Result};
use clap::Parser;
use rvm_matte::capture::{CaptureSource, WebcamCapture};
use rvm_matte::matting::{self, ModelConfig};
use rvm_matte::output::V4L2Output;
use rvm_matte::pipeline::{run_pipeline, PipelineOptions};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the Robust Video Matting model (ONNX file)
    #[arg(short, long)]
    model: PathBuf,

    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Output v4l2loopback device path
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Camera preview width
    #[arg(long, default_value_t = 1280)]
    preview_width: u32,

    /// Camera preview height
    #[arg(long, default_value_t = 720)]
    preview_height: u32,

    /// Output resolution width
    #[arg(long, default_value_t = 1280)]
    output_width: u32,

    /// Output resolution height
    #[arg(long, default_value_t = 720)]
    output_height: u32,

    /// Model input width
    #[arg(long, default_value_t = 1920)]
    model_width: u32,

    /// Model input height
    #[arg(long, default_value_t = 1080)]
    model_height: u32,

    /// Downsample ratio; also sets the recurrent state sizes
    #[arg(long, default_value_t = 0.25)]
    downsample_ratio: f32,

    /// ONNX Runtime intra-op threads
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Use the TensorRT / CUDA execution providers
    #[arg(long)]
    gpu: bool,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn model_config(&self) -> ModelConfig {
        ModelConfig {
            intra_threads: self.threads,
            use_gpu: self.gpu,
            ..ModelConfig::with_input_size(self.model_width, self.model_height, self.downsample_ratio)
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{:#}", err);
        return Err(err);
    }

    Ok(())
}

fn run(args: &Args) -> Result<()> {
    tracing::info!("rvm-matte starting");
    tracing::info!("Preview: {}x{}", args.preview_width, args.preview_height);
    tracing::info!("Output: {}x{}", args.output_width, args.output_height);
    tracing::info!("Target FPS: {}", args.fps);

    let mut capture = WebcamCapture::new(args.input_device, args.preview_width, args.preview_height)
        .context("Failed to start camera preview")?;
    let (width, height) = capture.resolution();
    tracing::info!("Matte aspect ratio: {:.3}", width as f32 / height.max(1) as f32);

    let mut output = V4L2Output::new(&args.output_device, args.output_width, args.output_height)
        .context("Failed to initialize v4l2loopback output")?;

    let config = args.model_config();
    let mut predictor = matting::create_default_predictor(&args.model, &config)
        .context("Failed to create RVM predictor")?;

    let options = PipelineOptions {
        target_fps: args.fps,
        max_frames: args.max_frames,
    };
    run_pipeline(&mut capture, &mut output, &mut predictor, options)?;

    Ok(())
}
