//! Real-time hand tracking and finger counting from a camera, video file or IP camera.

use anyhow::{bail, Context, Result};
use clap::Parser;
use finger_count::app::{self, HandTrackingApp};
use finger_count::config::Config;
use finger_count::pipeline::PipelineDriver;
use finger_count::sink::default_output_path;
use finger_count::source::VideoSource;
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long, default_value = "0", conflicts_with_all = ["video", "ip"])]
    cam: i32,

    /// Video file to process
    #[arg(short, long, conflicts_with = "ip")]
    video: Option<PathBuf>,

    /// IP camera address as host:port
    #[arg(long)]
    ip: Option<String>,

    /// Write the annotated video to this file instead of showing a window
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Hand landmark ONNX model
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Process without a window; a video file is written next to the input
    #[arg(long)]
    headless: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Finger Count v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).unwrap_or_else(|e| {
                warn!("Failed to load config file: {e}. Using defaults.");
                Config::default()
            })
        }
        None => Config::default(),
    };
    if let Some(model) = args.model {
        config.detector.model = model;
    }
    config.validate().context("Invalid configuration")?;

    let source = if let Some(path) = &args.video {
        VideoSource::File(path.clone())
    } else if let Some(address) = &args.ip {
        VideoSource::ip_camera(address)
    } else {
        VideoSource::Camera(args.cam)
    };

    let output = match (args.output, &args.video) {
        (Some(path), _) => Some(path),
        (None, Some(video)) if args.headless => Some(default_output_path(video)),
        (None, _) if args.headless => bail!("--headless needs --output or --video"),
        (None, _) => None,
    };

    let mut driver = PipelineDriver::new(config.pipeline_config(source, output.clone()));

    let Some(output) = output else {
        let mut app = HandTrackingApp::new(driver, config.display);
        app.run()?;
        return Ok(());
    };

    // Let Ctrl-C finish the file cleanly instead of killing the encoder
    let cancel = driver.cancel_handle();
    ctrlc::set_handler(move || cancel.cancel()).context("Failed to set Ctrl-C handler")?;

    driver.start()?;
    let summary = app::follow_run(&mut driver);
    if let Some((kind, message)) = summary.error {
        bail!("{kind:?}: {message}");
    }
    if summary.cancelled {
        info!("Interrupted, kept {} frame(s) in {}", summary.frames, output.display());
    } else {
        info!("Processed {} frame(s) into {}", summary.frames, output.display());
    }

    Ok(())
}
