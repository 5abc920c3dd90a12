//! Gesture OSC - Main Entry Point
//!
//! Opens the camera, loads the landmark models and streams gesture values to
//! an OSC receiver until the camera stops or Ctrl+C is pressed.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use gesture_osc::camera::{self, CameraCapture};
use gesture_osc::ml::OnnxLandmarkDetector;
use gesture_osc::osc::OscSender;
use gesture_osc::telemetry::{init_logging, LogConfig};
use gesture_osc::{AppConfig, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "gesture-osc")]
#[command(about = "Send webcam pinch + open-mouth gestures as OSC")]
#[command(version)]
struct Args {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Camera device index
    #[arg(long)]
    camera: Option<u32>,

    /// OSC destination host
    #[arg(long)]
    host: Option<String>,

    /// OSC destination port
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory containing the ONNX landmark models
    #[arg(short, long)]
    models: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// List available cameras and exit
    #[arg(long)]
    list_cameras: bool,
}

impl Args {
    /// Load the config file (or defaults) and apply flag overrides
    fn resolve_config(&self) -> gesture_osc::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };

        if let Some(index) = self.camera {
            config.camera.index = index;
        }
        if let Some(host) = &self.host {
            config.osc.host = host.clone();
        }
        if let Some(port) = self.port {
            config.osc.port = port;
        }
        if let Some(dir) = &self.models {
            config.detector.model_dir = Some(dir.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

fn run(args: &Args) -> gesture_osc::Result<()> {
    let config = args.resolve_config()?;

    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })?;

    let sender = OscSender::new(config.osc.target()?)?;
    let detector = OnnxLandmarkDetector::new(&config.detector)?;
    let capture = CameraCapture::open(&config.camera)?;

    log::info!("Press Ctrl+C to exit");

    let mut pipeline = Pipeline::new(capture, detector, sender, config.gesture).with_shutdown(shutdown_rx);
    let reason = pipeline.run()?;
    log::info!("Exiting ({:?})", reason);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.list_cameras {
        let cameras = camera::list_cameras();
        println!("Available cameras:");
        for cam in cameras {
            println!("{:<5} {}", cam.index, cam.name);
        }
        return ExitCode::SUCCESS;
    }

    let log_config = LogConfig {
        file_path: args.log_file.clone(),
        ..LogConfig::default()
    };
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    log::info!("Gesture OSC v{}", env!("CARGO_PKG_VERSION"));

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
