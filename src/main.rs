//! Gaze tracking application: live face, eye and pupil tracking.

use anyhow::Result;
use clap::Parser;
use gaze_tracking::app::{AppConfig, GazeApp, GuiMode, VideoSource};
use gaze_tracking::config::Config;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long, default_value = "0")]
    cam: i32,

    /// Video file to process instead of a camera
    #[arg(short, long)]
    video: Option<String>,

    /// GUI display mode (all, main, none)
    #[arg(short, long, default_value = "all")]
    gui: String,

    /// Initial threshold for the left eye (0-255)
    #[arg(long)]
    left_threshold: Option<i32>,

    /// Initial threshold for the right eye (0-255)
    #[arg(long)]
    right_threshold: Option<i32>,

    /// Mirror the camera image horizontally
    #[arg(short, long)]
    mirror: bool,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{}", gaze_tracking::config::EXAMPLE_CONFIG);
        return Ok(());
    }

    info!("Gaze Tracking");

    let mut config = match &args.config {
        Some(config_path) => {
            info!("Loading configuration from: {}", config_path);
            Config::from_file(config_path)?
        }
        None => Config::default(),
    };

    if let Some(threshold) = args.left_threshold {
        config.tracking.left_threshold = threshold;
    }
    if let Some(threshold) = args.right_threshold {
        config.tracking.right_threshold = threshold;
    }
    if args.mirror {
        config.display.mirror = true;
    }

    let app_config = AppConfig {
        video_source: match args.video {
            Some(video_path) => VideoSource::File(video_path),
            None => VideoSource::Camera(args.cam),
        },
        gui_mode: match args.gui.as_str() {
            "main" => GuiMode::Main,
            "none" => GuiMode::None,
            _ => GuiMode::All,
        },
        max_frames: args.max_frames,
        config,
    };

    let mut app = GazeApp::new(app_config)?;
    app.run()?;

    Ok(())
}
