use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::Parser;

use eyeline_core::detection::infrastructure::backend_providers::default_detector;
use eyeline_core::eye_contact::domain::eye_contact_settings::Strictness;
use eyeline_core::overlay::domain::overlay_box::build_overlay;
use eyeline_core::overlay::infrastructure::frame_painter::draw_overlay;
use eyeline_core::pipeline::frame_scheduler::{FrameScheduler, SessionCallbacks, SessionHandle};
use eyeline_core::pipeline::infrastructure::interval_ticker::IntervalTicker;
use eyeline_core::pipeline::pipeline_logger::SessionReportLogger;
use eyeline_core::pipeline::ticker::{SimulatedTicker, Ticker};
use eyeline_core::shared::constants::DEFAULT_TICK_MS;
use eyeline_core::shared::detected_face::FrameDetectionResult;
use eyeline_core::shared::frame::Frame;
use eyeline_core::shared::session_config::{ExecutorMode, SessionConfig};
use eyeline_core::video::domain::snapshot_writer::SnapshotWriter;
use eyeline_core::video::domain::video_source::VideoSource;
use eyeline_core::video::infrastructure::ffmpeg_file_source::FfmpegFileSource;
use eyeline_core::video::infrastructure::image_sequence_source::ImageSequenceSource;
use eyeline_core::video::infrastructure::png_snapshot_writer::PngSnapshotWriter;

/// Replays a recorded practice session through the eye-contact pipeline.
#[derive(Parser)]
#[command(name = "eyeline")]
struct Cli {
    /// Input video file, or a directory of still images.
    input: PathBuf,

    /// JSON session config. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum absolute yaw in degrees for head-pose eye contact.
    #[arg(long)]
    yaw_threshold: Option<f64>,

    /// Maximum absolute pitch in degrees for head-pose eye contact.
    #[arg(long)]
    pitch_threshold: Option<f64>,

    /// Drop detections below this confidence (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Maximum faces analyzed per frame.
    #[arg(long)]
    max_faces: Option<usize>,

    /// Minimum milliseconds between analyzed frames.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Milliseconds before a threaded detection counts as "no faces".
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Rolling window length in frames.
    #[arg(long)]
    history: Option<usize>,

    /// Directory searched first for ONNX face models.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Run detection on a worker thread.
    #[arg(long)]
    threaded: bool,

    /// Require head pose and position to agree.
    #[arg(long)]
    strict: bool,

    /// Save every analyzed frame with face boxes drawn, as PNG.
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// Pace ticks on the wall clock instead of simulated time.
    #[arg(long)]
    realtime: bool,

    /// Playback rate for image directories.
    #[arg(long, default_value = "10")]
    fps: f64,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let config = build_config(&cli)?;

    let source = open_source(&cli.input, cli.fps)?;
    let detector = default_detector(config.model_dir.clone());
    let callbacks = build_callbacks(cli.overlay_dir.as_deref())?;

    let mut scheduler = FrameScheduler::start(
        &config,
        Some(source),
        detector,
        callbacks,
        SessionHandle::default(),
    )?
    .with_logger(Box::new(SessionReportLogger::default()));

    let tick = Duration::from_millis(DEFAULT_TICK_MS);
    let mut ticker: Box<dyn Ticker> = if cli.realtime {
        Box::new(IntervalTicker::new(tick))
    } else {
        Box::new(SimulatedTicker::new(tick))
    };
    let summary = scheduler.run(ticker.as_mut());

    let stats = scheduler.stats();
    println!("Frames analyzed:        {}", stats.total_frames_processed);
    println!("Eye contact frames:     {}", stats.eye_contact_frames);
    println!(
        "Eye contact (recent):   {:.1}%",
        stats.eye_contact_percentage
    );
    println!(
        "Eye contact (session):  {:.1}%",
        scheduler.aggregator().lifetime_percentage()
    );
    println!(
        "Ticks: {} (throttled {}, busy {}, not ready {}, timed out {})",
        summary.ticks, summary.throttled, summary.busy, summary.not_ready, summary.timed_out
    );

    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    if !(cli.fps.is_finite() && cli.fps > 0.0) {
        return Err(format!("FPS must be positive, got {}", cli.fps).into());
    }
    if let Some(dir) = &cli.model_dir {
        if !dir.is_dir() {
            return Err(format!("Model directory not found: {}", dir.display()).into());
        }
    }
    Ok(())
}

/// Config file (or defaults) with command-line overrides applied.
fn build_config(cli: &Cli) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };

    if let Some(v) = cli.yaw_threshold {
        config.yaw_threshold = v;
    }
    if let Some(v) = cli.pitch_threshold {
        config.pitch_threshold = v;
    }
    if let Some(v) = cli.confidence {
        config.confidence_threshold = v;
    }
    if let Some(v) = cli.max_faces {
        config.max_detected_faces = v;
    }
    if let Some(v) = cli.interval_ms {
        config.process_interval_ms = v;
    }
    if let Some(v) = cli.timeout_ms {
        config.detect_timeout_ms = v;
    }
    if let Some(v) = cli.history {
        config.history_capacity = v;
    }
    if cli.model_dir.is_some() {
        config.model_dir = cli.model_dir.clone();
    }
    if cli.threaded {
        config.executor = ExecutorMode::Threaded;
    }
    if cli.strict {
        config.strictness = Strictness::Strict;
    }

    config.validate()?;
    Ok(config)
}

fn open_source(input: &Path, fps: f64) -> Result<Box<dyn VideoSource>, Box<dyn std::error::Error>> {
    if input.is_dir() {
        Ok(Box::new(ImageSequenceSource::open(input, fps)?))
    } else {
        Ok(Box::new(FfmpegFileSource::open(input)?))
    }
}

fn build_callbacks(
    overlay_dir: Option<&Path>,
) -> Result<SessionCallbacks, Box<dyn std::error::Error>> {
    let mut callbacks = SessionCallbacks {
        on_eye_contact_change: Some(Box::new(|eye_contact: bool| {
            if eye_contact {
                log::info!("Eye contact established");
            } else {
                log::info!("Eye contact lost");
            }
        })),
        ..Default::default()
    };

    if let Some(dir) = overlay_dir {
        let mut writer = PngSnapshotWriter::new(dir)?;
        let save = move |frame: &Frame, result: &FrameDetectionResult| {
            let mut annotated = frame.clone();
            let size = (frame.width(), frame.height());
            draw_overlay(&mut annotated, &build_overlay(&result.faces, size, size));
            if let Err(e) = writer.write(&annotated) {
                log::warn!("Could not save overlay for frame {}: {e}", frame.index());
            }
        };
        callbacks.on_frame_analyzed = Some(Box::new(save));
    }

    Ok(callbacks)
}
