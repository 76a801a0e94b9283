use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode};
use crossterm::terminal;

use color_tracker_rs::capture::{self, SyntheticSource};
use color_tracker_rs::config::TrackerConfig;
use color_tracker_rs::filters::FixedGainFilter;
use color_tracker_rs::history::TrackHistory;
use color_tracker_rs::rerun_logger::TrajectoryLogger;
use color_tracker_rs::session::{FrameRecord, SessionRecorder, SessionStats};
use color_tracker_rs::vision::ObservationExtractor;

#[derive(Parser, Debug)]
#[command(name = "color_tracker")]
#[command(about = "Color-blob tracker driving a fixed-gain software Kalman filter", long_about = None)]
struct Args {
    /// Path to a JSON tracker config (built-in defaults when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for the rerun recording and session logs
    #[arg(long, default_value = "tracker_sessions")]
    output_dir: String,

    /// Stop after this many frames (0 = run until quit)
    #[arg(long, default_value = "0")]
    max_frames: u64,

    /// Capture rate of the synthetic source
    #[arg(long, default_value = "30")]
    fps: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Configuration problems must abort before any window or recording opens.
    let config = match args.config.as_ref() {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    config.validate()?;

    println!("[{}] Color Tracker Starting", ts_now());
    println!("  Gain: {:?}", config.gain);
    println!("  HSV range: {:?} - {:?}", config.hsv_lower, config.hsv_upper);
    println!("  Frame: {}x{}", config.frame_width, config.frame_height);
    println!("  Output Dir: {}", args.output_dir);

    fs::create_dir_all(&args.output_dir)?;
    let rrd_path = format!("{}/tracker_{}.rrd", args.output_dir, ts_now_clean());
    let logger = TrajectoryLogger::new("color_tracker", &rrd_path)?;

    let extractor = ObservationExtractor::new(&config);
    let mut filter = FixedGainFilter::new(config.gain);
    let mut history = TrackHistory::new(config.history_len);
    let mut recorder = SessionRecorder::new(&args.output_dir);

    let source = SyntheticSource::new(config.frame_width, config.frame_height, args.max_frames);
    let mut frames = capture::spawn_capture(Box::new(source), args.fps);

    println!("[{}] Tracking... press 'q' to quit", ts_now());

    // Raw mode lets the quit key arrive without a newline; headless runs
    // (tests, CI) simply skip key polling.
    let interactive = terminal::enable_raw_mode().is_ok();

    let start = Instant::now();
    let mut last_save = Instant::now();
    let mut frame_count = 0u64;
    let mut detections = 0u64;

    loop {
        // A closed channel means the capture task saw end of stream or a
        // device failure; both terminate the loop.
        let Some(mut frame) = frames.recv().await else {
            eprint!("[{}] Capture ended\r\n", ts_now());
            break;
        };

        let elapsed = start.elapsed().as_secs_f64();
        logger.set_time(elapsed);

        // Pure computational step: extraction, then (conditionally) the
        // filter update with its matching history entries. No await sits
        // between the update and the appends.
        match extractor.extract(&mut frame) {
            Some(obs) => {
                let estimate = filter.step(&obs);
                history.push_observation(obs.as_array());
                history.push_estimate([estimate.x, estimate.y, estimate.z]);
                logger.log_estimate(&estimate);
                detections += 1;
                recorder.push(FrameRecord {
                    timestamp: elapsed,
                    observation: Some(obs),
                    estimate: Some((estimate.x, estimate.y, estimate.z)),
                });
            }
            None => {
                log::debug!("no detection in frame {}", frame_count);
                recorder.push(FrameRecord {
                    timestamp: elapsed,
                    observation: None,
                    estimate: None,
                });
            }
        }

        logger.log_frame(&frame);
        logger.log_history(&history);
        frame_count += 1;

        if frame_count % 100 == 0 {
            eprint!(
                "[tracker] {} frames, {} detections\r\n",
                frame_count, detections
            );
        }

        // Auto-save every 15 seconds
        if last_save.elapsed().as_secs() >= 15 {
            let path = recorder.save(SessionStats {
                total_frames: frame_count as usize,
                detections,
                filter_steps: filter.steps(),
            })?;
            eprint!(
                "[tracker] auto-saved {} records to {}\r\n",
                recorder.len(),
                path.display()
            );
            last_save = Instant::now();
        }

        if interactive && quit_requested()? {
            eprint!("[{}] Quit requested\r\n", ts_now());
            break;
        }
    }

    if interactive {
        terminal::disable_raw_mode()?;
    }

    let stats = SessionStats {
        total_frames: frame_count as usize,
        detections,
        filter_steps: filter.steps(),
    };
    let session_path = recorder.save(stats)?;

    let final_state = filter.get_state();
    println!("\n=== Final Stats ===");
    println!("Frames: {}", frame_count);
    println!("Detections: {}", detections);
    println!(
        "Estimate: ({:.4}, {:.4}, {:.4})",
        final_state.estimate.0, final_state.estimate.1, final_state.estimate.2
    );
    println!("Session log: {}", session_path.display());
    println!("Recording: {}", rrd_path);

    Ok(())
}

/// Drain pending key events; 'q' or Esc requests shutdown.
fn quit_requested() -> Result<bool> {
    while event::poll(Duration::from_millis(0))? {
        if let Event::Key(key) = event::read()? {
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}

fn ts_now_clean() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}
