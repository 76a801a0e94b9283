//! Offline comparator: reload generated trajectories (or a recorded live
//! session), re-run the fixed-gain filter over the noisy stream, and log all
//! series to a rerun recording for side-by-side inspection.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Parser;
use serde_json::json;

use color_tracker_rs::filters::FixedGainFilter;
use color_tracker_rs::rerun_logger::TrajectoryLogger;
use color_tracker_rs::session;
use color_tracker_rs::trajectory;
use color_tracker_rs::types::Observation;

#[derive(Parser, Debug)]
struct Args {
    /// Directory containing true_path.txt / drifty_motors.txt / noisy_camera.txt
    #[arg(long, conflicts_with = "session")]
    data_dir: Option<PathBuf>,

    /// Recorded live session (session_*.json[.gz])
    #[arg(long)]
    session: Option<PathBuf>,

    /// Per-axis filter gain
    #[arg(long, default_value = "0.137")]
    gain: f64,

    /// Output rerun recording path
    #[arg(long, default_value = "replay.rrd")]
    rrd: PathBuf,
}

fn rmse(pairs: &[(f64, f64)]) -> f64 {
    if pairs.is_empty() {
        return f64::INFINITY;
    }
    let sum_sq: f64 = pairs.iter().map(|(a, b)| (a - b).powi(2)).sum();
    (sum_sq / pairs.len() as f64).sqrt()
}

fn run_filter(noisy: &[[f64; 3]], gain: f64) -> Vec<[f64; 3]> {
    let mut filter = FixedGainFilter::new([gain; 3]);
    noisy
        .iter()
        .map(|p| {
            let est = filter.step(&Observation::new(p[0], p[1], p[2]));
            [est.x, est.y, est.z]
        })
        .collect()
}

fn replay_files(dir: &Path, args: &Args) -> Result<serde_json::Value> {
    let truth = trajectory::load_scaled(&dir.join("true_path.txt"))?;
    let drifty = trajectory::load_scaled(&dir.join("drifty_motors.txt"))?;
    let noisy = trajectory::load_scaled(&dir.join("noisy_camera.txt"))?;
    if truth.len() != noisy.len() {
        bail!(
            "record count mismatch: {} truth vs {} noisy",
            truth.len(),
            noisy.len()
        );
    }

    let estimates = run_filter(&noisy, args.gain);

    let logger = TrajectoryLogger::new("color_tracker_replay", &args.rrd.to_string_lossy())?;
    logger.log_series("paths/truth", &truth, (120, 220, 120));
    logger.log_series("paths/drifty", &drifty, (220, 180, 60));
    logger.log_series("paths/noisy", &noisy, (235, 60, 60));
    logger.log_series("paths/estimate", &estimates, (70, 120, 235));

    let mut axis_rmse = [0.0f64; 3];
    for axis in 0..3 {
        let pairs: Vec<(f64, f64)> = estimates
            .iter()
            .zip(truth.iter())
            .map(|(e, t)| (e[axis], t[axis]))
            .collect();
        axis_rmse[axis] = rmse(&pairs);
    }
    let noisy_pairs: Vec<(f64, f64)> = noisy
        .iter()
        .zip(truth.iter())
        .flat_map(|(n, t)| (0..3).map(move |a| (n[a], t[a])))
        .collect();
    let est_pairs: Vec<(f64, f64)> = estimates
        .iter()
        .zip(truth.iter())
        .flat_map(|(e, t)| (0..3).map(move |a| (e[a], t[a])))
        .collect();

    Ok(json!({
        "data_dir": dir.display().to_string(),
        "gain": args.gain,
        "records": noisy.len(),
        "rmse_x": axis_rmse[0],
        "rmse_y": axis_rmse[1],
        "rmse_z": axis_rmse[2],
        "rmse_noisy_vs_truth": rmse(&noisy_pairs),
        "rmse_estimate_vs_truth": rmse(&est_pairs),
    }))
}

fn replay_session(path: &Path, args: &Args) -> Result<serde_json::Value> {
    let log = session::load_session(path)?;

    // Re-run the filter over the recorded observations and check the
    // recorded estimates against the recomputed ones; any deviation means
    // the live arithmetic and this implementation have diverged.
    let mut filter = FixedGainFilter::new([args.gain; 3]);
    let mut max_deviation = 0.0f64;
    let mut compared = 0usize;

    for record in &log.records {
        let Some(obs) = record.observation.as_ref() else {
            continue;
        };
        let est = filter.step(obs);
        if let Some((rx, ry, rz)) = record.estimate {
            let dev = (est.x - rx)
                .abs()
                .max((est.y - ry).abs())
                .max((est.z - rz).abs());
            max_deviation = max_deviation.max(dev);
            compared += 1;
        }
    }

    Ok(json!({
        "session": path.display().to_string(),
        "gain": args.gain,
        "records": log.records.len(),
        "recorded_detections": log.stats.detections,
        "compared": compared,
        "max_estimate_deviation": max_deviation,
    }))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !(0.0..=1.0).contains(&args.gain) {
        bail!("gain = {} out of range [0, 1]", args.gain);
    }

    let summary = if let Some(dir) = args.data_dir.as_ref() {
        replay_files(dir, &args)?
    } else if let Some(path) = args.session.as_ref() {
        replay_session(path, &args)?
    } else {
        bail!("Provide --data-dir or --session");
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
