use anyhow::Result;
use image::RgbImage;
use nalgebra::Vector3;
use rerun::archetypes::{Image, LineStrips3D, Points3D, Scalar};
use rerun::RecordingStreamBuilder;

use crate::history::TrackHistory;

/// Rerun logger for the tracker: annotated camera frame plus the noisy and
/// filtered 3D trajectories, written to a .rrd recording for live viewing.
pub struct TrajectoryLogger {
    rec: rerun::RecordingStream,
}

impl TrajectoryLogger {
    /// Initialize a recording to file (e.g. "tracker_sessions/tracker_20260806_120000.rrd").
    pub fn new(app_id: &str, output_path: &str) -> Result<Self> {
        let rec = RecordingStreamBuilder::new(app_id.to_owned())
            .save(output_path)
            .map_err(|e| anyhow::anyhow!("Failed to create Rerun recording: {}", e))?;

        eprintln!("[RERUN] Recording initialized to: {}", output_path);

        Ok(TrajectoryLogger { rec })
    }

    /// Set the current time for all subsequent logs.
    pub fn set_time(&self, elapsed_secs: f64) {
        self.rec.set_time_seconds("stable_time", elapsed_secs);
    }

    /// Log the (possibly annotated) camera frame.
    pub fn log_frame(&self, frame: &RgbImage) {
        match Image::try_from(image::DynamicImage::ImageRgb8(frame.clone())) {
            Ok(img) => {
                let _ = self.rec.log("camera/frame", &img);
            }
            Err(e) => log::warn!("frame log failed: {}", e),
        }
    }

    /// Log both history streams. Line strips need at least two points, so
    /// short histories are skipped rather than crashing the renderer.
    pub fn log_history(&self, history: &TrackHistory) {
        let noisy: Vec<[f32; 3]> = history
            .noisy()
            .iter()
            .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
            .collect();
        if noisy.len() >= 2 {
            let _ = self.rec.log(
                "track/noisy",
                &Points3D::new(noisy)
                    .with_colors([rerun::Color::from_rgb(235, 60, 60)])
                    .with_radii([0.02]),
            );
        }

        let estimates: Vec<[f32; 3]> = history
            .estimates()
            .iter()
            .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
            .collect();
        if estimates.len() >= 2 {
            let _ = self.rec.log(
                "track/estimate",
                &LineStrips3D::new([estimates])
                    .with_colors([rerun::Color::from_rgb(70, 120, 235)])
                    .with_radii([0.01]),
            );
        }
    }

    /// Per-axis estimate channels for time-series inspection.
    pub fn log_estimate(&self, estimate: &Vector3<f64>) {
        let _ = self.rec.log("filter/estimate_x", &Scalar::new(estimate.x));
        let _ = self.rec.log("filter/estimate_y", &Scalar::new(estimate.y));
        let _ = self.rec.log("filter/estimate_z", &Scalar::new(estimate.z));
    }

    /// Log one named trajectory as a line strip (offline comparison view).
    pub fn log_series(&self, path: &str, rows: &[[f64; 3]], color: (u8, u8, u8)) {
        if rows.len() < 2 {
            return;
        }
        let points: Vec<[f32; 3]> = rows
            .iter()
            .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
            .collect();
        let _ = self.rec.log(
            path,
            &LineStrips3D::new([points]).with_colors([rerun::Color::from_rgb(
                color.0, color.1, color.2,
            )]),
        );
    }
}
