use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Static calibration input for the live pipeline.
///
/// The gain and HSV range come from an offline calibration step (see
/// `generate_data`); the tracker never recomputes them at runtime.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Per-axis blending gain, each in [0, 1].
    pub gain: [f64; 3],
    /// Inclusive lower HSV bound (H 0-179, S/V 0-255, OpenCV convention).
    pub hsv_lower: [u8; 3],
    /// Inclusive upper HSV bound.
    pub hsv_upper: [u8; 3],
    /// Blobs with an enclosing-circle radius at or below this are ignored.
    pub min_radius: f64,
    /// Depth formula numerator: z = (depth_c1 / radius) / depth_c2.
    /// Tuned per camera/object; the magnitude is relative only.
    pub depth_c1: f64,
    /// Depth formula divisor.
    pub depth_c2: f64,
    /// Number of recent points kept for the live plot.
    pub history_len: usize,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            gain: [0.137, 0.137, 0.137],
            hsv_lower: [0, 150, 150],
            hsv_upper: [10, 255, 255],
            min_radius: 10.0,
            depth_c1: 3000.0,
            depth_c2: 100.0,
            history_len: 100,
            frame_width: 640,
            frame_height: 480,
        }
    }
}

impl TrackerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range calibration values before anything opens.
    pub fn validate(&self) -> Result<()> {
        for (axis, g) in ["x", "y", "z"].iter().zip(self.gain.iter()) {
            if !(0.0..=1.0).contains(g) || !g.is_finite() {
                bail!("gain.{} = {} out of range [0, 1]", axis, g);
            }
        }
        if self.hsv_lower[0] > 179 || self.hsv_upper[0] > 179 {
            bail!(
                "hue bounds ({}, {}) out of range [0, 179]",
                self.hsv_lower[0],
                self.hsv_upper[0]
            );
        }
        for ch in 0..3 {
            if self.hsv_lower[ch] > self.hsv_upper[ch] {
                bail!(
                    "hsv_lower[{}] = {} exceeds hsv_upper[{}] = {}",
                    ch,
                    self.hsv_lower[ch],
                    ch,
                    self.hsv_upper[ch]
                );
            }
        }
        if !self.min_radius.is_finite() || self.min_radius <= 0.0 {
            bail!("min_radius = {} must be positive", self.min_radius);
        }
        if self.depth_c1 <= 0.0 || self.depth_c2 <= 0.0 {
            bail!(
                "depth constants ({}, {}) must be positive",
                self.depth_c1,
                self.depth_c2
            );
        }
        if self.history_len < 2 {
            bail!("history_len = {} too small to draw a line", self.history_len);
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            bail!(
                "frame size {}x{} is degenerate",
                self.frame_width,
                self.frame_height
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrackerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_gain_above_one() {
        let mut config = TrackerConfig::default();
        config.gain[1] = 1.5;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("gain.y"), "unexpected message: {}", err);
    }

    #[test]
    fn test_rejects_negative_gain() {
        let mut config = TrackerConfig::default();
        config.gain[0] = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_hsv_bounds() {
        let mut config = TrackerConfig::default();
        config.hsv_lower[1] = 200;
        config.hsv_upper[1] = 100;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("hsv_lower"), "unexpected message: {}", err);
    }

    #[test]
    fn test_rejects_out_of_range_hue() {
        let mut config = TrackerConfig::default();
        config.hsv_upper[0] = 200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_min_radius() {
        let mut config = TrackerConfig::default();
        config.min_radius = 0.0;
        assert!(config.validate().is_err());
    }
}
