//! Live session recording: one record per frame, auto-saved as JSON so a
//! run can be replayed and compared offline.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use crate::types::Observation;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameRecord {
    pub timestamp: f64,
    /// `None` for frames with no qualifying detection.
    pub observation: Option<Observation>,
    /// Estimate after this frame's filter step; `None` when the step was
    /// skipped (no detection).
    pub estimate: Option<(f64, f64, f64)>,
}

#[derive(Serialize, Deserialize)]
pub struct SessionStats {
    pub total_frames: usize,
    pub detections: u64,
    pub filter_steps: u64,
}

#[derive(Serialize, Deserialize)]
pub struct SessionLog {
    pub records: Vec<FrameRecord>,
    pub stats: SessionStats,
}

pub struct SessionRecorder {
    records: Vec<FrameRecord>,
    output_dir: PathBuf,
}

impl SessionRecorder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            records: Vec::new(),
            output_dir: output_dir.into(),
        }
    }

    pub fn push(&mut self, record: FrameRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the session to a timestamped JSON file and return its path.
    pub fn save(&self, stats: SessionStats) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let filename = format!("session_{}.json", Utc::now().format("%Y%m%d_%H%M%S"));
        let path = self.output_dir.join(filename);
        let log = SessionLog {
            records: self.records.clone(),
            stats,
        };
        let json = serde_json::to_string_pretty(&log)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Load a recorded session, transparently handling gzip.
pub fn load_session(path: &Path) -> Result<SessionLog> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let gz = GzDecoder::new(file);
        let reader = BufReader::new(gz);
        Ok(serde_json::from_reader(reader)?)
    } else {
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
