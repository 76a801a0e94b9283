//! Frame acquisition seam.
//!
//! The live pipeline only needs `read() -> frame | end-of-stream` from its
//! video source, so the source is a trait and the capture loop runs on a
//! background task feeding a bounded channel. At most one frame is pending;
//! newer frames are dropped while the consumer is busy, so the consumer
//! always sees frames in capture order.

use std::time::Duration;

use image::{Rgb, RgbImage};
use tokio::sync::mpsc::{self, error::TrySendError, Receiver};
use tokio::time::interval;

use crate::vision::ops;

pub trait FrameSource: Send {
    /// Next frame, or `None` on end of stream / device failure.
    fn read(&mut self) -> Option<RgbImage>;
}

/// Stand-in for camera hardware: renders a saturated red blob orbiting the
/// frame center with a slowly breathing radius, on a dark background.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frame_index: u64,
    /// Frames to emit before reporting end of stream (0 = unbounded).
    max_frames: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, max_frames: u64) -> Self {
        Self {
            width,
            height,
            frame_index: 0,
            max_frames,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn read(&mut self) -> Option<RgbImage> {
        if self.max_frames > 0 && self.frame_index >= self.max_frames {
            return None;
        }
        let t = self.frame_index as f64 * 0.05;
        self.frame_index += 1;

        let mut frame = RgbImage::from_pixel(self.width, self.height, Rgb([18, 18, 18]));
        let cx = self.width as f64 / 2.0 + 0.35 * self.width as f64 / 2.0 * t.cos();
        let cy = self.height as f64 / 2.0 + 0.35 * self.height as f64 / 2.0 * t.sin();
        let radius = 22.0 + 8.0 * (t * 0.4).sin();
        ops::draw_filled_circle(&mut frame, cx, cy, radius, Rgb([235, 25, 20]));
        Some(frame)
    }
}

/// Spawn the capture task. The returned channel closes when the source
/// reports end of stream, which is the loop's termination signal.
pub fn spawn_capture(mut source: Box<dyn FrameSource>, fps: u64) -> Receiver<RgbImage> {
    let (tx, rx) = mpsc::channel::<RgbImage>(1);

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_millis((1000 / fps.max(1)).max(1)));
        let mut captured = 0u64;
        let mut dropped = 0u64;

        loop {
            ticker.tick().await;
            let Some(frame) = source.read() else {
                eprintln!(
                    "[capture] stream ended after {} frames ({} dropped)",
                    captured, dropped
                );
                break;
            };
            match tx.try_send(frame) {
                Ok(()) => captured += 1,
                Err(TrySendError::Full(_)) => {
                    // Consumer is mid-iteration; drop the newer frame.
                    dropped += 1;
                }
                Err(TrySendError::Closed(_)) => break,
            }
        }
    });

    rx
}
