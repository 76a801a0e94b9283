//! Observation extraction: one video frame in, at most one noisy 3D point out.

pub mod ops;

use image::{GrayImage, Rgb, RgbImage};
use log::debug;

use crate::config::TrackerConfig;
use crate::types::{Detection, Observation};

/// Smoothing matching the 11x11 Gaussian of the reference pipeline.
const BLUR_SIGMA: f32 = 2.0;
const BLUR_KERNEL: usize = 11;
/// Erosion then dilation passes applied to the color mask. Noise-reduction
/// policy: drop speckle, reconnect the main blob.
const MORPH_ITERATIONS: u32 = 2;

/// Stateless per-frame extractor configured once at startup.
pub struct ObservationExtractor {
    hsv_lower: [u8; 3],
    hsv_upper: [u8; 3],
    min_radius: f64,
    depth_c1: f64,
    depth_c2: f64,
    half_width: f64,
    half_height: f64,
    /// Draw the detected circle into the frame for the display sink.
    /// Annotation never feeds back into the numeric output.
    pub annotate: bool,
}

impl ObservationExtractor {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            hsv_lower: config.hsv_lower,
            hsv_upper: config.hsv_upper,
            min_radius: config.min_radius,
            depth_c1: config.depth_c1,
            depth_c2: config.depth_c2,
            half_width: config.frame_width as f64 / 2.0,
            half_height: config.frame_height as f64 / 2.0,
            annotate: true,
        }
    }

    /// Full extraction chain: smooth, threshold in HSV, clean the mask,
    /// pick the largest blob, normalize. Returns `None` when no qualifying
    /// object is present, which is a normal per-frame outcome.
    pub fn extract(&self, frame: &mut RgbImage) -> Option<Observation> {
        let mask = self.segment(frame);
        let detection = self.locate(&mask)?;

        if self.annotate {
            ops::draw_circle_outline(
                frame,
                detection.center_x,
                detection.center_y,
                detection.radius,
                Rgb([0, 255, 255]),
            );
            ops::draw_filled_circle(
                frame,
                detection.center_x,
                detection.center_y,
                5.0,
                Rgb([255, 0, 0]),
            );
        }

        Some(self.normalize(&detection))
    }

    fn segment(&self, frame: &RgbImage) -> GrayImage {
        let blurred = ops::gaussian_blur(frame, BLUR_SIGMA, BLUR_KERNEL);
        let hsv = ops::rgb_to_hsv(&blurred);
        let mask = ops::in_range(&hsv, self.hsv_lower, self.hsv_upper);
        let eroded = ops::erode(&mask, MORPH_ITERATIONS);
        ops::dilate(&eroded, MORPH_ITERATIONS)
    }

    /// Largest-contour selection and the size gate. Blobs whose enclosing
    /// circle is at or below `min_radius` are treated as color noise.
    pub fn locate(&self, mask: &GrayImage) -> Option<Detection> {
        let contours = ops::find_external_contours(mask);
        let (mut best, rest) = contours.split_first()?;
        let mut best_area = ops::contour_area(best);
        for contour in rest {
            let area = ops::contour_area(contour);
            // Strict comparison: the first contour encountered wins ties.
            if area > best_area {
                best = contour;
                best_area = area;
            }
        }

        let circle = ops::min_enclosing_circle(&best.points)?;
        if circle.radius <= self.min_radius + 1e-6 {
            debug!(
                "blob radius {:.2} at or below threshold {:.2}, ignoring",
                circle.radius, self.min_radius
            );
            return None;
        }

        Some(Detection {
            center_x: circle.cx,
            center_y: circle.cy,
            radius: circle.radius,
        })
    }

    /// Map a pixel-space detection to the normalized observation frame.
    /// x/y land nominally in [-1, 1] but are not clamped; z is the
    /// radius-derived relative depth.
    pub fn normalize(&self, detection: &Detection) -> Observation {
        Observation {
            x: (detection.center_x - self.half_width) / self.half_width,
            y: (self.half_height - detection.center_y) / self.half_height,
            z: (self.depth_c1 / detection.radius) / self.depth_c2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn extractor() -> ObservationExtractor {
        ObservationExtractor::new(&TrackerConfig::default())
    }

    fn disk_mask(w: u32, h: u32, cx: i32, cy: i32, r: i32) -> GrayImage {
        let mut mask = GrayImage::new(w, h);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let dx = x - cx;
                let dy = y - cy;
                if dx * dx + dy * dy <= r * r {
                    mask.put_pixel(x as u32, y as u32, Luma([255]));
                }
            }
        }
        mask
    }

    #[test]
    fn test_radius_at_threshold_rejected() {
        let mask = disk_mask(640, 480, 320, 240, 10);
        assert!(extractor().locate(&mask).is_none());
    }

    #[test]
    fn test_radius_above_threshold_accepted() {
        let mask = disk_mask(640, 480, 384, 192, 11);
        let detection = extractor().locate(&mask).expect("blob must be detected");
        assert!((detection.center_x - 384.0).abs() < 0.5);
        assert!((detection.center_y - 192.0).abs() < 0.5);

        let obs = extractor().normalize(&detection);
        assert!((obs.x - (384.0 - 320.0) / 320.0).abs() < 2e-3);
        assert!((obs.y - (240.0 - 192.0) / 240.0).abs() < 3e-3);
        assert!(obs.z > 0.0);
    }

    #[test]
    fn test_empty_mask_no_detection() {
        let mask = GrayImage::new(640, 480);
        assert!(extractor().locate(&mask).is_none());
    }

    #[test]
    fn test_largest_blob_wins() {
        let mut mask = disk_mask(640, 480, 100, 100, 15);
        let big = disk_mask(640, 480, 400, 300, 40);
        for (x, y, px) in big.enumerate_pixels() {
            if px[0] > 0 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let detection = extractor().locate(&mask).unwrap();
        assert!((detection.center_x - 400.0).abs() < 1.0);
        assert!((detection.center_y - 300.0).abs() < 1.0);
    }

    #[test]
    fn test_extract_end_to_end_red_blob() {
        let config = TrackerConfig::default();
        let extractor = ObservationExtractor::new(&config);
        let mut frame = RgbImage::new(640, 480);
        ops::draw_filled_circle(&mut frame, 384.0, 192.0, 40.0, Rgb([255, 0, 0]));

        let obs = extractor
            .extract(&mut frame)
            .expect("red blob must be detected");
        // Blur and morphology nibble at the blob edge; the center must hold.
        assert!((obs.x - 0.2).abs() < 0.02, "x = {}", obs.x);
        assert!((obs.y - 0.2).abs() < 0.02, "y = {}", obs.y);
        // z = (3000 / r) / 100 with r near 40.
        assert!(obs.z > 0.6 && obs.z < 0.9, "z = {}", obs.z);
    }

    #[test]
    fn test_annotation_does_not_change_output() {
        let config = TrackerConfig::default();
        let mut annotated = ObservationExtractor::new(&config);
        annotated.annotate = true;
        let mut plain = ObservationExtractor::new(&config);
        plain.annotate = false;

        let mut frame_a = RgbImage::new(640, 480);
        ops::draw_filled_circle(&mut frame_a, 200.0, 150.0, 30.0, Rgb([255, 0, 0]));
        let mut frame_b = frame_a.clone();

        let a = annotated.extract(&mut frame_a);
        let b = plain.extract(&mut frame_b);
        assert_eq!(a, b);
        assert_ne!(frame_a, frame_b, "annotation must touch pixels");
    }
}
