//! Pixel-level primitives for the color segmentation pipeline.
//!
//! Everything operates on `image` buffers: RGB frames in, a binary
//! `GrayImage` mask in the middle, contour point lists out.

use image::{GrayImage, Luma, Rgb, RgbImage};

// ---------------------------------------------------------------------------
// Smoothing
// ---------------------------------------------------------------------------

fn gaussian_kernel_1d(sigma: f32, size: usize) -> Vec<f32> {
    let half = (size / 2) as i32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|i| (-(i * i) as f32 / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);
    kernel
}

/// Separable Gaussian blur over all three channels, clamped borders.
pub fn gaussian_blur(src: &RgbImage, sigma: f32, size: usize) -> RgbImage {
    let kernel = gaussian_kernel_1d(sigma, size);
    let half = (size / 2) as i32;
    let (w, h) = src.dimensions();

    // Horizontal pass into an f32 buffer, vertical pass back to u8.
    let mut tmp = vec![0f32; (w * h * 3) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0f32; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x as i32 + k as i32 - half).clamp(0, w as i32 - 1) as u32;
                let px = src.get_pixel(sx, y).0;
                for c in 0..3 {
                    acc[c] += px[c] as f32 * weight;
                }
            }
            let base = ((y * w + x) * 3) as usize;
            tmp[base..base + 3].copy_from_slice(&acc);
        }
    }

    let mut out = RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0f32; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y as i32 + k as i32 - half).clamp(0, h as i32 - 1) as u32;
                let base = ((sy * w + x) * 3) as usize;
                for c in 0..3 {
                    acc[c] += tmp[base + c] * weight;
                }
            }
            out.put_pixel(
                x,
                y,
                Rgb([
                    acc[0].round().clamp(0.0, 255.0) as u8,
                    acc[1].round().clamp(0.0, 255.0) as u8,
                    acc[2].round().clamp(0.0, 255.0) as u8,
                ]),
            );
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Color space + threshold
// ---------------------------------------------------------------------------

/// RGB to HSV with hue in 0-179 and saturation/value in 0-255, so published
/// HSV picker values carry over unchanged.
pub fn rgb_to_hsv(src: &RgbImage) -> RgbImage {
    let mut out = RgbImage::new(src.width(), src.height());
    for (x, y, px) in src.enumerate_pixels() {
        let [r, g, b] = px.0;
        out.put_pixel(x, y, Rgb(pixel_to_hsv(r, g, b)));
    }
    out
}

fn pixel_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let rf = r as f32 / 255.0;
    let gf = g as f32 / 255.0;
    let bf = b as f32 / 255.0;
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let value = max;
    let saturation = if max > 0.0 { delta / max } else { 0.0 };
    let hue_deg = if delta <= f32::EPSILON {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        60.0 * (bf - rf) / delta + 120.0
    } else {
        60.0 * (rf - gf) / delta + 240.0
    };
    let hue_deg = if hue_deg < 0.0 { hue_deg + 360.0 } else { hue_deg };

    [
        (hue_deg / 2.0).round().min(179.0) as u8,
        (saturation * 255.0).round() as u8,
        (value * 255.0).round() as u8,
    ]
}

/// Binary mask: 255 where every channel lies in [lower, upper] inclusive.
pub fn in_range(hsv: &RgbImage, lower: [u8; 3], upper: [u8; 3]) -> GrayImage {
    let mut mask = GrayImage::new(hsv.width(), hsv.height());
    for (x, y, px) in hsv.enumerate_pixels() {
        let inside = (0..3).all(|c| px.0[c] >= lower[c] && px.0[c] <= upper[c]);
        mask.put_pixel(x, y, Luma([if inside { 255 } else { 0 }]));
    }
    mask
}

// ---------------------------------------------------------------------------
// Morphology (3x3 rectangular kernel, binary masks)
// ---------------------------------------------------------------------------

fn morph_pass(mask: &GrayImage, erode_pass: bool) -> GrayImage {
    let w = mask.width() as i32;
    let h = mask.height() as i32;
    let data = mask.as_raw();
    let mut out = GrayImage::new(mask.width(), mask.height());

    for y in 0..h {
        for x in 0..w {
            let mut val = if erode_pass { 255u8 } else { 0u8 };
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let nx = x + dx;
                    let ny = y + dy;
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    let v = data[(ny * w + nx) as usize];
                    val = if erode_pass { val.min(v) } else { val.max(v) };
                }
            }
            out.put_pixel(x as u32, y as u32, Luma([val]));
        }
    }
    out
}

pub fn erode(mask: &GrayImage, iterations: u32) -> GrayImage {
    let mut current = mask.clone();
    for _ in 0..iterations {
        current = morph_pass(&current, true);
    }
    current
}

pub fn dilate(mask: &GrayImage, iterations: u32) -> GrayImage {
    let mut current = mask.clone();
    for _ in 0..iterations {
        current = morph_pass(&current, false);
    }
    current
}

// ---------------------------------------------------------------------------
// Contours
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<(i32, i32)>,
}

const DIRS_8: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

fn foreground(data: &[u8], w: i32, h: i32, x: i32, y: i32) -> bool {
    x >= 0 && y >= 0 && x < w && y < h && data[(y * w + x) as usize] > 0
}

fn on_boundary(data: &[u8], w: i32, h: i32, x: i32, y: i32) -> bool {
    foreground(data, w, h, x, y)
        && DIRS_8
            .iter()
            .any(|&(dx, dy)| !foreground(data, w, h, x + dx, y + dy))
}

fn trace_from(data: &[u8], w: i32, h: i32, sx: i32, sy: i32) -> Vec<(i32, i32)> {
    let mut points = Vec::new();
    let start = (sx, sy);
    let mut current = start;
    let mut backtrack = 4usize; // entered as if coming from the west
    let start_backtrack = backtrack;
    let max_steps = (w as usize * h as usize).saturating_mul(8).max(32);

    for _ in 0..max_steps {
        points.push(current);

        let mut next = None;
        for step in 1..=8 {
            let dir = (backtrack + step) % 8;
            let nx = current.0 + DIRS_8[dir].0;
            let ny = current.1 + DIRS_8[dir].1;
            if foreground(data, w, h, nx, ny) {
                backtrack = (dir + 6) % 8;
                next = Some((nx, ny));
                break;
            }
        }

        let Some(next) = next else { break };
        if next == start && backtrack == start_backtrack && points.len() > 1 {
            break;
        }
        current = next;
    }

    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// External contours of a binary mask (non-zero pixels are foreground),
/// in scan order of their topmost-leftmost boundary pixel.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour> {
    let w = mask.width() as i32;
    let h = mask.height() as i32;
    let data = mask.as_raw();
    let mut visited = vec![false; (w * h) as usize];
    let mut contours = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            if visited[idx] || !on_boundary(data, w, h, x, y) {
                continue;
            }
            let points = trace_from(data, w, h, x, y);
            if points.len() >= 3 {
                for &(px, py) in &points {
                    visited[(py * w + px) as usize] = true;
                }
                contours.push(Contour { points });
            } else {
                visited[idx] = true;
            }
        }
    }
    contours
}

/// Enclosed polygon area via the shoelace formula.
pub fn contour_area(contour: &Contour) -> f64 {
    let n = contour.points.len();
    if n < 3 {
        return 0.0;
    }
    let mut doubled = 0.0f64;
    for i in 0..n {
        let (x0, y0) = contour.points[i];
        let (x1, y1) = contour.points[(i + 1) % n];
        doubled += x0 as f64 * y1 as f64 - x1 as f64 * y0 as f64;
    }
    doubled.abs() * 0.5
}

// ---------------------------------------------------------------------------
// Minimum enclosing circle (incremental Welzl, deterministic point order)
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
}

impl Circle {
    fn contains(&self, p: (f64, f64)) -> bool {
        let dx = p.0 - self.cx;
        let dy = p.1 - self.cy;
        dx.hypot(dy) <= self.radius * (1.0 + 1e-12) + 1e-12
    }
}

pub fn min_enclosing_circle(points: &[(i32, i32)]) -> Option<Circle> {
    if points.is_empty() {
        return None;
    }
    let pts: Vec<(f64, f64)> = points
        .iter()
        .map(|&(x, y)| (x as f64, y as f64))
        .collect();

    let mut circle = Circle {
        cx: pts[0].0,
        cy: pts[0].1,
        radius: 0.0,
    };
    for i in 1..pts.len() {
        if !circle.contains(pts[i]) {
            circle = circle_with_point(&pts[..=i], pts[i]);
        }
    }
    Some(circle)
}

fn circle_with_point(pts: &[(f64, f64)], p: (f64, f64)) -> Circle {
    let mut circle = Circle {
        cx: p.0,
        cy: p.1,
        radius: 0.0,
    };
    for (i, &q) in pts.iter().enumerate() {
        if circle.contains(q) {
            continue;
        }
        circle = if circle.radius == 0.0 {
            circle_from_diameter(p, q)
        } else {
            circle_with_two_points(&pts[..=i], p, q)
        };
    }
    circle
}

fn circle_with_two_points(pts: &[(f64, f64)], p: (f64, f64), q: (f64, f64)) -> Circle {
    let base = circle_from_diameter(p, q);
    let mut left: Option<Circle> = None;
    let mut right: Option<Circle> = None;

    for &r in pts {
        if base.contains(r) {
            continue;
        }
        let side = cross(p, q, r);
        let Some(c) = circumcircle(p, q, r) else {
            continue;
        };
        let center_side = cross(p, q, (c.cx, c.cy));
        if side > 0.0 {
            if left.map_or(true, |l| center_side > cross(p, q, (l.cx, l.cy))) {
                left = Some(c);
            }
        } else if side < 0.0 && right.map_or(true, |r_| center_side < cross(p, q, (r_.cx, r_.cy)))
        {
            right = Some(c);
        }
    }

    match (left, right) {
        (None, None) => base,
        (Some(l), None) => l,
        (None, Some(r)) => r,
        (Some(l), Some(r)) => {
            if l.radius <= r.radius {
                l
            } else {
                r
            }
        }
    }
}

fn cross(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn circle_from_diameter(a: (f64, f64), b: (f64, f64)) -> Circle {
    let cx = (a.0 + b.0) / 2.0;
    let cy = (a.1 + b.1) / 2.0;
    let ra = (a.0 - cx).hypot(a.1 - cy);
    let rb = (b.0 - cx).hypot(b.1 - cy);
    Circle {
        cx,
        cy,
        radius: ra.max(rb),
    }
}

fn circumcircle(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Option<Circle> {
    // Shift to the bounding-box midpoint for numerical stability.
    let ox = (a.0.min(b.0).min(c.0) + a.0.max(b.0).max(c.0)) / 2.0;
    let oy = (a.1.min(b.1).min(c.1) + a.1.max(b.1).max(c.1)) / 2.0;
    let (ax, ay) = (a.0 - ox, a.1 - oy);
    let (bx, by) = (b.0 - ox, b.1 - oy);
    let (cx_, cy_) = (c.0 - ox, c.1 - oy);
    let d = 2.0 * (ax * (by - cy_) + bx * (cy_ - ay) + cx_ * (ay - by));
    if d == 0.0 {
        return None;
    }
    let x = ((ax * ax + ay * ay) * (by - cy_)
        + (bx * bx + by * by) * (cy_ - ay)
        + (cx_ * cx_ + cy_ * cy_) * (ay - by))
        / d;
    let y = ((ax * ax + ay * ay) * (cx_ - bx)
        + (bx * bx + by * by) * (ax - cx_)
        + (cx_ * cx_ + cy_ * cy_) * (bx - ax))
        / d;
    let center = (ox + x, oy + y);
    let r = [(a, center), (b, center), (c, center)]
        .iter()
        .map(|((px, py), (qx, qy))| (px - qx).hypot(py - qy))
        .fold(0.0f64, f64::max);
    Some(Circle {
        cx: center.0,
        cy: center.1,
        radius: r,
    })
}

// ---------------------------------------------------------------------------
// Annotation primitives (display side effect only)
// ---------------------------------------------------------------------------

pub fn draw_circle_outline(frame: &mut RgbImage, cx: f64, cy: f64, radius: f64, color: Rgb<u8>) {
    let w = frame.width() as i32;
    let h = frame.height() as i32;
    let r_out = radius + 1.0;
    let r_in = (radius - 1.0).max(0.0);
    let x0 = ((cx - r_out).floor() as i32).max(0);
    let x1 = ((cx + r_out).ceil() as i32).min(w - 1);
    let y0 = ((cy - r_out).floor() as i32).max(0);
    let y1 = ((cy + r_out).ceil() as i32).min(h - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dist = (x as f64 - cx).hypot(y as f64 - cy);
            if dist >= r_in && dist <= r_out {
                frame.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

pub fn draw_filled_circle(frame: &mut RgbImage, cx: f64, cy: f64, radius: f64, color: Rgb<u8>) {
    let w = frame.width() as i32;
    let h = frame.height() as i32;
    let x0 = ((cx - radius).floor() as i32).max(0);
    let x1 = ((cx + radius).ceil() as i32).min(w - 1);
    let y0 = ((cy - radius).floor() as i32).max(0);
    let y1 = ((cy + radius).ceil() as i32).min(h - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            if (x as f64 - cx).hypot(y as f64 - cy) <= radius {
                frame.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_hsv_primary_colors() {
        assert_eq!(pixel_to_hsv(255, 0, 0), [0, 255, 255]);
        assert_eq!(pixel_to_hsv(0, 255, 0), [60, 255, 255]);
        assert_eq!(pixel_to_hsv(0, 0, 255), [120, 255, 255]);
        assert_eq!(pixel_to_hsv(0, 0, 0), [0, 0, 0]);
        assert_eq!(pixel_to_hsv(255, 255, 255), [0, 0, 255]);
    }

    #[test]
    fn test_in_range_inclusive_bounds() {
        let mut hsv = RgbImage::new(2, 1);
        hsv.put_pixel(0, 0, Rgb([10, 255, 255]));
        hsv.put_pixel(1, 0, Rgb([11, 255, 255]));
        let mask = in_range(&hsv, [0, 150, 150], [10, 255, 255]);
        assert_eq!(mask.get_pixel(0, 0)[0], 255);
        assert_eq!(mask.get_pixel(1, 0)[0], 0);
    }

    #[test]
    fn test_erode_then_dilate_removes_speckle() {
        let mut mask = disk_mask(64, 64, 32, 32, 10);
        // Single-pixel speck away from the blob.
        mask.put_pixel(5, 5, Luma([255]));

        let cleaned = dilate(&erode(&mask, 2), 2);
        assert_eq!(cleaned.get_pixel(5, 5)[0], 0, "speck must be removed");
        assert_eq!(cleaned.get_pixel(32, 32)[0], 255, "blob must survive");
    }

    #[test]
    fn test_contour_of_rectangle() {
        let mut mask = GrayImage::new(32, 24);
        for y in 6..18 {
            for x in 8..22 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 1);
        let area = contour_area(&contours[0]);
        // Shoelace over boundary pixel centers: (w-1)*(h-1).
        assert!((area - 13.0 * 11.0).abs() < 1.0, "area = {}", area);
    }

    #[test]
    fn test_min_enclosing_circle_of_disk() {
        let mask = disk_mask(64, 64, 30, 28, 10);
        let contours = find_external_contours(&mask);
        let circle = min_enclosing_circle(&contours[0].points).unwrap();
        assert!((circle.cx - 30.0).abs() < 0.5);
        assert!((circle.cy - 28.0).abs() < 0.5);
        assert!((circle.radius - 10.0).abs() < 1e-6, "r = {}", circle.radius);
    }

    #[test]
    fn test_min_enclosing_circle_two_points() {
        let circle = min_enclosing_circle(&[(0, 0), (6, 8)]).unwrap();
        assert!((circle.radius - 5.0).abs() < 1e-9);
        assert!((circle.cx - 3.0).abs() < 1e-9);
        assert!((circle.cy - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_gaussian_blur_preserves_flat_regions() {
        let mut img = RgbImage::new(16, 16);
        for px in img.pixels_mut() {
            *px = Rgb([200, 100, 50]);
        }
        let blurred = gaussian_blur(&img, 2.0, 11);
        assert_eq!(blurred.get_pixel(8, 8).0, [200, 100, 50]);
    }
}
