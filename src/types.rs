use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// One noisy 3D measurement derived from a single video frame.
///
/// Axis order is fixed: x/y are normalized image coordinates (y inverted so
/// "up" is positive), z is the radius-derived depth estimate. Named fields
/// instead of a tuple so the axes cannot be swapped silently.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Observation {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<Vector3<f64>> for Observation {
    fn from(v: Vector3<f64>) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// A color blob located in pixel space, before normalization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
}
