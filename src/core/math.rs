// Math utilities and helper functions

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in model space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a box from an origin corner and a size
    pub fn from_origin_size(origin: Vec3, size: Vec3) -> Self {
        let other = origin + size;
        Self {
            min: origin.min(other),
            max: origin.max(other),
        }
    }

    /// Move the box by `offset`
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Check whether the two boxes share a volume (touching faces do not count)
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
            && self.min.z < other.max.z
            && other.min.z < self.max.z
    }
}

/// Euclidean remainder for floats, always in `[0, period)`
pub fn wrap(value: f32, period: f32) -> f32 {
    if period <= 0.0 {
        return 0.0;
    }
    let wrapped = value.rem_euclid(period);
    // rem_euclid can round up to exactly `period` for tiny negative inputs
    if wrapped >= period {
        0.0
    } else {
        wrapped
    }
}

/// Check if two f32 values are approximately equal
pub fn approx_equal(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() < epsilon
}
