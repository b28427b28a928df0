//! Geometry primitives used by kinematic constraints.

use serde::{Deserialize, Serialize};

/// Unit quaternion (x, y, z, w).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians about the z axis.
    ///
    /// # Example
    ///
    /// ```
    /// use planforge_core::Quaternion;
    ///
    /// let q = Quaternion::from_yaw(std::f64::consts::FRAC_PI_2);
    /// let (_, _, yaw) = q.to_euler();
    /// assert!((yaw - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    /// ```
    pub fn from_yaw(angle: f64) -> Self {
        let half = angle * 0.5;
        Self::new(0.0, 0.0, half.sin(), half.cos())
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Returns the normalized quaternion, or identity for a zero quaternion.
    pub fn normalized(&self) -> Self {
        let n = self.norm();
        if n == 0.0 || !n.is_finite() {
            return Self::IDENTITY;
        }
        Self::new(self.x / n, self.y / n, self.z / n, self.w / n)
    }

    /// Chooses the representative with `w >= 0`; `q` and `-q` encode the same rotation.
    pub fn canonical(&self) -> Self {
        let q = self.normalized();
        if q.w < 0.0 {
            Self::new(-q.x, -q.y, -q.z, -q.w)
        } else {
            q
        }
    }

    pub fn conjugate(&self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Hamilton product `self * rhs`.
    pub fn mul(&self, rhs: &Quaternion) -> Self {
        Self::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }

    /// Roll, pitch, yaw (rotations about x, y, z).
    pub fn to_euler(&self) -> (f64, f64, f64) {
        let q = self.normalized();
        let roll = (2.0 * (q.w * q.x + q.y * q.z)).atan2(1.0 - 2.0 * (q.x * q.x + q.y * q.y));
        let pitch = (2.0 * (q.w * q.y - q.z * q.x)).clamp(-1.0, 1.0).asin();
        let yaw = (2.0 * (q.w * q.z + q.x * q.y)).atan2(1.0 - 2.0 * (q.y * q.y + q.z * q.z));
        (roll, pitch, yaw)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Position and orientation of a link.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: [f64; 3],
    pub orientation: Quaternion,
}

impl Pose {
    pub fn new(position: [f64; 3], orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Euclidean distance between the two positions.
    pub fn distance_to(&self, point: &[f64; 3]) -> f64 {
        self.position
            .iter()
            .zip(point)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn test_canonical_flips_negative_w() {
        let q = Quaternion::new(0.0, 0.0, -0.5, -0.5).canonical();
        assert!(q.w > 0.0);
        assert!((q.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_relative_rotation() {
        let a = Quaternion::from_yaw(FRAC_PI_4);
        let b = Quaternion::from_yaw(2.0 * FRAC_PI_4);
        let (roll, pitch, yaw) = a.conjugate().mul(&b).to_euler();
        assert!(roll.abs() < 1e-12);
        assert!(pitch.abs() < 1e-12);
        assert!((yaw - FRAC_PI_4).abs() < 1e-12);
    }

    #[test]
    fn test_zero_quaternion_normalizes_to_identity() {
        assert_eq!(Quaternion::new(0.0, 0.0, 0.0, 0.0).normalized(), Quaternion::IDENTITY);
    }
}
