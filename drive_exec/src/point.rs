//! # Point
//!
//! Two dimensional point used for beacon positions and scan returns.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::maths::norm;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point in two dimensions.
///
/// The polar fields `r` and `alpha` are a cache filled in by
/// [`Point::from_polar`]. They are not kept in sync if `x` or `y` are
/// assigned directly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Units: meters
    pub x: f64,

    /// Units: meters
    pub y: f64,

    /// Radius of the point when constructed from polar coordinates.
    ///
    /// Units: meters
    #[serde(default)]
    pub r: f64,

    /// Angle of the point when constructed from polar coordinates.
    ///
    /// Units: radians
    #[serde(default)]
    pub alpha: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Point {
    /// Create a point from cartesian coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            r: 0.0,
            alpha: 0.0,
        }
    }

    /// Create a point from polar coordinates.
    pub fn from_polar(r: f64, alpha: f64) -> Self {
        Self {
            x: r * alpha.cos(),
            y: r * alpha.sin(),
            r,
            alpha,
        }
    }

    /// Distance of this point from the origin.
    pub fn distance(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Distance between this point and another one.
    pub fn distance_to(&self, other: &Point) -> f64 {
        norm(&[self.x, self.y], &[other.x, other.y]).unwrap_or(std::f64::NAN)
    }

    /// Manhattan distance of this point from the origin.
    ///
    /// An approximation of the distance which is cheaper to compute.
    pub fn manhattan_distance(&self) -> f64 {
        self.x.abs() + self.y.abs()
    }

    /// Manhattan distance between this point and another one.
    pub fn manhattan_distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_polar() {
        let p = Point::from_polar(2.0, FRAC_PI_2);
        assert!(p.x.abs() < 1e-12);
        assert!((p.y - 2.0).abs() < 1e-12);
        assert_eq!(p.r, 2.0);
        assert_eq!(p.alpha, FRAC_PI_2);
        assert!((p.distance() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_distances() {
        let a = Point::new(1.0, 1.0);
        let b = Point::new(4.0, -3.0);

        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(b.distance_to(&a), 5.0);
        assert_eq!(a.manhattan_distance_to(&b), 7.0);
        assert_eq!(b.manhattan_distance(), 7.0);
        assert_eq!(a.distance_to(&a), 0.0);
    }
}
