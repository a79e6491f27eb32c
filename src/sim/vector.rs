//! 2-D vector value type
//!
//! `Vector2D` is glam's `DVec2`: a `Copy` value, so every operation returns a
//! new vector and leaves its operands untouched. Equality is exact,
//! component-wise. The extension trait adds the operations the simulation
//! names that glam spells differently, plus degenerate-safe normalisation.

use glam::DVec2;

pub type Vector2D = DVec2;

/// Lengths below this are treated as zero when normalising
pub const DEGENERATE_LENGTH: f64 = 1e-12;

pub trait Vector2DExt: Sized {
    /// Euclidean length
    fn magnitude(self) -> f64;

    /// Multiply by a scalar
    fn scale(self, factor: f64) -> Self;

    /// Rotate counter-clockwise (in a y-up frame) by `theta` radians
    fn rotated(self, theta: f64) -> Self;

    /// Unit vector, or `None` for a (near) zero-length vector
    fn unit(self) -> Option<Self>;

    /// Mirror across the line perpendicular to `axis`: `v - 2(v·n)n`.
    /// A degenerate axis leaves the vector unchanged.
    fn reflect_across(self, axis: Self) -> Self;
}

impl Vector2DExt for Vector2D {
    #[inline]
    fn magnitude(self) -> f64 {
        self.length()
    }

    #[inline]
    fn scale(self, factor: f64) -> Self {
        self * factor
    }

    #[inline]
    fn rotated(self, theta: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        Vector2D::new(cos * self.x - sin * self.y, sin * self.x + cos * self.y)
    }

    #[inline]
    fn unit(self) -> Option<Self> {
        let len = self.length();
        if len.is_finite() && len > DEGENERATE_LENGTH {
            Some(self / len)
        } else {
            None
        }
    }

    fn reflect_across(self, axis: Self) -> Self {
        match axis.unit() {
            Some(n) => self - n * (2.0 * self.dot(n)),
            None => self,
        }
    }
}
