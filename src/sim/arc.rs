//! Paddle arc geometry
//!
//! The paddle's collision surface is the circular arc whose chord is the
//! paddle width and whose sagitta (bulge height) is the paddle height:
//! - radius: `(h² + w²/4) / 2h`
//! - centre: `position + (w/2, radius)` (below the paddle, y grows downward)
//! - subtended angle: `2·asin((w/2) / radius)`

use serde::{Deserialize, Serialize};

use super::vector::{Vector2D, Vector2DExt};

/// The circle a paddle's top surface is cut from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaddleArc {
    /// Centre of the underlying circle
    pub center: Vector2D,
    /// Radius of the underlying circle
    pub radius: f64,
    /// Chord length (paddle width)
    pub chord: f64,
    /// Bulge height (paddle height)
    pub sagitta: f64,
}

impl PaddleArc {
    /// Fit the arc to a paddle rectangle with upper-left corner `position`
    pub fn fit(position: Vector2D, width: f64, height: f64) -> Self {
        let radius = arc_radius(width, height);
        Self {
            center: position + Vector2D::new(width / 2.0, radius),
            radius,
            chord: width,
            sagitta: height,
        }
    }

    /// Angle subtended by the paddle at the arc centre (radians)
    pub fn angle(&self) -> f64 {
        subtended_angle(self.chord, self.radius)
    }

    /// Y offset (relative to the arc centre, negative is up) below which a
    /// point on the circle lies under the paddle's flat bottom edge
    pub fn body_limit(&self) -> f64 {
        self.sagitta - self.radius
    }

    /// Unit surface normal at the point of the circle nearest `point`,
    /// pointing away from the centre. `None` at the centre itself.
    pub fn normal_toward(&self, point: Vector2D) -> Option<Vector2D> {
        (point - self.center).unit()
    }
}

/// Radius of the circle through a chord of `width` with sagitta `height`
#[inline]
pub fn arc_radius(width: f64, height: f64) -> f64 {
    (height * height + width * width / 4.0) / (2.0 * height)
}

/// Angle subtended by a chord of `width` on a circle of `radius`
#[inline]
pub fn subtended_angle(width: f64, radius: f64) -> f64 {
    2.0 * ((width / 2.0) / radius).clamp(-1.0, 1.0).asin()
}
