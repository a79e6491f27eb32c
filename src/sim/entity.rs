//! Entities: a closed set of shapes sharing one kinematic body
//!
//! Every entity has a position (upper-left reference point), a velocity and
//! an acceleration. Collision code never dispatches on the entity itself; it
//! asks for explicit geometry (`bounds`, `circle`, `paddle_arc`).

use serde::{Deserialize, Serialize};

use super::arc::PaddleArc;
use super::vector::Vector2D;

/// Stable identity, allocated by the game state
pub type EntityId = u32;

/// Plain tag for the entity variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Ball,
    /// A brick or any other static body
    Rectangle,
    Paddle,
    /// Visual debris, integrated with acceleration, never collides
    Particle,
}

/// Shape data for each variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Ball { radius: f64 },
    Rectangle { width: f64, height: f64 },
    /// A rectangle whose top surface is the fitted arc
    Paddle { width: f64, height: f64 },
    Particle { radius: f64, ttl: u32 },
}

/// Axis-aligned bounding rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn position(&self) -> Vector2D {
        Vector2D::new(self.x, self.y)
    }

    #[inline]
    pub fn center(&self) -> Vector2D {
        Vector2D::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[inline]
    pub fn half_extents(&self) -> Vector2D {
        Vector2D::new(self.width / 2.0, self.height / 2.0)
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Closed-interval overlap test
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }
}

/// A circle in field coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vector2D,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Vector2D, radius: f64) -> Self {
        Self { center, radius }
    }
}

/// A movable object on the playing field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub position: Vector2D,
    pub velocity: Vector2D,
    /// Only used by secondary dynamics (debris)
    pub acceleration: Vector2D,
    pub shape: Shape,
}

impl Entity {
    fn with_shape(id: EntityId, position: Vector2D, shape: Shape) -> Self {
        Self {
            id,
            position,
            velocity: Vector2D::ZERO,
            acceleration: Vector2D::ZERO,
            shape,
        }
    }

    pub fn ball(id: EntityId, position: Vector2D, radius: f64) -> Self {
        Self::with_shape(id, position, Shape::Ball { radius })
    }

    pub fn rectangle(id: EntityId, position: Vector2D, width: f64, height: f64) -> Self {
        Self::with_shape(id, position, Shape::Rectangle { width, height })
    }

    pub fn paddle(id: EntityId, position: Vector2D, width: f64, height: f64) -> Self {
        Self::with_shape(id, position, Shape::Paddle { width, height })
    }

    pub fn particle(id: EntityId, position: Vector2D, radius: f64, ttl: u32) -> Self {
        Self::with_shape(id, position, Shape::Particle { radius, ttl })
    }

    pub fn kind(&self) -> EntityKind {
        match self.shape {
            Shape::Ball { .. } => EntityKind::Ball,
            Shape::Rectangle { .. } => EntityKind::Rectangle,
            Shape::Paddle { .. } => EntityKind::Paddle,
            Shape::Particle { .. } => EntityKind::Particle,
        }
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.position.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn set_position(&mut self, position: Vector2D) {
        self.position = position;
    }

    pub fn set_velocity(&mut self, velocity: Vector2D) {
        self.velocity = velocity;
    }

    pub fn translate(&mut self, offset: Vector2D) {
        self.position += offset;
    }

    /// Radius for round shapes
    pub fn radius(&self) -> Option<f64> {
        match self.shape {
            Shape::Ball { radius } | Shape::Particle { radius, .. } => Some(radius),
            Shape::Rectangle { .. } | Shape::Paddle { .. } => None,
        }
    }

    /// Bounding rectangle, uniform across shapes.
    /// Round shapes span `2·radius` from their upper-left position.
    pub fn bounds(&self) -> Bounds {
        match self.shape {
            Shape::Ball { radius } | Shape::Particle { radius, .. } => {
                Bounds::new(self.position.x, self.position.y, 2.0 * radius, 2.0 * radius)
            }
            Shape::Rectangle { width, height } | Shape::Paddle { width, height } => {
                Bounds::new(self.position.x, self.position.y, width, height)
            }
        }
    }

    /// Geometric centre
    pub fn center(&self) -> Vector2D {
        self.bounds().center()
    }

    /// The circle of a round shape
    pub fn circle(&self) -> Option<Circle> {
        self.radius()
            .map(|radius| Circle::new(self.position + Vector2D::splat(radius), radius))
    }

    /// The arc collision surface of a paddle
    pub fn paddle_arc(&self) -> Option<PaddleArc> {
        match self.shape {
            Shape::Paddle { width, height } => Some(PaddleArc::fit(self.position, width, height)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ball_center_and_bounds() {
        let ball = Entity::ball(1, Vector2D::new(10.0, 20.0), 2.0);
        assert_eq!(ball.kind(), EntityKind::Ball);
        assert_eq!(ball.center(), Vector2D::new(12.0, 22.0));
        assert_eq!(ball.bounds(), Bounds::new(10.0, 20.0, 4.0, 4.0));
        assert_eq!(ball.circle(), Some(Circle::new(Vector2D::new(12.0, 22.0), 2.0)));
    }

    #[test]
    fn test_rectangle_bounds_is_itself() {
        let brick = Entity::rectangle(2, Vector2D::new(10.0, 10.0), 8.0, 4.0);
        assert_eq!(brick.bounds(), Bounds::new(10.0, 10.0, 8.0, 4.0));
        assert_eq!(brick.center(), Vector2D::new(14.0, 12.0));
        assert!(brick.circle().is_none());
        assert!(brick.paddle_arc().is_none());
    }

    #[test]
    fn test_paddle_exposes_arc() {
        let paddle = Entity::paddle(3, Vector2D::new(32.0, 126.8), 16.0, 1.6);
        let arc = paddle.paddle_arc().unwrap();
        assert!((arc.radius - 20.8).abs() < 1e-9);
        assert!((arc.center.x - 40.0).abs() < 1e-12);
        assert!((arc.center.y - (126.8 + 20.8)).abs() < 1e-9);
        assert_eq!(paddle.kind(), EntityKind::Paddle);
    }

    #[test]
    fn test_new_entities_are_at_rest() {
        let p = Entity::particle(4, Vector2D::new(1.0, 1.0), 0.3, 10);
        assert_eq!(p.velocity, Vector2D::ZERO);
        assert_eq!(p.acceleration, Vector2D::ZERO);
        assert_eq!(p.radius(), Some(0.3));
    }

    #[test]
    fn test_bounds_intersects() {
        let a = Bounds::new(0.0, 0.0, 4.0, 4.0);
        assert!(a.intersects(&Bounds::new(4.0, 4.0, 1.0, 1.0)));
        assert!(!a.intersects(&Bounds::new(4.1, 0.0, 1.0, 1.0)));
    }
}
