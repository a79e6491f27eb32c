//! Collision detection and response
//!
//! Every test answers with the minimum translation vector (MTV): the
//! shortest offset that, added to the ball's position, removes the overlap.
//! `None` means no overlap. Degenerate geometry (zero-length vectors) is
//! reported as no collision rather than dividing by zero.

use serde::{Deserialize, Serialize};

use super::arc::PaddleArc;
use super::entity::{Bounds, Circle, Entity, EntityId};
use super::vector::{Vector2D, Vector2DExt};

/// The playing field walls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub width: f64,
    pub height: f64,
    /// Whether the bottom edge is a wall
    pub closed_floor: bool,
}

/// What the ball hit this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    Wall,
    Paddle,
    Brick(EntityId),
}

/// The resolved collision for a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    pub contact: Contact,
    pub mtv: Vector2D,
}

/// MTV separating a ball from an axis-aligned rectangle
///
/// Branches on where the ball centre projects: inside the horizontal span
/// gives a purely vertical push, inside the vertical span a purely
/// horizontal one, otherwise the nearest corner decides.
pub fn rectangle_mtv(ball: Circle, rect: Bounds) -> Option<Vector2D> {
    let half = rect.half_extents();
    let offset = ball.center - rect.center();
    let dist = offset.abs();
    let r = ball.radius;

    if dist.x >= half.x + r || dist.y >= half.y + r {
        return None;
    }

    if dist.x < half.x {
        // Top or bottom edge
        return Some(Vector2D::new(
            0.0,
            (half.y + r - dist.y).copysign(offset.y),
        ));
    }

    if dist.y < half.y {
        // Left or right edge
        return Some(Vector2D::new(
            (half.x + r - dist.x).copysign(offset.x),
            0.0,
        ));
    }

    // Corner: vector from the nearest corner to the ball centre
    let corner = dist - half;
    let len = corner.magnitude();
    let overlap = r - len;
    if overlap <= 0.0 {
        return None;
    }
    let dir = corner.unit()?;
    Some(Vector2D::new(dir.x.copysign(offset.x), dir.y.copysign(offset.y)) * overlap)
}

/// MTV separating a ball from another circle: straight away from its centre
pub fn circle_mtv(ball: Circle, other: Circle) -> Option<Vector2D> {
    let offset = ball.center - other.center;
    let overlap = ball.radius + other.radius - offset.magnitude();
    if overlap <= 0.0 {
        return None;
    }
    offset.unit().map(|dir| dir * overlap)
}

/// MTV bringing a ball back inside the field walls.
/// Each axis is clamped independently; the floor only counts when closed.
pub fn wall_mtv(ball: Circle, field: Field) -> Option<Vector2D> {
    let r = ball.radius;
    let c = ball.center;

    let dx = (r - c.x).max(0.0) + (field.width - (c.x + r)).min(0.0);
    let mut dy = (r - c.y).max(0.0);
    if field.closed_floor {
        dy += (field.height - (c.y + r)).min(0.0);
    }

    if dx == 0.0 && dy == 0.0 {
        None
    } else {
        Some(Vector2D::new(dx, dy))
    }
}

/// MTV separating a ball from a paddle
///
/// The bounding rectangle is the broad phase; the arc is the real surface.
/// When the arc contact lies below the paddle's flat bottom (the circle
/// extends past the body there), the hit is re-resolved against the
/// nearest bottom corner instead.
pub fn paddle_mtv(ball: Circle, body: Bounds, arc: PaddleArc) -> Option<Vector2D> {
    rectangle_mtv(ball, body)?;

    let mtv = circle_mtv(ball, Circle::new(arc.center, arc.radius))?;
    let normal = arc.normal_toward(ball.center)?;

    if normal.y * arc.radius <= arc.body_limit() {
        return Some(mtv);
    }

    let bottom_middle = Vector2D::new(body.x + body.width / 2.0, body.bottom());
    let diff = ball.center - bottom_middle;
    let corner_diff = diff - Vector2D::new((body.width / 2.0).copysign(diff.x), 0.0);
    let len = corner_diff.magnitude();
    if len >= ball.radius {
        return None;
    }
    corner_diff
        .unit()
        .map(|dir| dir * (ball.radius - len))
}

/// Velocity after a collision resolved by `mtv`.
///
/// Reflects across the MTV axis when the ball moves into the surface. A
/// ball already separating keeps its velocity, and a zero MTV is a no-op.
/// For the paddle the MTV is radial to the arc, so this reflects about
/// the arc tangent at the contact point.
pub fn bounce(velocity: Vector2D, mtv: Vector2D) -> Vector2D {
    match mtv.unit() {
        Some(normal) if velocity.dot(normal) < 0.0 => velocity.reflect_across(normal),
        _ => velocity,
    }
}

/// Bottom edge of the lowest brick, or `None` for an empty wall
pub fn lowest_brick_bottom(bricks: &[Entity]) -> Option<f64> {
    bricks
        .iter()
        .map(|b| b.bounds().bottom())
        .fold(None, |acc, y| Some(acc.map_or(y, |m: f64| m.max(y))))
}

/// Find this tick's collision in priority order: walls, paddle, bricks.
///
/// Bricks are scanned in iteration order and the first overlap wins; the
/// closest brick is not searched for when several overlap at once. The
/// brick pass is skipped entirely while the ball is below the wall.
pub fn first_collision(
    ball: Circle,
    field: Field,
    paddle: Option<&Entity>,
    bricks: &[Entity],
) -> Option<Collision> {
    if let Some(mtv) = wall_mtv(ball, field) {
        return Some(Collision {
            contact: Contact::Wall,
            mtv,
        });
    }

    if let Some(paddle) = paddle {
        if let Some(arc) = paddle.paddle_arc() {
            if let Some(mtv) = paddle_mtv(ball, paddle.bounds(), arc) {
                return Some(Collision {
                    contact: Contact::Paddle,
                    mtv,
                });
            }
        }
    }

    let lowest = lowest_brick_bottom(bricks)?;
    if ball.center.y - ball.radius > lowest {
        return None;
    }

    bricks.iter().find_map(|brick| {
        rectangle_mtv(ball, brick.bounds()).map(|mtv| Collision {
            contact: Contact::Brick(brick.id),
            mtv,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn field() -> Field {
        Field {
            width: 80.0,
            height: 130.0,
            closed_floor: false,
        }
    }

    fn brick() -> Bounds {
        Bounds::new(10.0, 10.0, 8.0, 4.0)
    }

    #[test]
    fn test_rectangle_miss() {
        let ball = Circle::new(Vector2D::new(14.0, 20.0), 1.0);
        assert!(rectangle_mtv(ball, brick()).is_none());
    }

    #[test]
    fn test_rectangle_touching_is_not_a_hit() {
        let ball = Circle::new(Vector2D::new(14.0, 15.0), 1.0);
        assert!(rectangle_mtv(ball, brick()).is_none());
    }

    #[test]
    fn test_rectangle_bottom_edge() {
        // Centre 0.5 below the bottom edge, radius 1: push down by 0.5
        let ball = Circle::new(Vector2D::new(14.0, 14.5), 1.0);
        let mtv = rectangle_mtv(ball, brick()).unwrap();
        assert!(mtv.x == 0.0);
        assert!((mtv.y - 0.5).abs() < EPS);
    }

    #[test]
    fn test_rectangle_top_edge() {
        let ball = Circle::new(Vector2D::new(12.0, 9.5), 1.0);
        let mtv = rectangle_mtv(ball, brick()).unwrap();
        assert!((mtv.y + 0.5).abs() < EPS);
    }

    #[test]
    fn test_rectangle_side_edges() {
        let left = Circle::new(Vector2D::new(9.5, 12.0), 1.0);
        let mtv = rectangle_mtv(left, brick()).unwrap();
        assert!((mtv.x + 0.5).abs() < EPS && mtv.y == 0.0);

        let right = Circle::new(Vector2D::new(18.25, 12.0), 1.0);
        let mtv = rectangle_mtv(right, brick()).unwrap();
        assert!((mtv.x - 0.75).abs() < EPS && mtv.y == 0.0);
    }

    #[test]
    fn test_rectangle_corner() {
        // Diagonal from the bottom-right corner (18, 14)
        let d = 0.5 / 2f64.sqrt();
        let ball = Circle::new(Vector2D::new(18.0 + d, 14.0 + d), 1.0);
        let mtv = rectangle_mtv(ball, brick()).unwrap();
        assert!((mtv.x - mtv.y).abs() < EPS);
        assert!((mtv.magnitude() - 0.5).abs() < EPS);

        // Inside the corner's bounding square but outside the radius
        let ball = Circle::new(Vector2D::new(18.8, 14.8), 1.0);
        assert!(rectangle_mtv(ball, brick()).is_none());
    }

    #[test]
    fn test_circle_mtv() {
        let ball = Circle::new(Vector2D::new(3.0, 0.0), 1.0);
        let other = Circle::new(Vector2D::ZERO, 2.5);
        let mtv = circle_mtv(ball, other).unwrap();
        assert!((mtv.x - 0.5).abs() < EPS && mtv.y == 0.0);

        let far = Circle::new(Vector2D::new(4.0, 0.0), 1.0);
        assert!(circle_mtv(far, other).is_none());

        // Concentric circles have no defined push direction
        let same = Circle::new(Vector2D::ZERO, 1.0);
        assert!(circle_mtv(same, other).is_none());
    }

    #[test]
    fn test_wall_mtv() {
        let f = field();
        assert!(wall_mtv(Circle::new(Vector2D::new(40.0, 60.0), 1.0), f).is_none());

        let left = wall_mtv(Circle::new(Vector2D::new(0.5, 60.0), 1.0), f).unwrap();
        assert_eq!(left, Vector2D::new(0.5, 0.0));

        let right = wall_mtv(Circle::new(Vector2D::new(80.0, 60.0), 2.0), f).unwrap();
        assert_eq!(right, Vector2D::new(-2.0, 0.0));

        let top_left = wall_mtv(Circle::new(Vector2D::new(0.5, 0.25), 1.0), f).unwrap();
        assert_eq!(top_left, Vector2D::new(0.5, 0.75));
    }

    #[test]
    fn test_floor_only_when_closed() {
        let ball = Circle::new(Vector2D::new(40.0, 129.5), 1.0);
        assert!(wall_mtv(ball, field()).is_none());

        let closed = Field {
            closed_floor: true,
            ..field()
        };
        assert_eq!(wall_mtv(ball, closed), Some(Vector2D::new(0.0, -0.5)));
    }

    fn paddle() -> (Bounds, PaddleArc) {
        let pos = Vector2D::new(32.0, 100.0);
        (
            Bounds::new(pos.x, pos.y, 16.0, 1.6),
            PaddleArc::fit(pos, 16.0, 1.6),
        )
    }

    #[test]
    fn test_paddle_centre_hit_is_vertical() {
        let (body, arc) = paddle();
        let ball = Circle::new(Vector2D::new(40.0, 99.5), 1.0);
        let mtv = paddle_mtv(ball, body, arc).unwrap();
        assert!(mtv.x.abs() < EPS);
        assert!((mtv.y + 0.5).abs() < EPS);
    }

    #[test]
    fn test_paddle_off_centre_hit_tilts_outward() {
        let (body, arc) = paddle();
        let ball = Circle::new(Vector2D::new(46.0, 100.0), 1.0);
        let mtv = paddle_mtv(ball, body, arc).unwrap();
        assert!(mtv.x > 0.0);
        assert!(mtv.y < 0.0);
    }

    #[test]
    fn test_paddle_broad_phase_miss() {
        let (body, arc) = paddle();
        let ball = Circle::new(Vector2D::new(40.0, 95.0), 1.0);
        assert!(paddle_mtv(ball, body, arc).is_none());
    }

    #[test]
    fn test_paddle_below_body_uses_corner() {
        let (body, arc) = paddle();
        // Just under the bottom-left corner (32, 101.6)
        let ball = Circle::new(Vector2D::new(31.8, 102.2), 1.0);
        let mtv = paddle_mtv(ball, body, arc).unwrap();
        let expected_dir = (ball.center - Vector2D::new(32.0, 101.6)).unit().unwrap();
        assert!((mtv.unit().unwrap() - expected_dir).length() < EPS);
        let moved = ball.center + mtv;
        assert!(((moved - Vector2D::new(32.0, 101.6)).length() - 1.0).abs() < EPS);

        // Beside the body, clear of the corner
        let clear = Circle::new(Vector2D::new(30.5, 102.5), 1.0);
        assert!(paddle_mtv(clear, body, arc).is_none());
    }

    #[test]
    fn test_bounce() {
        let v = Vector2D::new(3.0, 0.0);
        assert_eq!(bounce(v, Vector2D::new(-2.0, 0.0)), Vector2D::new(-3.0, 0.0));
        // Already separating: unchanged
        assert_eq!(bounce(v, Vector2D::new(1.0, 0.0)), v);
        // Degenerate axis: unchanged
        assert_eq!(bounce(v, Vector2D::ZERO), v);
    }

    #[test]
    fn test_paddle_bounce_reflects_about_arc_normal() {
        let (body, arc) = paddle();
        let ball = Circle::new(Vector2D::new(46.0, 100.0), 1.0);
        let mtv = paddle_mtv(ball, body, arc).unwrap();
        let normal = arc.normal_toward(ball.center).unwrap();
        assert!((mtv.unit().unwrap() - normal).length() < EPS);

        let v = Vector2D::new(0.0, 2.0);
        let after = bounce(v, mtv);
        assert!((after - v.reflect_across(normal)).length() < EPS);
        assert!((after.magnitude() - 2.0).abs() < EPS);
    }

    #[test]
    fn test_priority_wall_before_brick() {
        let bricks = vec![Entity::rectangle(7, Vector2D::new(0.0, 0.0), 8.0, 4.0)];
        let ball = Circle::new(Vector2D::new(0.5, 5.0), 1.0);
        let hit = first_collision(ball, field(), None, &bricks).unwrap();
        assert_eq!(hit.contact, Contact::Wall);
    }

    #[test]
    fn test_first_brick_in_order_wins() {
        let bricks = vec![
            Entity::rectangle(1, Vector2D::new(10.0, 10.0), 8.0, 4.0),
            Entity::rectangle(2, Vector2D::new(18.0, 10.0), 8.0, 4.0),
        ];
        // Straddles the seam between both bricks
        let ball = Circle::new(Vector2D::new(18.0, 14.5), 1.0);
        let hit = first_collision(ball, field(), None, &bricks).unwrap();
        assert_eq!(hit.contact, Contact::Brick(1));
    }

    #[test]
    fn test_ball_below_wall_skips_bricks() {
        let bricks = vec![Entity::rectangle(1, Vector2D::new(10.0, 10.0), 8.0, 4.0)];
        assert_eq!(lowest_brick_bottom(&bricks), Some(14.0));
        let ball = Circle::new(Vector2D::new(14.0, 40.0), 1.0);
        assert!(first_collision(ball, field(), None, &bricks).is_none());
        assert!(lowest_brick_bottom(&[]).is_none());
    }
}
