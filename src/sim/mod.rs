//! Simulation module
//!
//! All gameplay logic lives here:
//! - Fixed tick only; speed changes scale velocity, not the tick rate
//! - Seeded RNG only
//! - Stable iteration order (bricks in layout order, registry by entity ID)
//! - No rendering or platform dependencies

pub mod arc;
pub mod collision;
pub mod controller;
pub mod entity;
pub mod state;
pub mod tick;
pub mod vector;

pub use arc::PaddleArc;
pub use collision::{
    Collision, Contact, Field, bounce, circle_mtv, first_collision, paddle_mtv, rectangle_mtv,
    wall_mtv,
};
pub use controller::{Autopilot, Controller, Speed};
pub use entity::{Bounds, Circle, Entity, EntityId, EntityKind, Shape};
pub use state::{
    ChannelObserver, GameDelta, GameState, Observer, OverflowPolicy, Snapshot, Update, UpdateFeed,
    channel_observer,
};
pub use tick::{
    Engine, EngineHandle, EnginePhase, EngineStats, RoundEnd, TickReport, generate_bricks,
};
pub use vector::{Vector2D, Vector2DExt};
