//! Arc Breakout - a Breakout simulation engine
//!
//! Core modules:
//! - `sim`: Simulation (vectors, entities, collisions, engine, state/delta feed)
//! - `config`: Engine configuration (field size, bricks, timing)
//! - `view`: Headless consumer of the delta feed (shadow world, ASCII frames)
//! - `error`: Crate error type

pub mod config;
pub mod error;
pub mod sim;
pub mod view;

pub use config::EngineConfig;
pub use error::{BreakoutError, Result};

/// Default tuning values (mirrors the classic playing field)
pub mod consts {
    /// Playing field dimensions
    pub const FIELD_WIDTH: f64 = 80.0;
    pub const FIELD_HEIGHT: f64 = 130.0;

    /// Paddle defaults: width is a fifth of the field, height a tenth of the width
    pub const PADDLE_WIDTH: f64 = 0.2 * FIELD_WIDTH;
    pub const PADDLE_HEIGHT: f64 = 0.1 * PADDLE_WIDTH;

    /// Brick wall layout
    pub const BRICK_ROWS: u32 = 6;
    pub const BRICK_COLS: u32 = 7;
    pub const BRICK_WIDTH: f64 = 8.0;
    pub const BRICK_HEIGHT: f64 = 4.0;
    /// Upper bound on `rows × cols` accepted by config validation
    pub const MAX_BRICKS: u64 = 10_000;
    /// Fraction of the field height the brick wall occupies
    pub const BRICK_AREA_FRACTION: f64 = 0.33;

    /// Ball defaults
    pub const BALL_RADIUS: f64 = 1.0;
    /// Launch speed in field units per tick
    pub const BALL_START_SPEED: f64 = 2.0;
    /// Maximum launch deviation from straight down (radians)
    pub const BALL_LAUNCH_SPREAD: f64 = std::f64::consts::FRAC_PI_4;

    /// Fixed tick budget (milliseconds)
    pub const TICK_MILLIS: u64 = 20;
    /// Ticks spent frozen between rounds (~1 second)
    pub const RESTART_WAIT_TICKS: u32 = 50;
    pub const LIVES: u32 = 3;

    /// Debris particles per destroyed brick
    pub const DEBRIS_PARTICLES: u32 = 4;
    pub const DEBRIS_TTL_TICKS: u32 = 25;
    pub const DEBRIS_RADIUS: f64 = 0.3;
    pub const DEBRIS_GRAVITY: f64 = 0.05;

    /// Time factor presets used by the controller
    pub const TIME_FACTOR_SLOW: f64 = 0.2;
    pub const TIME_FACTOR_NORMAL: f64 = 1.0;
    pub const TIME_FACTOR_FAST: f64 = 2.0;
}
