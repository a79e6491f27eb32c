//! Engine configuration
//!
//! Replaces the global field/brick/timing constants with a value handed to
//! the engine at construction. Loadable from a JSON file; every field is
//! optional and falls back to the defaults in [`crate::consts`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{BreakoutError, Result};

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Field ===
    pub field_width: f64,
    pub field_height: f64,
    /// Bounce off the bottom edge instead of losing the ball (attract mode)
    pub closed_floor: bool,

    // === Paddle ===
    pub paddle_width: f64,
    pub paddle_height: f64,

    // === Bricks ===
    pub brick_rows: u32,
    pub brick_cols: u32,
    pub brick_width: f64,
    pub brick_height: f64,
    /// Fraction of the field height reserved for the brick wall
    pub brick_area_fraction: f64,

    // === Ball ===
    pub ball_radius: f64,
    /// Launch speed (field units per tick at time factor 1)
    pub ball_speed: f64,
    /// Launch angle is drawn uniformly from [-spread, spread] around straight down
    pub launch_spread: f64,

    // === Timing ===
    pub tick_millis: u64,
    pub restart_wait_ticks: u32,

    // === Rules ===
    pub lives: u32,
    /// RNG seed; `None` draws one from the thread RNG
    pub seed: Option<u64>,

    // === Debris ===
    pub debris_particles: u32,
    pub debris_ttl_ticks: u32,
    pub debris_radius: f64,
    pub debris_gravity: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            field_width: FIELD_WIDTH,
            field_height: FIELD_HEIGHT,
            closed_floor: false,

            paddle_width: PADDLE_WIDTH,
            paddle_height: PADDLE_HEIGHT,

            brick_rows: BRICK_ROWS,
            brick_cols: BRICK_COLS,
            brick_width: BRICK_WIDTH,
            brick_height: BRICK_HEIGHT,
            brick_area_fraction: BRICK_AREA_FRACTION,

            ball_radius: BALL_RADIUS,
            ball_speed: BALL_START_SPEED,
            launch_spread: BALL_LAUNCH_SPREAD,

            tick_millis: TICK_MILLIS,
            restart_wait_ticks: RESTART_WAIT_TICKS,

            lives: LIVES,
            seed: None,

            debris_particles: DEBRIS_PARTICLES,
            debris_ttl_ticks: DEBRIS_TTL_TICKS,
            debris_radius: DEBRIS_RADIUS,
            debris_gravity: DEBRIS_GRAVITY,
        }
    }
}

impl EngineConfig {
    /// Load and validate a config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| BreakoutError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a config from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Fixed tick budget
    pub fn tick_budget(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    /// Paddle resting position: centred, two paddle heights above the bottom
    pub fn paddle_home(&self) -> (f64, f64) {
        (
            (self.field_width - self.paddle_width) / 2.0,
            self.field_height - self.paddle_height * 2.0,
        )
    }

    /// Reject values the engine cannot simulate
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(BreakoutError::InvalidConfig(msg));

        if !(self.field_width > 0.0 && self.field_height > 0.0) {
            return invalid(format!(
                "field must have positive size, got {}x{}",
                self.field_width, self.field_height
            ));
        }
        if !(self.paddle_width > 0.0 && self.paddle_height > 0.0) {
            return invalid("paddle must have positive size".into());
        }
        if self.paddle_width > self.field_width {
            return invalid(format!(
                "paddle width {} exceeds field width {}",
                self.paddle_width, self.field_width
            ));
        }
        if !(self.ball_radius > 0.0) {
            return invalid("ball radius must be positive".into());
        }
        if self.ball_radius * 2.0 > self.field_width {
            return invalid("ball does not fit in the field".into());
        }
        if self.tick_millis == 0 {
            return invalid("tick budget must be at least 1ms".into());
        }
        if !(self.brick_width > 0.0 && self.brick_height > 0.0) {
            return invalid("bricks must have positive size".into());
        }
        if self.brick_rows == 0 || self.brick_cols == 0 {
            return invalid("brick wall needs at least one row and one column".into());
        }
        let bricks = u64::from(self.brick_rows) * u64::from(self.brick_cols);
        if bricks > MAX_BRICKS {
            return invalid(format!("{} bricks exceed the limit of {}", bricks, MAX_BRICKS));
        }
        if f64::from(self.brick_cols) * self.brick_width > self.field_width {
            return invalid(format!(
                "{} columns of width {} do not fit in field width {}",
                self.brick_cols, self.brick_width, self.field_width
            ));
        }
        if f64::from(self.brick_rows) * self.brick_height
            > self.field_height * self.brick_area_fraction
        {
            return invalid(format!(
                "{} rows of height {} do not fit in the brick area",
                self.brick_rows, self.brick_height
            ));
        }
        if self.debris_radius < 0.0 {
            return invalid("debris radius must not be negative".into());
        }
        Ok(())
    }
}
