//! Input side of the simulation
//!
//! The controller turns input events into writes on the shared state: pause,
//! time factor, and queued paddle displacement. It never touches entities
//! directly; the engine applies the displacement at the start of its next
//! tick, clamped so the paddle stays inside the field.

use std::sync::Arc;

use super::entity::{Bounds, Entity};
use super::state::GameState;
use crate::consts::{TIME_FACTOR_FAST, TIME_FACTOR_NORMAL, TIME_FACTOR_SLOW};

/// Named time factor presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speed {
    Slow,
    Normal,
    Fast,
}

impl Speed {
    pub fn factor(self) -> f64 {
        match self {
            Speed::Slow => TIME_FACTOR_SLOW,
            Speed::Normal => TIME_FACTOR_NORMAL,
            Speed::Fast => TIME_FACTOR_FAST,
        }
    }
}

/// Handle used by input code (any thread)
#[derive(Clone)]
pub struct Controller {
    state: Arc<GameState>,
}

impl Controller {
    pub fn new(state: Arc<GameState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<GameState> {
        &self.state
    }

    /// Queue a horizontal paddle move. Ignored while paused or game over.
    pub fn move_paddle(&self, dx: f64) {
        if self.state.is_paused() || self.state.is_game_over() {
            return;
        }
        self.state.push_paddle_displacement(dx);
    }

    pub fn set_paused(&self, paused: bool) {
        self.state.set_paused(paused);
        log::info!("{}", if paused { "Paused" } else { "Resumed" });
    }

    /// Flip pause, returning the new value
    pub fn toggle_pause(&self) -> bool {
        let paused = self.state.toggle_pause();
        log::info!("{}", if paused { "Paused" } else { "Resumed" });
        paused
    }

    pub fn set_time_factor(&self, factor: f64) {
        self.state.set_time_factor(factor);
    }

    pub fn set_speed(&self, speed: Speed) {
        self.set_time_factor(speed.factor());
    }
}

/// Limit a horizontal move so `bounds` stays within `[0, field_width]`
pub fn clamp_displacement(bounds: Bounds, dx: f64, field_width: f64) -> f64 {
    dx + (-(bounds.x + dx)).max(0.0) - (bounds.right() + dx - field_width).max(0.0)
}

/// Attract-mode paddle driver: keeps the paddle under the ball
#[derive(Debug, Clone, Copy)]
pub struct Autopilot {
    /// Largest move per call (field units)
    pub max_step: f64,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self { max_step: 2.5 }
    }
}

impl Autopilot {
    /// Displacement that moves the paddle toward the ball.
    ///
    /// The aim point drifts across the paddle with `tick` so returns come
    /// off different parts of the arc instead of looping straight up.
    pub fn displacement(&self, ball: &Entity, paddle: &Entity, tick: u64) -> f64 {
        let paddle_bounds = paddle.bounds();
        let t = tick as f64 * 0.01;
        let drift = (t.sin() * 0.3 + (t * 0.7).sin() * 0.15) * paddle_bounds.width / 2.0;
        let target = ball.center().x + drift;
        (target - paddle_bounds.center().x).clamp(-self.max_step, self.max_step)
    }
}
