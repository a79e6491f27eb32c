//! Fixed-tick simulation engine
//!
//! Owns the ball, paddle, bricks and debris, advances them one tick at a
//! time and publishes every change through the shared [`GameState`].
//! Between rounds the engine sits in `RestartWait` with everything frozen;
//! a round ends when the ball drops out of the bottom or the last brick
//! goes. The tick that ends a round still publishes its delta; the fresh
//! wall is laid out on the first `RestartWait` tick after it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::collision::{Contact, Field, bounce, first_collision};
use super::controller::{Controller, clamp_displacement};
use super::entity::{Entity, EntityId, Shape};
use super::state::GameState;
use super::vector::{Vector2D, Vector2DExt};
use crate::config::EngineConfig;
use crate::error::{BreakoutError, Result};

/// Engine-level state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    /// Between rounds: entities frozen until the countdown runs out
    RestartWait { ticks_remaining: u32 },
    /// Ball in play
    Running,
}

/// Why a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEnd {
    /// Ball left through the bottom of the field
    BallLost,
    /// Every brick destroyed
    LevelCleared,
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Phase the tick ran in
    pub phase: EnginePhase,
    /// Ball moved this tick
    pub advanced: bool,
    pub contact: Option<Contact>,
    pub round_end: Option<RoundEnd>,
}

/// Loop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub ticks: u64,
    /// Ticks whose processing exceeded the budget
    pub overruns: u64,
    pub rounds: u64,
    pub bricks_destroyed: u64,
}

pub struct Engine {
    config: EngineConfig,
    state: Arc<GameState>,
    field: Field,
    phase: EnginePhase,
    ball: Entity,
    paddle: Entity,
    /// Live bricks, in layout order (collision scan order)
    bricks: Vec<Entity>,
    particles: Vec<Entity>,
    rng: Pcg32,
    lives: u32,
    /// Next end-of-tick must send a full snapshot
    resync_pending: bool,
    /// Round ended last tick; lay out the next one before counting down
    reset_pending: bool,
    stats: EngineStats,
}

impl Engine {
    /// Build an engine and its shared state. Starts in `RestartWait` with
    /// the first wall already laid out.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        log::info!("Engine seed: {}", seed);

        let state = GameState::shared(config.field_width, config.field_height);
        let (px, py) = config.paddle_home();
        let paddle = Entity::paddle(
            state.next_entity_id(),
            Vector2D::new(px, py),
            config.paddle_width,
            config.paddle_height,
        );

        let mut engine = Self {
            field: Field {
                width: config.field_width,
                height: config.field_height,
                closed_floor: config.closed_floor,
            },
            phase: EnginePhase::RestartWait {
                ticks_remaining: config.restart_wait_ticks,
            },
            ball: Entity::ball(0, Vector2D::ZERO, config.ball_radius),
            paddle,
            bricks: Vec::new(),
            particles: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            lives: config.lives,
            resync_pending: true,
            reset_pending: false,
            stats: EngineStats::default(),
            state,
            config,
        };
        engine.reset_round();
        Ok(engine)
    }

    pub fn state(&self) -> &Arc<GameState> {
        &self.state
    }

    pub fn controller(&self) -> Controller {
        Controller::new(Arc::clone(&self.state))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The live paddle (controller target)
    pub fn paddle(&self) -> &Entity {
        &self.paddle
    }

    pub fn ball(&self) -> &Entity {
        &self.ball
    }

    /// Direct access for scripted setups (tests, demos); publishes nothing
    pub fn ball_mut(&mut self) -> &mut Entity {
        &mut self.ball
    }

    pub fn bricks(&self) -> &[Entity] {
        &self.bricks
    }

    pub fn particles(&self) -> &[Entity] {
        &self.particles
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Replace the brick wall (scripted setups). Observers resync next tick.
    pub fn set_bricks(&mut self, bricks: Vec<Entity>) {
        self.bricks = bricks;
        self.publish_all();
    }

    /// Skip the restart countdown so the next tick runs
    pub fn start_now(&mut self) {
        self.phase = EnginePhase::RestartWait { ticks_remaining: 0 };
    }

    /// Advance exactly one tick (no sleeping)
    pub fn step(&mut self) -> TickReport {
        let mut report = TickReport {
            phase: self.phase,
            advanced: false,
            contact: None,
            round_end: None,
        };

        if std::mem::take(&mut self.reset_pending) {
            self.reset_round();
        }

        let paused = self.state.is_paused();
        self.apply_paddle_input();

        match self.phase {
            EnginePhase::RestartWait { .. } if paused => {}
            EnginePhase::RestartWait { ticks_remaining: 0 } => self.begin_round(),
            EnginePhase::RestartWait { ticks_remaining } => {
                self.phase = EnginePhase::RestartWait {
                    ticks_remaining: ticks_remaining - 1,
                };
            }
            EnginePhase::Running if paused => {}
            EnginePhase::Running => {
                report.advanced = true;
                report.contact = self.advance();
                if let Some(end) = self.round_end() {
                    self.finish_round(end);
                    report.round_end = Some(end);
                }
            }
        }

        let use_delta = !std::mem::take(&mut self.resync_pending);
        self.state.end_tick_with(use_delta);
        self.stats.ticks += 1;
        report
    }

    /// Real-time loop: one tick per budget until `stop` is raised.
    /// `stop` is only checked between ticks.
    pub fn run(&mut self, stop: &AtomicBool) -> EngineStats {
        let budget = self.config.tick_budget();
        log::info!("Simulation loop started ({}ms ticks)", budget.as_millis());

        while !stop.load(Ordering::Acquire) {
            let start = Instant::now();
            self.step();
            let elapsed = start.elapsed();

            if elapsed < budget {
                thread::sleep(budget - elapsed);
            } else {
                self.stats.overruns += 1;
                log::warn!(
                    "Tick {} overran budget: {:?} > {:?}",
                    self.stats.ticks,
                    elapsed,
                    budget
                );
            }
        }

        log::info!(
            "Simulation loop stopped after {} ticks ({} overruns)",
            self.stats.ticks,
            self.stats.overruns
        );
        self.stats
    }

    /// Move the engine onto its own thread
    pub fn spawn(self) -> Result<EngineHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let state = Arc::clone(&self.state);
        let paddle_id = self.paddle.id;
        let thread_stop = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("simulation".into())
            .spawn(move || {
                let mut engine = self;
                engine.run(&thread_stop)
            })
            .map_err(BreakoutError::Spawn)?;

        Ok(EngineHandle {
            stop,
            thread,
            state,
            paddle_id,
        })
    }

    fn apply_paddle_input(&mut self) {
        let dx = self.state.take_paddle_displacement();
        if dx == 0.0 {
            return;
        }
        let dx = clamp_displacement(self.paddle.bounds(), dx, self.field.width);
        if dx != 0.0 {
            self.paddle.translate(Vector2D::new(dx, 0.0));
            self.state.add_moved(&self.paddle);
        }
    }

    /// Move the ball, resolve at most one collision, integrate debris
    fn advance(&mut self) -> Option<Contact> {
        let time_factor = self.state.time_factor();

        self.ball.translate(self.ball.velocity.scale(time_factor));

        let circle = self.ball.circle()?;
        let hit = first_collision(circle, self.field, Some(&self.paddle), &self.bricks);
        if let Some(hit) = hit {
            self.ball.translate(hit.mtv);
            self.ball.velocity = bounce(self.ball.velocity, hit.mtv);
            log::trace!("Ball hit {:?}, mtv {:?}", hit.contact, hit.mtv);

            if let Contact::Brick(id) = hit.contact {
                self.destroy_brick(id);
            }
        }
        self.state.add_moved(&self.ball);

        self.update_particles(time_factor);
        hit.map(|h| h.contact)
    }

    fn destroy_brick(&mut self, id: EntityId) {
        let Some(index) = self.bricks.iter().position(|b| b.id == id) else {
            return;
        };
        let brick = self.bricks.remove(index);
        if self.state.remove(id).is_none() {
            log::warn!("Brick {} was not registered", id);
            return;
        }
        self.state.add_score(1);
        self.stats.bricks_destroyed += 1;
        log::debug!("Brick {} destroyed, {} left", id, self.bricks.len());
        self.spawn_debris(brick.center());
    }

    fn spawn_debris(&mut self, origin: Vector2D) {
        let radius = self.config.debris_radius;
        for _ in 0..self.config.debris_particles {
            let angle = self.rng.random_range(0.0..std::f64::consts::TAU);
            let speed = self.rng.random_range(0.2..0.8);
            let mut particle = Entity::particle(
                self.state.next_entity_id(),
                origin - Vector2D::splat(radius),
                radius,
                self.config.debris_ttl_ticks,
            );
            particle.velocity = Vector2D::new(0.0, -speed).rotated(angle);
            particle.acceleration = Vector2D::new(0.0, self.config.debris_gravity);
            self.state.add(particle.clone());
            self.particles.push(particle);
        }
    }

    fn update_particles(&mut self, time_factor: f64) {
        let height = self.field.height;
        let state = &self.state;
        self.particles.retain_mut(|p| {
            p.velocity += p.acceleration * time_factor;
            p.position += p.velocity * time_factor;
            let alive = match &mut p.shape {
                Shape::Particle { ttl, .. } => {
                    *ttl = ttl.saturating_sub(1);
                    *ttl > 0
                }
                _ => false,
            };
            if alive && p.y() <= height {
                state.add_moved(p);
                true
            } else {
                state.remove(p.id);
                false
            }
        });
    }

    fn round_end(&self) -> Option<RoundEnd> {
        if self.ball.y() > self.field.height {
            Some(RoundEnd::BallLost)
        } else if self.bricks.is_empty() {
            Some(RoundEnd::LevelCleared)
        } else {
            None
        }
    }

    fn finish_round(&mut self, end: RoundEnd) {
        self.stats.rounds += 1;
        match end {
            RoundEnd::BallLost => {
                self.lives = self.lives.saturating_sub(1);
                if self.lives == 0 {
                    log::info!("Game over, final score {}", self.state.score());
                    self.state.set_game_over(true);
                } else {
                    log::info!("Ball lost, {} lives left", self.lives);
                }
            }
            RoundEnd::LevelCleared => {
                log::info!("Level cleared, score {}", self.state.score());
                self.state.set_game_over(true);
            }
        }
        self.reset_pending = true;
        self.phase = EnginePhase::RestartWait {
            ticks_remaining: self.config.restart_wait_ticks,
        };
    }

    /// Countdown over: clear a finished game and put the ball in play
    fn begin_round(&mut self) {
        if self.state.is_game_over() {
            self.state.set_game_over(false);
            if self.lives == 0 {
                self.lives = self.config.lives;
                self.state.set_score(0);
            }
        }
        self.phase = EnginePhase::Running;
        log::info!(
            "Round {} started: {} bricks, {} lives",
            self.stats.rounds + 1,
            self.bricks.len(),
            self.lives
        );
    }

    /// Fresh wall, fresh ball, re-centred paddle, no debris
    fn reset_round(&mut self) {
        let state = Arc::clone(&self.state);
        self.bricks = generate_bricks(&self.config, || state.next_entity_id());
        self.particles.clear();
        self.ball = self.create_ball();
        let (px, py) = self.config.paddle_home();
        self.paddle.set_position(Vector2D::new(px, py));
        self.publish_all();
    }

    fn publish_all(&mut self) {
        let entities = self
            .bricks
            .iter()
            .chain(self.particles.iter())
            .chain([&self.ball, &self.paddle])
            .cloned();
        self.state.reset_entities(entities);
        self.resync_pending = true;
    }

    /// Centred ball heading downward within the launch spread
    fn create_ball(&mut self) -> Entity {
        let r = self.config.ball_radius;
        let mut ball = Entity::ball(
            self.state.next_entity_id(),
            Vector2D::new(
                self.config.field_width / 2.0 - r,
                self.config.field_height / 2.0 - r,
            ),
            r,
        );
        let spread = self.config.launch_spread.abs();
        let angle = self.rng.random_range(-spread..=spread);
        ball.velocity = Vector2D::new(0.0, self.config.ball_speed).rotated(angle);
        ball
    }
}

/// Lay out the brick wall: evenly padded rows and columns in the top
/// portion of the field, in row-major order
pub fn generate_bricks(
    config: &EngineConfig,
    mut next_id: impl FnMut() -> EntityId,
) -> Vec<Entity> {
    let cols = config.brick_cols;
    let rows = config.brick_rows;
    let col_padding =
        (config.field_width - f64::from(cols) * config.brick_width) / (f64::from(cols) + 1.0);
    let row_padding = (config.field_height * config.brick_area_fraction
        - f64::from(rows) * config.brick_height)
        / (f64::from(rows) + 1.0);

    let mut bricks = Vec::with_capacity(rows as usize * cols as usize);
    let mut y = row_padding;
    for _ in 0..rows {
        let mut x = col_padding;
        for _ in 0..cols {
            bricks.push(Entity::rectangle(
                next_id(),
                Vector2D::new(x, y),
                config.brick_width,
                config.brick_height,
            ));
            x += config.brick_width + col_padding;
        }
        y += config.brick_height + row_padding;
    }
    bricks
}

/// Running engine thread
pub struct EngineHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<EngineStats>,
    state: Arc<GameState>,
    paddle_id: EntityId,
}

impl EngineHandle {
    pub fn state(&self) -> &Arc<GameState> {
        &self.state
    }

    pub fn controller(&self) -> Controller {
        Controller::new(Arc::clone(&self.state))
    }

    /// Latest published paddle
    pub fn paddle(&self) -> Option<Entity> {
        self.state.entity(self.paddle_id)
    }

    /// Ask the loop to stop after the current tick
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Stop and wait for the loop
    pub fn join(self) -> Result<EngineStats> {
        self.stop();
        self.thread.join().map_err(|_| BreakoutError::EngineThread)
    }
}
