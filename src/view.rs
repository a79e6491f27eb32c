//! Headless consumer of the state feed
//!
//! `ShadowWorld` keeps its own copy of the world, rebuilt from snapshots
//! and patched by deltas; it never shares entities with the simulation.
//! `AsciiFrame` rasterises a shadow world to text for terminals and logs.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{BreakoutError, Result};
use crate::sim::entity::{Bounds, Entity, EntityId, EntityKind};
use crate::sim::state::{GameDelta, Observer, Snapshot, Update};

/// Consumer-side copy of the world
#[derive(Debug, Clone, Default)]
pub struct ShadowWorld {
    entities: BTreeMap<EntityId, Entity>,
    width: f64,
    height: f64,
    score: i64,
    paused: bool,
    game_over: bool,
    tick: u64,
    /// A snapshot has been applied at least once
    synced: bool,
}

impl ShadowWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, update: &Update) {
        match update {
            Update::Delta(delta) => self.apply_delta(delta),
            Update::Resync(snapshot) => self.apply_snapshot(snapshot),
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        self.entities = snapshot
            .entities
            .iter()
            .map(|e| (e.id, e.clone()))
            .collect();
        self.width = snapshot.width;
        self.height = snapshot.height;
        self.score = snapshot.score;
        self.paused = snapshot.paused;
        self.game_over = snapshot.game_over;
        self.tick = snapshot.tick;
        self.synced = true;
        log::debug!("Shadow world resynced at tick {}", snapshot.tick);
    }

    pub fn apply_delta(&mut self, delta: &GameDelta) {
        if !self.synced {
            log::warn!("Delta for tick {} before first resync", delta.tick);
        }
        for entity in &delta.destroyed {
            self.entities.remove(&entity.id);
        }
        for entity in &delta.added {
            self.entities.insert(entity.id, entity.clone());
        }
        for entity in &delta.moved {
            match self.entities.get_mut(&entity.id) {
                Some(slot) => slot.position = entity.position,
                None => {
                    log::warn!("Moved entity {} unknown to shadow world", entity.id);
                    self.entities.insert(entity.id, entity.clone());
                }
            }
        }
        self.score += delta.score_delta;
        self.paused ^= delta.pause_toggled;
        self.game_over ^= delta.game_over_toggled;
        self.tick = delta.tick;
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn first_of(&self, kind: EntityKind) -> Option<&Entity> {
        self.entities.values().find(|e| e.kind() == kind)
    }

    pub fn ball(&self) -> Option<&Entity> {
        self.first_of(EntityKind::Ball)
    }

    pub fn paddle(&self) -> Option<&Entity> {
        self.first_of(EntityKind::Paddle)
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.entities.values().filter(|e| e.kind() == kind).count()
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }
}

/// A shadow world can also subscribe directly (same thread as the engine)
impl Observer for ShadowWorld {
    fn on_delta(&mut self, delta: &GameDelta) {
        self.apply_delta(delta);
    }

    fn on_full_resync(&mut self, snapshot: &Snapshot) {
        self.apply_snapshot(snapshot);
    }
}

/// Character cell representation of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Ball,
    Brick,
    Paddle,
}

impl Glyph {
    pub fn char(self) -> char {
        match self {
            Glyph::Ball => 'o',
            Glyph::Brick => '#',
            Glyph::Paddle => '=',
        }
    }

    /// Later layers overwrite earlier ones
    fn layer(self) -> u8 {
        match self {
            Glyph::Brick => 0,
            Glyph::Paddle => 1,
            Glyph::Ball => 2,
        }
    }
}

impl TryFrom<&Entity> for Glyph {
    type Error = BreakoutError;

    fn try_from(entity: &Entity) -> Result<Self> {
        match entity.kind() {
            EntityKind::Ball => Ok(Glyph::Ball),
            EntityKind::Rectangle => Ok(Glyph::Brick),
            EntityKind::Paddle => Ok(Glyph::Paddle),
            // Sub-cell debris has no glyph at terminal resolution
            kind @ EntityKind::Particle => Err(BreakoutError::UnsupportedEntity { kind }),
        }
    }
}

/// Text rendering of a shadow world
#[derive(Debug, Clone)]
pub struct AsciiFrame {
    header: String,
    rows: Vec<Vec<char>>,
    /// Entities that could not be drawn
    pub skipped: usize,
}

impl AsciiFrame {
    pub fn render(world: &ShadowWorld, cols: usize, rows: usize) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let mut grid = vec![vec![' '; cols]; rows];
        let mut skipped = 0;

        let mut drawable: Vec<(Glyph, &Entity)> = Vec::with_capacity(world.len());
        for entity in world.entities() {
            match Glyph::try_from(entity) {
                Ok(glyph) => drawable.push((glyph, entity)),
                Err(err) => {
                    log::trace!("Skipping entity {}: {}", entity.id, err);
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            log::debug!("Frame at tick {} skipped {} entities", world.tick, skipped);
        }
        drawable.sort_by_key(|(glyph, _)| glyph.layer());

        if world.width > 0.0 && world.height > 0.0 {
            let field = Bounds::new(0.0, 0.0, world.width, world.height);
            drawable.retain(|(_, entity)| entity.bounds().intersects(&field));
            let sx = cols as f64 / world.width;
            let sy = rows as f64 / world.height;
            let cell = |v: f64, scale: f64, max: usize| -> usize {
                ((v * scale).floor().max(0.0) as usize).min(max - 1)
            };

            for (glyph, entity) in drawable {
                match glyph {
                    Glyph::Ball => {
                        let c = entity.center();
                        grid[cell(c.y, sy, rows)][cell(c.x, sx, cols)] = glyph.char();
                    }
                    Glyph::Brick | Glyph::Paddle => {
                        let b = entity.bounds();
                        let (c0, c1) = (cell(b.x, sx, cols), cell(b.right(), sx, cols));
                        let (r0, r1) = (cell(b.y, sy, rows), cell(b.bottom(), sy, rows));
                        for row in &mut grid[r0..=r1.max(r0)] {
                            for ch in &mut row[c0..=c1.max(c0)] {
                                *ch = glyph.char();
                            }
                        }
                    }
                }
            }
        }

        let status = if world.game_over {
            "GAME OVER"
        } else if world.paused {
            "PAUSED"
        } else {
            ""
        };
        Self {
            header: format!("tick {:>6}  score {:>4}  {}", world.tick, world.score, status),
            rows: grid,
            skipped,
        }
    }
}

impl fmt::Display for AsciiFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header.trim_end())?;
        let width = self.rows.first().map_or(0, Vec::len);
        let border: String = std::iter::repeat_n('-', width + 2).collect();
        writeln!(f, "{}", border)?;
        for row in &self.rows {
            let line: String = row.iter().collect();
            writeln!(f, "|{}|", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::vector::Vector2D;

    fn snapshot() -> Snapshot {
        Snapshot {
            tick: 10,
            width: 80.0,
            height: 130.0,
            entities: vec![
                Entity::rectangle(1, Vector2D::new(3.0, 3.0), 8.0, 4.0),
                Entity::ball(2, Vector2D::new(39.0, 64.0), 1.0),
                Entity::paddle(3, Vector2D::new(32.0, 126.8), 16.0, 1.6),
            ],
            score: 4,
            paused: false,
            game_over: false,
            time_factor: 1.0,
        }
    }

    #[test]
    fn test_snapshot_then_delta() {
        let mut world = ShadowWorld::new();
        world.apply(&Update::Resync(snapshot()));
        assert!(world.is_synced());
        assert_eq!(world.len(), 3);

        let mut moved_ball = Entity::ball(2, Vector2D::new(40.0, 62.0), 1.0);
        moved_ball.velocity = Vector2D::new(1.0, -2.0);
        let delta = GameDelta {
            tick: 11,
            added: vec![Entity::particle(4, Vector2D::new(7.0, 5.0), 0.3, 10)],
            destroyed: vec![Entity::rectangle(1, Vector2D::new(3.0, 3.0), 8.0, 4.0)],
            moved: vec![moved_ball],
            score_delta: 1,
            pause_toggled: true,
            game_over_toggled: false,
        };
        world.apply(&Update::Delta(delta));

        assert_eq!(world.tick(), 11);
        assert_eq!(world.score(), 5);
        assert!(world.is_paused());
        assert!(world.entity(1).is_none());
        assert_eq!(world.count(EntityKind::Particle), 1);
        assert_eq!(world.ball().unwrap().position, Vector2D::new(40.0, 62.0));
    }

    #[test]
    fn test_particle_has_no_glyph() {
        let particle = Entity::particle(9, Vector2D::ZERO, 0.3, 5);
        let err = Glyph::try_from(&particle).unwrap_err();
        assert!(matches!(
            err,
            BreakoutError::UnsupportedEntity {
                kind: EntityKind::Particle
            }
        ));
        let brick = Entity::rectangle(1, Vector2D::ZERO, 1.0, 1.0);
        assert_eq!(Glyph::try_from(&brick).unwrap(), Glyph::Brick);
    }

    #[test]
    fn test_render_reports_skipped() {
        let mut snap = snapshot();
        snap.entities.push(Entity::particle(4, Vector2D::new(7.0, 5.0), 0.3, 10));
        let mut world = ShadowWorld::new();
        world.apply_snapshot(&snap);

        let frame = AsciiFrame::render(&world, 40, 26);
        assert_eq!(frame.skipped, 1);
        let text = frame.to_string();
        // header + border + rows
        assert_eq!(text.lines().count(), 2 + 26);
        let grid: String = text.lines().skip(2).collect();
        assert!(grid.contains('o'));
        assert!(grid.contains('#'));
        assert!(grid.contains('='));
    }
}
