//! Shared game state and the per-tick delta feed
//!
//! `GameState` is the one place the simulation thread and its consumers
//! meet. The engine is the only writer of entity positions, membership and
//! score; the controller only writes the pause flag, the time factor and a
//! queued paddle displacement. Every change is folded into the current
//! [`GameDelta`] under a single lock. At the end of each tick the engine
//! calls [`GameState::end_tick`], which swaps in an empty delta and hands
//! the finished one to every observer, in production order.
//!
//! Observers receive `&GameDelta`: the borrow ends with the callback, so
//! anything kept past it must be copied out. Newly subscribed observers, and
//! every observer after a discontinuous change (`end_tick_with(false)`),
//! get a full [`Snapshot`] instead.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{
    self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError,
};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityId};

/// World changes accumulated during one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameDelta {
    /// Tick this delta was published at
    pub tick: u64,
    pub added: Vec<Entity>,
    /// Last known state of each removed entity
    pub destroyed: Vec<Entity>,
    /// Entities whose position changed (shape unchanged), latest state only
    pub moved: Vec<Entity>,
    pub score_delta: i64,
    /// XOR flags: set when the flag flipped an odd number of times this tick
    pub pause_toggled: bool,
    pub game_over_toggled: bool,
}

impl GameDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.destroyed.is_empty()
            && self.moved.is_empty()
            && self.score_delta == 0
            && !self.pause_toggled
            && !self.game_over_toggled
    }

    fn record_added(&mut self, entity: Entity) {
        self.destroyed.retain(|e| e.id != entity.id);
        upsert(&mut self.added, entity);
    }

    fn record_destroyed(&mut self, entity: Entity) {
        self.moved.retain(|e| e.id != entity.id);
        let before = self.added.len();
        self.added.retain(|e| e.id != entity.id);
        // Added and removed within one tick: the consumer never needs to know
        if self.added.len() == before {
            upsert(&mut self.destroyed, entity);
        }
    }

    fn record_moved(&mut self, entity: &Entity) {
        if let Some(added) = self.added.iter_mut().find(|e| e.id == entity.id) {
            *added = entity.clone();
            return;
        }
        upsert(&mut self.moved, entity.clone());
    }

    /// Whether an entity is listed as destroyed in this delta
    pub fn destroys(&self, id: EntityId) -> bool {
        self.destroyed.iter().any(|e| e.id == id)
    }
}

fn upsert(list: &mut Vec<Entity>, entity: Entity) {
    match list.iter_mut().find(|e| e.id == entity.id) {
        Some(slot) => *slot = entity,
        None => list.push(entity),
    }
}

/// Full copy of the world, for observers that need to rebuild from scratch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub width: f64,
    pub height: f64,
    /// Live entities in id order
    pub entities: Vec<Entity>,
    pub score: i64,
    pub paused: bool,
    pub game_over: bool,
    pub time_factor: f64,
}

/// Consumer of the state feed.
///
/// Callbacks run on the simulation thread while the observer registry is
/// locked: they may read or write `GameState` flags but must not call
/// `subscribe` or `end_tick`.
pub trait Observer: Send {
    fn on_delta(&mut self, delta: &GameDelta);

    fn on_full_resync(&mut self, snapshot: &Snapshot);

    /// Ask for a snapshot instead of the next delta (e.g. after dropping one)
    fn needs_resync(&self) -> bool {
        false
    }
}

struct Inner {
    entities: BTreeMap<EntityId, Entity>,
    delta: GameDelta,
    paused: bool,
    game_over: bool,
    score: i64,
    time_factor: f64,
    paddle_displacement: f64,
    tick: u64,
    next_id: EntityId,
}

impl Inner {
    fn snapshot(&self, width: f64, height: f64) -> Snapshot {
        Snapshot {
            tick: self.tick,
            width,
            height,
            entities: self.entities.values().cloned().collect(),
            score: self.score,
            paused: self.paused,
            game_over: self.game_over,
            time_factor: self.time_factor,
        }
    }
}

/// Process-wide game state, shared as `Arc<GameState>`
pub struct GameState {
    width: f64,
    height: f64,
    inner: Mutex<Inner>,
    /// Lock order: `observers`, then `pending`, then `inner`
    observers: Mutex<Vec<Box<dyn Observer>>>,
    /// Subscribed since the last `end_tick`; never held while delivering
    pending: Mutex<Vec<Box<dyn Observer>>>,
    subscribed: AtomicUsize,
}

impl GameState {
    /// Field dimensions are fixed here and never change afterwards
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            inner: Mutex::new(Inner {
                entities: BTreeMap::new(),
                delta: GameDelta::default(),
                paused: false,
                game_over: false,
                score: 0,
                time_factor: 1.0,
                paddle_displacement: 0.0,
                tick: 0,
                next_id: 1,
            }),
            observers: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            subscribed: AtomicUsize::new(0),
        }
    }

    pub fn shared(width: f64, height: f64) -> Arc<Self> {
        Arc::new(Self::new(width, height))
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&self) -> EntityId {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        id
    }

    /// Copy of the authoritative registry, in id order
    pub fn entity_list(&self) -> Vec<Entity> {
        self.inner.lock().entities.values().cloned().collect()
    }

    pub fn entity(&self, id: EntityId) -> Option<Entity> {
        self.inner.lock().entities.get(&id).cloned()
    }

    pub fn entity_count(&self) -> usize {
        self.inner.lock().entities.len()
    }

    /// Register a new entity and record it as added
    pub fn add(&self, entity: Entity) {
        let mut inner = self.inner.lock();
        inner.entities.insert(entity.id, entity.clone());
        inner.delta.record_added(entity);
    }

    /// Remove an entity and record it as destroyed.
    /// Returns `None` (and records nothing) if it was already gone.
    pub fn remove(&self, id: EntityId) -> Option<Entity> {
        let mut inner = self.inner.lock();
        let removed = inner.entities.remove(&id)?;
        inner.delta.record_destroyed(removed.clone());
        Some(removed)
    }

    /// Publish a live entity's new position
    pub fn add_moved(&self, entity: &Entity) {
        let mut inner = self.inner.lock();
        match inner.entities.get_mut(&entity.id) {
            Some(slot) => {
                *slot = entity.clone();
                inner.delta.record_moved(entity);
            }
            None => log::trace!("Ignoring move of unregistered entity {}", entity.id),
        }
    }

    /// Replace the whole registry without recording per-entity changes.
    /// Follow with `end_tick_with(false)` so observers resync.
    pub fn reset_entities(&self, entities: impl IntoIterator<Item = Entity>) {
        let mut inner = self.inner.lock();
        inner.entities = entities.into_iter().map(|e| (e.id, e)).collect();
        inner.delta.added.clear();
        inner.delta.destroyed.clear();
        inner.delta.moved.clear();
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }

    pub fn set_paused(&self, paused: bool) {
        let mut inner = self.inner.lock();
        if inner.paused != paused {
            inner.paused = paused;
            inner.delta.pause_toggled ^= true;
        }
    }

    /// Flip the pause flag, returning the new value
    pub fn toggle_pause(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.paused = !inner.paused;
        inner.delta.pause_toggled ^= true;
        inner.paused
    }

    pub fn is_game_over(&self) -> bool {
        self.inner.lock().game_over
    }

    pub fn set_game_over(&self, game_over: bool) {
        let mut inner = self.inner.lock();
        if inner.game_over != game_over {
            inner.game_over = game_over;
            inner.delta.game_over_toggled ^= true;
        }
    }

    pub fn score(&self) -> i64 {
        self.inner.lock().score
    }

    pub fn set_score(&self, score: i64) {
        let mut inner = self.inner.lock();
        inner.delta.score_delta += score - inner.score;
        inner.score = score;
    }

    pub fn add_score(&self, points: i64) {
        let mut inner = self.inner.lock();
        inner.score += points;
        inner.delta.score_delta += points;
    }

    pub fn time_factor(&self) -> f64 {
        self.inner.lock().time_factor
    }

    /// Set the velocity multiplier. Negative or non-finite values are ignored.
    pub fn set_time_factor(&self, factor: f64) {
        if !(factor.is_finite() && factor >= 0.0) {
            log::warn!("Ignoring invalid time factor {}", factor);
            return;
        }
        self.inner.lock().time_factor = factor;
    }

    /// Queue a horizontal paddle displacement for the engine to apply
    pub fn push_paddle_displacement(&self, dx: f64) {
        if dx.is_finite() {
            self.inner.lock().paddle_displacement += dx;
        }
    }

    /// Take (and clear) the queued paddle displacement
    pub fn take_paddle_displacement(&self) -> f64 {
        std::mem::take(&mut self.inner.lock().paddle_displacement)
    }

    /// Number of ticks published so far
    pub fn tick(&self) -> u64 {
        self.inner.lock().tick
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.lock().snapshot(self.width, self.height)
    }

    /// Register an observer; it immediately receives a full resync and
    /// joins delivery from the next `end_tick`.
    ///
    /// Does not wait on a delivery in progress, so a consumer thread may
    /// subscribe while the engine is blocked on that consumer's full queue.
    pub fn subscribe(&self, mut observer: Box<dyn Observer>) {
        let mut pending = self.pending.lock();
        let snapshot = self.snapshot();
        observer.on_full_resync(&snapshot);
        pending.push(observer);
        let total = self.subscribed.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("Observer subscribed at tick {} ({} total)", snapshot.tick, total);
    }

    pub fn observer_count(&self) -> usize {
        self.subscribed.load(Ordering::Relaxed)
    }

    /// Publish this tick's delta and start an empty one
    pub fn end_tick(&self) {
        self.end_tick_with(true);
    }

    /// Close the tick. With `use_delta == false` every observer gets a full
    /// snapshot instead of the delta (after discontinuous changes).
    pub fn end_tick_with(&self, use_delta: bool) {
        let mut observers = self.observers.lock();

        let (delta, snapshot) = {
            // Held until the tick is closed: a concurrent subscriber either
            // joins this delivery or snapshots after it
            let mut pending = self.pending.lock();
            observers.append(&mut pending);
            let wants_snapshot = !use_delta || observers.iter().any(|o| o.needs_resync());
            let mut inner = self.inner.lock();
            inner.tick += 1;
            let mut delta = std::mem::take(&mut inner.delta);
            delta.tick = inner.tick;
            let snapshot = wants_snapshot.then(|| inner.snapshot(self.width, self.height));
            (delta, snapshot)
        };

        for observer in observers.iter_mut() {
            match &snapshot {
                Some(snapshot) if !use_delta || observer.needs_resync() => {
                    observer.on_full_resync(snapshot)
                }
                _ => observer.on_delta(&delta),
            }
        }
    }
}

/// Owned message carried over a [`ChannelObserver`]
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Delta(GameDelta),
    Resync(Snapshot),
}

/// What a [`ChannelObserver`] does when its queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Wait for the consumer (backpressure on the simulation); never drops.
    /// The engine stalls inside `end_tick` until the consumer reads, which
    /// also delays delivery to every other observer.
    #[default]
    Block,
    /// Drop the delta, count it, and request a full resync next tick
    DropAndResync,
}

/// Observer that forwards copies of every update over a bounded queue,
/// decoupling the consumer thread from the simulation thread
pub struct ChannelObserver {
    tx: SyncSender<Update>,
    policy: OverflowPolicy,
    dropped: Arc<AtomicU64>,
    resync_pending: bool,
    disconnected: bool,
}

/// Receiving end of a [`ChannelObserver`]
pub struct UpdateFeed {
    rx: Receiver<Update>,
    dropped: Arc<AtomicU64>,
}

/// Create a bounded update queue of `capacity` messages
pub fn channel_observer(
    capacity: usize,
    policy: OverflowPolicy,
) -> (ChannelObserver, UpdateFeed) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        ChannelObserver {
            tx,
            policy,
            dropped: Arc::clone(&dropped),
            resync_pending: false,
            disconnected: false,
        },
        UpdateFeed { rx, dropped },
    )
}

impl ChannelObserver {
    /// Returns false if the message was not queued
    fn deliver(&mut self, update: Update) -> bool {
        if self.disconnected {
            return false;
        }
        let result = match self.policy {
            OverflowPolicy::Block => self
                .tx
                .send(update)
                .map_err(|_| TrySendError::Disconnected(())),
            OverflowPolicy::DropAndResync => self.tx.try_send(update).map_err(|e| match e {
                TrySendError::Full(_) => TrySendError::Full(()),
                TrySendError::Disconnected(_) => TrySendError::Disconnected(()),
            }),
        };
        match result {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::warn!(
                    "Update queue full, dropped delta ({} total), resync requested",
                    dropped
                );
                self.resync_pending = true;
                false
            }
            Err(TrySendError::Disconnected(())) => {
                log::debug!("Update feed receiver dropped, detaching");
                self.disconnected = true;
                false
            }
        }
    }
}

impl Observer for ChannelObserver {
    fn on_delta(&mut self, delta: &GameDelta) {
        self.deliver(Update::Delta(delta.clone()));
    }

    fn on_full_resync(&mut self, snapshot: &Snapshot) {
        if self.deliver(Update::Resync(snapshot.clone())) {
            self.resync_pending = false;
        }
    }

    fn needs_resync(&self) -> bool {
        self.resync_pending && !self.disconnected
    }
}

impl UpdateFeed {
    /// Block until the next update; `None` once the simulation side is gone
    pub fn recv(&self) -> Option<Update> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Update, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Result<Update, TryRecvError> {
        self.rx.try_recv()
    }

    /// Deltas dropped on overflow so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
