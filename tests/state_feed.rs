//! The delta feed across threads: a consumer fed by a running engine sees
//! every tick exactly once, in order, and its shadow world converges on the
//! authoritative registry.

use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use arc_breakout::EngineConfig;
use arc_breakout::sim::{Autopilot, Engine, OverflowPolicy, Update, channel_observer};
use arc_breakout::view::ShadowWorld;

fn fast_config() -> EngineConfig {
    EngineConfig {
        seed: Some(99),
        tick_millis: 1,
        restart_wait_ticks: 5,
        ..EngineConfig::default()
    }
}

#[test]
fn consumer_sees_every_tick_in_order() {
    let engine = Engine::new(fast_config()).unwrap();
    let (observer, feed) = channel_observer(16, OverflowPolicy::Block);
    engine.state().subscribe(Box::new(observer));

    let handle = engine.spawn().unwrap();
    let controller = handle.controller();
    let pilot = Autopilot::default();
    let mut world = ShadowWorld::new();
    let mut last_tick = None;
    let mut deltas = 0;

    let mut handle_update = |update: Update, world: &mut ShadowWorld| {
        let tick = match &update {
            Update::Delta(delta) => {
                deltas += 1;
                delta.tick
            }
            Update::Resync(snapshot) => snapshot.tick,
        };
        if let Some(last) = last_tick {
            assert_eq!(tick, last + 1, "tick {} followed {}", tick, last);
        }
        last_tick = Some(tick);
        world.apply(&update);
    };

    while world.tick() < 150 {
        let update = feed
            .recv_timeout(Duration::from_secs(5))
            .expect("engine stalled");
        handle_update(update, &mut world);
        if let (Some(ball), Some(paddle)) = (world.ball(), world.paddle()) {
            controller.move_paddle(pilot.displacement(ball, paddle, world.tick()));
        }
    }

    handle.stop();
    loop {
        match feed.recv_timeout(Duration::from_millis(50)) {
            Ok(update) => handle_update(update, &mut world),
            Err(RecvTimeoutError::Timeout) if handle.is_finished() => break,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    while let Ok(update) = feed.try_recv() {
        handle_update(update, &mut world);
    }

    let state = std::sync::Arc::clone(handle.state());
    let stats = handle.join().unwrap();
    assert_eq!(feed.dropped(), 0);
    assert_eq!(world.tick(), stats.ticks);
    assert!(deltas > 100);

    let authoritative = state.entity_list();
    assert_eq!(world.len(), authoritative.len());
    for entity in &authoritative {
        let shadow = world.entity(entity.id).expect("entity missing from shadow");
        assert_eq!(shadow.position, entity.position);
        assert_eq!(shadow.kind(), entity.kind());
    }
    assert_eq!(world.score(), state.score());
    assert_eq!(world.is_game_over(), state.is_game_over());
}

#[test]
fn slow_consumer_with_drop_policy_resyncs() {
    let mut engine = Engine::new(EngineConfig {
        restart_wait_ticks: 0,
        ..fast_config()
    })
    .unwrap();
    let (observer, feed) = channel_observer(2, OverflowPolicy::DropAndResync);
    engine.state().subscribe(Box::new(observer));

    // Nobody reads while ten ticks are produced
    for _ in 0..10 {
        engine.step();
    }
    assert!(feed.dropped() > 0);

    let mut world = ShadowWorld::new();
    while let Ok(update) = feed.try_recv() {
        world.apply(&update);
    }
    engine.step();
    match feed.try_recv() {
        Ok(Update::Resync(snapshot)) => {
            world.apply_snapshot(&snapshot);
            assert_eq!(snapshot.tick, engine.state().tick());
        }
        other => panic!("expected a resync after drops, got {:?}", other),
    }
    assert_eq!(world.len(), engine.state().entity_count());
    assert_eq!(world.ball().unwrap().position, engine.ball().position);
}
