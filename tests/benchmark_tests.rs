//! Performance benchmarks for the relay hot paths

use client::reconciler::{Interpolation, ShadowTable};
use server::broadcast::{Dispatch, Outboxes};
use server::lifecycle::LifecycleManager;
use server::registry::Registry;
use server::spawn::SpawnPoint;
use shared::{ActorId, ActorState, Animation, ClientMessage, Movement, Position, ServerMessage};
use std::time::Instant;
use tokio::sync::mpsc;

/// Benchmarks wire encoding and decoding of movement intents
#[test]
fn benchmark_movement_codec() {
    let message = ClientMessage::PlayerMovement(Movement::new(
        Position::new(516.25, 230.5),
        Animation::Left,
    ));

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let text = message.encode().unwrap();
        let decoded = ClientMessage::decode(&text).unwrap();
        assert_eq!(decoded.event_name(), "playerMovement");
    }

    let duration = start.elapsed();
    println!(
        "Movement codec: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_secs() < 5);
}

/// Benchmarks registry updates against a populated table
#[test]
fn benchmark_registry_updates() {
    let mut registry = Registry::new();
    for id in 1..=1_000 {
        registry.upsert(ActorId(id), Position::new(0.0, 0.0), Animation::Down);
    }

    let iterations = 100_000u64;
    let start = Instant::now();

    for i in 0..iterations {
        let id = ActorId(i % 1_000 + 1);
        registry
            .update(id, Position::new(i as f32, 0.0), Animation::Right)
            .unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Registry updates: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert_eq!(registry.len(), 1_000);
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks fan-out of one movement to many recipients
#[test]
fn benchmark_broadcast_fanout() {
    let mut lifecycle = LifecycleManager::new(SpawnPoint::default());
    let mut outboxes = Outboxes::new();
    let mut receivers = Vec::new();

    let recipients = 500u64;
    for id in 1..=recipients {
        let (tx, rx) = mpsc::channel(4_096);
        outboxes.register(ActorId(id), tx);
        receivers.push(rx);
        lifecycle.connect(ActorId(id));
        lifecycle.handle_message(ActorId(id), ClientMessage::ClientReady);
    }
    // Drain join traffic
    for rx in receivers.iter_mut() {
        while rx.try_recv().is_ok() {}
    }

    let iterations = 1_000;
    let start = Instant::now();

    for i in 0..iterations {
        let dispatches: Vec<Dispatch> = lifecycle.handle_message(
            ActorId(1),
            ClientMessage::PlayerMovement(Movement::new(
                Position::new(i as f32, 0.0),
                Animation::Right,
            )),
        );
        let report = outboxes.deliver_all(&dispatches, lifecycle.registry());
        assert_eq!(report.queued, (recipients - 1) as usize);
    }

    let duration = start.elapsed();
    println!(
        "Broadcast fan-out: {} movements to {} recipients in {:?} ({:.2} μs/movement)",
        iterations,
        recipients - 1,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_secs() < 5);
}

/// Benchmarks interpolation of a crowded shadow table
#[test]
fn benchmark_shadow_tick() {
    let mut table = ShadowTable::new(Interpolation::default());
    for id in 1..=1_000u64 {
        let state = ActorState::new(ActorId(id), Position::new(0.0, 0.0), Animation::Down);
        table.apply(ServerMessage::NewPlayer(state));
        let target = ActorState::new(ActorId(id), Position::new(500.0, 500.0), Animation::Right);
        table.apply(ServerMessage::PlayerMoved(target));
    }

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        table.tick(1.0 / 60.0);
    }

    let duration = start.elapsed();
    println!(
        "Shadow tick: {} ticks over {} actors in {:?} ({:.2} μs/tick)",
        iterations,
        table.len(),
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(table.actors().all(|actor| actor.is_settled()));
    assert!(duration.as_secs() < 5);
}
