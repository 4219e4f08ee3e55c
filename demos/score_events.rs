//! Score Events
//!
//! This example routes game events through an event bus.
//!
//! Key concepts:
//! - Enum key sources and strict buses
//! - Handlers of different arities on one event
//! - Owners attached and detached as a whole
//! - Self-resetting fired flags
//! - Dynamic argument lists
//!
//! Run with: RUST_LOG=trace cargo run --example score_events

use std::cell::RefCell;
use std::rc::Rc;
use switchyard::builder::EventBusBuilder;
use switchyard::callback::{ArgList, Bindings, Owner};
use switchyard::key_enum;
use tracing_subscriber::EnvFilter;

key_enum! {
    enum GameEvent {
        Score,
        Combo,
        Reset,
    }
}

#[derive(Default)]
struct Scoreboard {
    total: i64,
    best_combo: u32,
}

impl Scoreboard {
    fn on_score(&mut self, points: i64) {
        self.total += points;
    }

    fn on_combo(&mut self, length: u32, multiplier: f32) {
        self.best_combo = self.best_combo.max(length);
        println!("  combo x{length} at {multiplier:.1}");
    }

    fn on_reset(&mut self) {
        self.total = 0;
    }
}

impl Owner for Scoreboard {
    fn bindings(bindings: &mut Bindings<Self>) {
        bindings
            .on(GameEvent::Score, Scoreboard::on_score)
            .on(GameEvent::Combo, Scoreboard::on_combo)
            .on(GameEvent::Reset, Scoreboard::on_reset);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    println!("=== Score Events ===\n");

    let board = Rc::new(RefCell::new(Scoreboard::default()));
    let mut bus = EventBusBuilder::new()
        .events::<GameEvent>()
        .owner(&board)
        .build()?;

    bus.register(GameEvent::Score, |points: i64| println!("  +{points}"))?;
    bus.register(GameEvent::Score, || println!("  (someone scored)"))?;

    bus.emit(GameEvent::Score, (10_i64,))?;
    bus.emit(GameEvent::Score, ())?;
    bus.emit_list(GameEvent::Combo, &ArgList::new().arg(4_u32).arg(1.5_f32))?;
    println!("Total: {}", board.borrow().total);

    println!("\nFired flags:");
    println!("  Score fired: {}", bus.has_fired(GameEvent::Score));
    println!("  Score fired again: {}", bus.has_fired(GameEvent::Score));

    if let Err(error) = bus.register("Pause", || {}) {
        println!("\nStrict bus: {error}");
    }
    if let Err(error) = bus.emit(GameEvent::Score, ("ten",)) {
        println!("Wrong arguments: {error}");
    }

    bus.emit(GameEvent::Reset, ())?;
    bus.detach_owner(&board);
    bus.emit(GameEvent::Score, (5_i64,))?;
    println!("\nAfter detach the board stays at {}", board.borrow().total);
    println!("Best combo: {}", board.borrow().best_combo);

    println!("\n=== Example Complete ===");
    Ok(())
}
