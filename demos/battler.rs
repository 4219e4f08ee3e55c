//! Battler
//!
//! This example drives a turn-based fighter through its states.
//!
//! Key concepts:
//! - Marker key sources with inheritance (`Hero: Battler`)
//! - An owner declaring update, enter and exit handlers
//! - State changes requested from inside a tick through a `StateHandle`
//! - A guard keeping the fighter in its ending state
//! - Machine settings loaded from JSON
//!
//! Run with: RUST_LOG=debug cargo run --example battler

use std::cell::RefCell;
use std::rc::Rc;
use switchyard::builder::{DispatchConfig, StateMachineBuilder};
use switchyard::callback::{Bindings, Owner};
use switchyard::core::{Guard, Key, SourceRegistry};
use switchyard::key_marker;
use switchyard::machine::StateHandle;
use tracing_subscriber::EnvFilter;

key_marker! {
    struct Battler {
        Idle,
        Thinking,
        Acting,
        Ending,
    }
}

key_marker! {
    struct Hero: Battler {
        Casting,
    }
}

const CONFIG: &str = r#"{
    "policy": "strict",
    "label": "hero",
    "states": "hero",
    "initial": "Idle",
    "history_limit": 16
}"#;

struct Fighter {
    states: StateHandle,
    health: i32,
    mana: i32,
    wait: u32,
}

impl Fighter {
    fn update_idle(&mut self) {
        self.wait += 1;
        if self.wait >= 2 {
            self.wait = 0;
            self.request(Battler::Thinking);
        }
    }

    fn update_thinking(&mut self) {
        if self.mana >= 5 {
            self.request(Hero::Casting);
        } else {
            self.request(Battler::Acting);
        }
    }

    fn enter_acting(&mut self) {
        println!("  trades blows (mana {})", self.mana);
        self.mana += 2;
        self.health -= 4;
    }

    fn update_acting(&mut self) {
        let next = if self.health <= 0 { Battler::Ending } else { Battler::Idle };
        self.request(next);
    }

    fn enter_casting(&mut self) {
        println!("  casts a spell (mana {})", self.mana);
        self.mana = 0;
        self.health -= 4;
    }

    fn update_casting(&mut self) {
        self.update_acting();
    }

    fn exit_casting(&mut self) {
        println!("  spell fades");
    }

    fn enter_ending(&mut self) {
        println!("  falls with {} health", self.health);
    }

    fn request(&self, state: &str) {
        if let Err(error) = self.states.change_state(state, false) {
            println!("  cannot change state: {error}");
        }
    }
}

impl Owner for Fighter {
    fn bindings(bindings: &mut Bindings<Self>) {
        bindings
            .update(Battler::Idle, Fighter::update_idle)
            .update(Battler::Thinking, Fighter::update_thinking)
            .update(Battler::Acting, Fighter::update_acting)
            .enter(Battler::Acting, Fighter::enter_acting)
            .update(Hero::Casting, Fighter::update_casting)
            .enter(Hero::Casting, Fighter::enter_casting)
            .exit(Hero::Casting, Fighter::exit_casting)
            .enter(Battler::Ending, Fighter::enter_ending);
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
    println!("=== Battler ===\n");

    let mut registry = SourceRegistry::new();
    registry.register::<Battler>("battler").register::<Hero>("hero");
    let config = DispatchConfig::from_json(CONFIG)?;

    let mut machine = StateMachineBuilder::from_config(&config, &registry)?
        .guard(Guard::new(|from: &Key, _: &Key| from != Battler::Ending))
        .build()?;

    let fighter = Rc::new(RefCell::new(Fighter {
        states: machine.handle(),
        health: 12,
        mana: 1,
        wait: 0,
    }));
    let bound = machine.attach_owner(&fighter)?;
    println!("Bound {bound} handlers\n");

    machine.set_on_state_changed(|from, to| println!("{from} -> {to}"));
    machine.on_transition(Battler::Ending, Battler::Idle, || {
        println!("  revived");
    })?;

    for _ in 0..20 {
        machine.tick()?;
        if machine.is_state([Battler::Ending]) && !machine.is_state_changed() {
            break;
        }
    }

    // Forced requests bypass guards.
    machine.change_state(Battler::Idle, true)?;
    machine.tick()?;

    machine.detach_owner(&fighter);
    println!("\nPath:");
    for state in machine.history().path() {
        println!("  {state}");
    }
    println!("\n=== Example Complete ===");
    Ok(())
}
