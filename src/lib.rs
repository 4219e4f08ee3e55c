//! Switchyard: a single-threaded event and state dispatch runtime
//!
//! Switchyard routes calls by key. Every key owns a slot of subscribers taking
//! zero to four typed arguments, and every slot remembers whether it fired
//! since it was last asked. Event buses and tick-driven state machines are
//! both built from tables of such slots.
//!
//! # Core Concepts
//!
//! - **Keys**: value-compared names of events and states, declared with
//!   `key_enum!` or `key_marker!`
//! - **Callback tables**: keyed slots with strict or lenient key policies
//! - **Owners**: types declaring `on`, `update`, `enter` and `exit` handlers
//!   once, attached and detached as a whole
//! - **State machines**: deferred state changes processed one tick at a time
//!
//! # Example
//!
//! ```rust
//! use switchyard::bus::EventBus;
//! use switchyard::callback::{Bindings, Owner};
//! use switchyard::machine::StateMachine;
//! use switchyard::callback::KeyPolicy;
//! use switchyard::key_enum;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! key_enum! {
//!     enum Mode {
//!         Waiting,
//!         Playing,
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Game {
//!     score: i32,
//!     log: Vec<&'static str>,
//! }
//!
//! impl Game {
//!     fn on_score(&mut self, points: i32) {
//!         self.score += points;
//!     }
//!
//!     fn enter_playing(&mut self) {
//!         self.log.push("playing");
//!     }
//! }
//!
//! impl Owner for Game {
//!     fn bindings(bindings: &mut Bindings<Self>) {
//!         bindings
//!             .on("Score", Game::on_score)
//!             .enter(Mode::Playing, Game::enter_playing);
//!     }
//! }
//!
//! let game = Rc::new(RefCell::new(Game::default()));
//!
//! let mut machine = StateMachine::from_source::<Mode>(KeyPolicy::Strict);
//! machine.attach_owner(&game).unwrap();
//!
//! let mut bus = EventBus::default();
//! bus.register("Score", |_: i32| {}).unwrap();
//! bus.attach_owner(&game).unwrap();
//!
//! machine.change_state(Mode::Playing, true).unwrap();
//! machine.tick().unwrap();
//! bus.emit("Score", (3,)).unwrap();
//!
//! assert_eq!(game.borrow().log, vec!["playing"]);
//! assert_eq!(game.borrow().score, 3);
//! ```

pub mod builder;
pub mod bus;
pub mod callback;
pub mod core;
pub mod machine;

// Re-export commonly used types
pub use builder::{BuildError, DispatchConfig, EventBusBuilder, StateMachineBuilder};
pub use bus::EventBus;
pub use callback::{CallbackTable, DispatchError, KeyPolicy, Owner};
pub use crate::core::{Key, KeySource};
pub use machine::{StateHandle, StateMachine};
