//! Builder for constructing event buses.

use super::config::{resolve, DispatchConfig};
use super::error::BuildError;
use crate::bus::EventBus;
use crate::callback::{DispatchError, KeyPolicy, Owner};
use crate::core::{Key, KeySource, SourceRegistry};
use std::cell::RefCell;
use std::rc::Rc;

type Attach = Box<dyn FnOnce(&mut EventBus) -> Result<usize, DispatchError>>;

/// Builder for [`EventBus`].
#[derive(Default)]
pub struct EventBusBuilder {
    policy: KeyPolicy,
    events: Option<Vec<Key>>,
    owners: Vec<Attach>,
}

impl EventBusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DispatchConfig, registry: &SourceRegistry) -> Result<Self, BuildError> {
        Ok(Self {
            policy: config.policy,
            events: resolve(registry, config.events.as_deref())?,
            owners: Vec::new(),
        })
    }

    pub fn policy(mut self, policy: KeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Declare the keys of `S` as the bus's event set.
    pub fn events<S: KeySource>(mut self) -> Self {
        self.events.get_or_insert_with(Vec::new).extend(S::keys());
        self
    }

    pub fn owner<O: Owner>(mut self, owner: &Rc<RefCell<O>>) -> Self {
        let owner = Rc::clone(owner);
        self.owners
            .push(Box::new(move |bus: &mut EventBus| bus.attach_owner(&owner)));
        self
    }

    pub fn build(self) -> Result<EventBus, BuildError> {
        let mut bus = EventBus::new(self.policy);
        if let Some(events) = self.events {
            bus.add_events(events);
        }
        for attach in self.owners {
            attach(&mut bus)?;
        }
        Ok(bus)
    }
}
