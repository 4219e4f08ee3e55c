//! Keyed table of callback slots.

use super::args::{ArgList, Args, Callback};
use super::error::{accumulate, DispatchError};
use super::owner::{Bindings, Owner, OwnerId, Role};
use super::slot::{CallbackSlot, SubscriberId};
use crate::core::{Key, KeySource, TableKey};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// How a seeded table treats keys outside its seed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPolicy {
    /// Unknown keys are rejected with [`DispatchError::UnknownKey`].
    #[default]
    Strict,
    /// Unknown keys are silently accepted (registration creates the slot).
    Lenient,
}

/// Map from key to [`CallbackSlot`], created on demand.
///
/// A table seeded from a [`KeySource`] is closed under [`KeyPolicy::Strict`]:
/// registering against a key outside the seed fails. Unseeded tables are
/// always open. Invoking or querying an absent key is a silent miss.
///
/// Dispatch runs with `&mut self`, so a subscriber can never register or
/// unregister on the table that is currently invoking it.
///
/// # Example
///
/// ```rust
/// use switchyard::callback::{CallbackTable, KeyPolicy};
/// use switchyard::core::Key;
///
/// let mut table: CallbackTable<Key> = CallbackTable::new(KeyPolicy::Strict);
/// table.register(Key::from("Tick"), || {}).unwrap();
///
/// table.invoke(&Key::from("Tick"), ()).unwrap();
/// assert!(table.consume_fired(&Key::from("Tick")));
/// assert!(!table.consume_fired(&Key::from("Tick")));
///
/// // absent keys are a silent miss
/// table.invoke(&Key::from("Nothing"), ()).unwrap();
/// assert!(!table.consume_fired(&Key::from("Nothing")));
/// ```
pub struct CallbackTable<K: TableKey> {
    role: Option<Role>,
    policy: KeyPolicy,
    seeded: bool,
    slots: HashMap<K, CallbackSlot<K>>,
    order: Vec<K>,
}

impl<K: TableKey> CallbackTable<K> {
    pub fn new(policy: KeyPolicy) -> Self {
        Self {
            role: None,
            policy,
            seeded: false,
            slots: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Set the owner-binding role this table dispatches.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn policy(&self) -> KeyPolicy {
        self.policy
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Pre-create a slot for every key and close the table.
    pub fn seed<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
    {
        self.seeded = true;
        for key in keys {
            self.add_key(key);
        }
    }

    /// Create the slot for `key` regardless of policy. Returns whether it was new.
    pub fn add_key(&mut self, key: K) -> bool {
        if self.slots.contains_key(&key) {
            return false;
        }
        self.order.push(key.clone());
        self.slots.insert(key.clone(), CallbackSlot::new(key));
        true
    }

    pub fn has_key(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    /// Keys in creation order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether an absent key may be created on demand.
    fn admits_new_keys(&self) -> bool {
        !(self.seeded && self.policy == KeyPolicy::Strict)
    }

    /// Whether registering against `key` would succeed.
    pub fn accepts(&self, key: &K) -> bool {
        self.has_key(key) || self.admits_new_keys()
    }

    pub fn get(&self, key: &K) -> Option<&CallbackSlot<K>> {
        self.slots.get(key)
    }

    /// The slot for `key`, created when `create` is set and the policy allows it.
    pub fn get_mut(&mut self, key: &K, create: bool) -> Option<&mut CallbackSlot<K>> {
        if !self.slots.contains_key(key) {
            if !create || !self.admits_new_keys() {
                return None;
            }
            self.add_key(key.clone());
        }
        self.slots.get_mut(key)
    }

    fn unknown(key: &K) -> DispatchError {
        DispatchError::UnknownKey {
            key: key.to_string(),
        }
    }

    pub fn register<A, F>(&mut self, key: K, callback: F) -> Result<SubscriberId, DispatchError>
    where
        A: Args,
        F: Callback<A>,
    {
        let slot = self.get_mut(&key, true).ok_or_else(|| Self::unknown(&key))?;
        Ok(slot.subscribe(callback))
    }

    /// Remove a subscription; missing keys and ids are ignored.
    pub fn unregister(&mut self, key: &K, id: SubscriberId) -> bool {
        self.slots
            .get_mut(key)
            .is_some_and(|slot| slot.unsubscribe(id))
    }

    pub fn invoke<A: Args>(&mut self, key: &K, args: A) -> Result<(), DispatchError> {
        match self.slots.get_mut(key) {
            Some(slot) => slot.invoke(args),
            None => {
                trace!(key = %key, "invoke without slot");
                Ok(())
            }
        }
    }

    pub fn invoke_list(&mut self, key: &K, args: &ArgList) -> Result<(), DispatchError> {
        match self.slots.get_mut(key) {
            Some(slot) => slot.invoke_list(args),
            None => {
                trace!(key = %key, "invoke without slot");
                Ok(())
            }
        }
    }

    /// Whether `key` fired since the last check; clears the flag.
    pub fn consume_fired(&mut self, key: &K) -> bool {
        self.slots
            .get_mut(key)
            .is_some_and(CallbackSlot::consume_fired)
    }

    /// Clear every fired flag.
    pub fn reset_fired(&mut self) {
        for slot in self.slots.values_mut() {
            slot.reset_fired();
        }
    }

    /// Bind the owner's declared handlers to every existing slot.
    pub fn attach_owner<O: Owner>(&mut self, owner: &Rc<RefCell<O>>) -> Result<usize, DispatchError> {
        self.attach_with(owner, &Bindings::of())
    }

    /// Bind `bindings` for `owner` to every existing slot.
    ///
    /// Only slots that exist now are bound; slots created later do not pick
    /// the owner up. A strict seeded table first checks that every binding
    /// in its role names a known key and reports all unknown ones at once,
    /// binding nothing. Returns the number of new bindings.
    pub fn attach_with<O: 'static>(
        &mut self,
        owner: &Rc<RefCell<O>>,
        bindings: &Bindings<O>,
    ) -> Result<usize, DispatchError> {
        let Some(role) = self.role else {
            return Ok(0);
        };
        self.check_bindings(bindings)?;

        let mut bound = 0;
        for key in &self.order {
            if let Some(slot) = self.slots.get_mut(key) {
                if slot.bind_owner(owner, bindings, role) {
                    bound += 1;
                }
            }
        }
        debug!(role = %role, bound, "attach owner");
        Ok(bound)
    }

    /// Check that every binding in this table's role names a known key.
    ///
    /// Only closed tables check anything; all unknown keys are reported together.
    pub fn check_bindings<O: 'static>(&self, bindings: &Bindings<O>) -> Result<(), DispatchError> {
        let Some(role) = self.role else {
            return Ok(());
        };
        if self.admits_new_keys() {
            return Ok(());
        }
        accumulate(bindings.members(role).map(|name| {
            if self.has_binding_name(name) {
                Ok(())
            } else {
                Err(DispatchError::UnknownKey {
                    key: name.to_string(),
                })
            }
        }))
    }

    /// Remove the owner's bindings from every slot. Returns how many were removed.
    pub fn detach_owner<O>(&mut self, owner: &Rc<RefCell<O>>) -> usize {
        let id = OwnerId::of(owner);
        self.slots
            .values_mut()
            .map(|slot| slot.unbind_owner(id))
            .sum()
    }

    fn has_binding_name(&self, name: &Key) -> bool {
        self.order.iter().any(|k| k.binding_name() == Some(name))
    }
}

impl CallbackTable<Key> {
    /// A table seeded with the keys of `S`.
    pub fn from_source<S: KeySource>(policy: KeyPolicy) -> Self {
        let mut table = Self::new(policy);
        table.seed(S::keys());
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Moves;

    impl KeySource for Moves {
        fn keys() -> Vec<Key> {
            vec![Key::from("Idle"), Key::from("Run")]
        }
    }

    fn key(name: &str) -> Key {
        Key::from(name)
    }

    #[test]
    fn seeding_creates_slots_once() {
        let mut table = CallbackTable::<Key>::from_source::<Moves>(KeyPolicy::Strict);

        assert!(table.is_seeded());
        assert_eq!(table.len(), 2);
        assert!(!table.add_key(key("Idle")));
        assert_eq!(table.len(), 2);
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["Idle", "Run"]);
    }

    #[test]
    fn strict_seeded_table_rejects_unknown_keys() {
        let mut table = CallbackTable::<Key>::from_source::<Moves>(KeyPolicy::Strict);

        let result = table.register(key("Fly"), || {});

        assert_eq!(
            result,
            Err(DispatchError::UnknownKey { key: "Fly".into() })
        );
        assert!(!table.has_key(&key("Fly")));
        assert!(table.get_mut(&key("Fly"), true).is_none());
    }

    #[test]
    fn lenient_table_creates_unknown_keys() {
        let mut table = CallbackTable::<Key>::from_source::<Moves>(KeyPolicy::Lenient);

        assert!(table.register(key("Fly"), || {}).is_ok());
        assert!(table.has_key(&key("Fly")));
    }

    #[test]
    fn unseeded_table_is_open_even_when_strict() {
        let mut table = CallbackTable::<Key>::new(KeyPolicy::Strict);
        assert!(table.register(key("Anything"), |_: u8| {}).is_ok());
    }

    #[test]
    fn get_without_create_is_a_silent_miss() {
        let mut table = CallbackTable::<Key>::new(KeyPolicy::Lenient);
        assert!(table.get_mut(&key("Ghost"), false).is_none());
        assert!(!table.has_key(&key("Ghost")));
        assert!(table.get_mut(&key("Ghost"), true).is_some());
        assert!(table.has_key(&key("Ghost")));
    }

    #[test]
    fn unregister_stops_delivery() {
        let hits = Rc::new(Cell::new(0));
        let sink = Rc::clone(&hits);
        let mut table = CallbackTable::<Key>::new(KeyPolicy::Strict);
        let id = table
            .register(key("Ping"), move || sink.set(sink.get() + 1))
            .unwrap();

        table.invoke(&key("Ping"), ()).unwrap();
        assert!(table.unregister(&key("Ping"), id));
        assert!(!table.unregister(&key("Ping"), id));
        assert!(!table.unregister(&key("Pong"), id));
        table.invoke(&key("Ping"), ()).unwrap();

        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn reset_clears_every_flag() {
        let mut table = CallbackTable::<Key>::from_source::<Moves>(KeyPolicy::Strict);
        table.invoke(&key("Idle"), ()).unwrap();
        table.invoke(&key("Run"), ()).unwrap();

        table.reset_fired();

        assert!(!table.consume_fired(&key("Idle")));
        assert!(!table.consume_fired(&key("Run")));
    }

    #[derive(Default)]
    struct Walker {
        entered: Vec<&'static str>,
    }

    impl Walker {
        fn enter_idle(&mut self) {
            self.entered.push("Idle");
        }

        fn enter_run(&mut self) {
            self.entered.push("Run");
        }

        fn enter_fly(&mut self) {
            self.entered.push("Fly");
        }
    }

    impl Owner for Walker {
        fn bindings(bindings: &mut Bindings<Self>) {
            bindings
                .enter("Idle", Walker::enter_idle)
                .enter("Run", Walker::enter_run);
        }
    }

    fn enter_table(policy: KeyPolicy) -> CallbackTable<Key> {
        CallbackTable::<Key>::from_source::<Moves>(policy).with_role(Role::Enter)
    }

    #[test]
    fn attach_binds_every_existing_slot() {
        let walker = Rc::new(RefCell::new(Walker::default()));
        let mut table = enter_table(KeyPolicy::Strict);

        assert_eq!(table.attach_owner(&walker), Ok(2));
        table.invoke(&key("Run"), ()).unwrap();
        table.invoke(&key("Idle"), ()).unwrap();

        assert_eq!(walker.borrow().entered, vec!["Run", "Idle"]);
    }

    #[test]
    fn attaching_twice_invokes_once() {
        let walker = Rc::new(RefCell::new(Walker::default()));
        let mut table = enter_table(KeyPolicy::Strict);

        table.attach_owner(&walker).unwrap();
        assert_eq!(table.attach_owner(&walker), Ok(0));
        table.invoke(&key("Idle"), ()).unwrap();

        assert_eq!(walker.borrow().entered, vec!["Idle"]);
    }

    #[test]
    fn detach_of_unknown_owner_is_a_no_op() {
        let walker = Rc::new(RefCell::new(Walker::default()));
        let mut table = enter_table(KeyPolicy::Strict);

        assert_eq!(table.detach_owner(&walker), 0);
    }

    #[test]
    fn detach_removes_all_bindings() {
        let walker = Rc::new(RefCell::new(Walker::default()));
        let mut table = enter_table(KeyPolicy::Strict);
        table.attach_owner(&walker).unwrap();

        assert_eq!(table.detach_owner(&walker), 2);
        table.invoke(&key("Idle"), ()).unwrap();

        assert!(walker.borrow().entered.is_empty());
    }

    #[test]
    fn table_without_role_binds_nothing() {
        let walker = Rc::new(RefCell::new(Walker::default()));
        let mut table = CallbackTable::<Key>::from_source::<Moves>(KeyPolicy::Strict);

        assert_eq!(table.attach_owner(&walker), Ok(0));
    }

    #[test]
    fn strict_attach_reports_every_unknown_binding() {
        let walker = Rc::new(RefCell::new(Walker::default()));
        let mut bindings = Bindings::<Walker>::of();
        bindings
            .enter("Fly", Walker::enter_fly)
            .enter("Swim", Walker::enter_fly);
        let mut table = enter_table(KeyPolicy::Strict);

        let result = table.attach_with(&walker, &bindings);

        match result {
            Err(DispatchError::Several(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("Expected two unknown keys, got {other:?}"),
        }
        table.invoke(&key("Idle"), ()).unwrap();
        assert!(walker.borrow().entered.is_empty());
    }

    #[test]
    fn lenient_attach_skips_unknown_bindings() {
        let walker = Rc::new(RefCell::new(Walker::default()));
        let mut bindings = Bindings::<Walker>::new();
        bindings
            .enter("Fly", Walker::enter_fly)
            .enter("Run", Walker::enter_run);
        let mut table = enter_table(KeyPolicy::Lenient);

        assert_eq!(table.attach_with(&walker, &bindings), Ok(1));
        assert!(!table.has_key(&key("Fly")));
        table.invoke(&key("Idle"), ()).unwrap();
        table.invoke(&key("Run"), ()).unwrap();
        assert_eq!(walker.borrow().entered, vec!["Run"]);
    }

    #[test]
    fn policy_deserializes_from_lowercase() {
        let policy: KeyPolicy = serde_json::from_str("\"lenient\"").unwrap();
        assert_eq!(policy, KeyPolicy::Lenient);
        assert_eq!(KeyPolicy::default(), KeyPolicy::Strict);
    }
}
