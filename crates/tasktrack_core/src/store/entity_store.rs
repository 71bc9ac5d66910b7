//! Ordered entity collection with cached views, snapshot persistence and
//! synchronous change notification.
//!
//! # Invariants
//! - Ids are unique within one store; id `0` means "not yet assigned".
//! - The persistence hook fires exactly once per successful mutation, after
//!   the in-memory state for that operation is final.
//! - `view()` never returns a value computed before the latest successful
//!   mutation.

use crate::clock::{Clock, EpochMs};
use crate::storage::{load_json, save_json, Storage, StorageError};
use log::{debug, error};
use once_cell::unsync::OnceCell;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Integer record key shared by every entity type.
pub type EntityId = i64;

/// Record type managed by an `EntityStore`.
pub trait Entity: Clone + Serialize + DeserializeOwned {
    /// Partial update merged by `EntityStore::update`.
    type Patch;
    /// Reason a record is refused at the store boundary.
    type Invalid: Error + 'static;

    fn id(&self) -> EntityId;
    fn assign_id(&mut self, id: EntityId);
    /// Merges `patch` and stamps the modification time.
    fn apply_patch(&mut self, patch: Self::Patch, now_ms: EpochMs);
    fn validate(&self) -> Result<(), Self::Invalid>;
}

/// Derived view bundle computed from the full collection.
pub trait Derive<E> {
    fn derive(records: &[E]) -> Self;
}

impl<E> Derive<E> for () {
    fn derive(_records: &[E]) -> Self {}
}

/// How ids are picked for records inserted with id `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// Highest existing id plus one, starting at 1.
    #[default]
    Sequential,
    /// Current epoch milliseconds, bumped past the highest existing id.
    TimeDerived,
}

/// Change notification delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Inserted(EntityId),
    Updated(EntityId),
    Removed(EntityId),
    /// The whole collection was swapped (seeding).
    Replaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Outcome of a guarded removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal<E> {
    Removed(E),
    /// The record exists but the removal guard refused it.
    Refused(E),
    Absent,
}

pub type StoreResult<T, V> = Result<T, StoreError<V>>;

#[derive(Debug)]
pub enum StoreError<V> {
    NotFound(EntityId),
    DuplicateId(EntityId),
    Rejected(V),
    Storage(StorageError),
}

impl<V: Display> Display for StoreError<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::DuplicateId(id) => write!(f, "record id already in use: {id}"),
            Self::Rejected(reason) => write!(f, "record rejected: {reason}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl<V: Error + 'static> Error for StoreError<V> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Rejected(reason) => Some(reason),
            Self::Storage(err) => Some(err),
            Self::NotFound(_) | Self::DuplicateId(_) => None,
        }
    }
}

impl<V> From<StorageError> for StoreError<V> {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Ordered, key-unique collection of `E` with lazily cached views `V`.
pub struct EntityStore<E: Entity, V: Derive<E> = ()> {
    key: &'static str,
    records: Vec<E>,
    derived: OnceCell<V>,
    storage: Rc<dyn Storage>,
    clock: Rc<dyn Clock>,
    id_strategy: IdStrategy,
    restored: bool,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl<E: Entity, V: Derive<E>> EntityStore<E, V> {
    /// Binds a store to `key`, restoring any snapshot already persisted there.
    ///
    /// A snapshot holding the same id twice is refused with `DuplicateId`.
    pub fn open(
        key: &'static str,
        storage: Rc<dyn Storage>,
        clock: Rc<dyn Clock>,
    ) -> StoreResult<Self, E::Invalid> {
        let snapshot: Option<Vec<E>> = load_json(storage.as_ref(), key)?;
        let restored = snapshot.is_some();
        let records = snapshot.unwrap_or_default();
        if let Err(err) = ensure_unique_ids(&records) {
            error!("event=store_open module=entity_store status=error key={key} error={err}");
            return Err(err);
        }
        debug!(
            "event=store_open module=entity_store status=ok key={key} restored={restored} count={}",
            records.len()
        );

        Ok(Self {
            key,
            records,
            derived: OnceCell::new(),
            storage,
            clock,
            id_strategy: IdStrategy::default(),
            restored,
            listeners: Vec::new(),
            next_subscription: 0,
        })
    }

    pub fn with_id_strategy(mut self, id_strategy: IdStrategy) -> Self {
        self.id_strategy = id_strategy;
        self
    }

    /// Whether `open` found a prior snapshot under this store's key.
    pub fn was_restored(&self) -> bool {
        self.restored
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn now_ms(&self) -> EpochMs {
        self.clock.now_ms()
    }

    /// Current collection in insertion order.
    pub fn list(&self) -> &[E] {
        &self.records
    }

    pub fn get(&self, id: EntityId) -> Option<&E> {
        self.records.iter().find(|record| record.id() == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Derived views over the current collection, recomputed on first read
    /// after a mutation.
    pub fn view(&self) -> &V {
        self.derived.get_or_init(|| V::derive(&self.records))
    }

    /// Appends `record`, assigning an id when it has none.
    pub fn insert(&mut self, mut record: E) -> StoreResult<E, E::Invalid> {
        record.validate().map_err(StoreError::Rejected)?;
        if record.id() == 0 {
            record.assign_id(self.next_id());
        } else if self.get(record.id()).is_some() {
            return Err(StoreError::DuplicateId(record.id()));
        }

        let id = record.id();
        self.records.push(record.clone());
        if let Err(err) = self.commit() {
            self.records.pop();
            self.invalidate();
            return Err(err.into());
        }

        self.notify(StoreEvent::Inserted(id));
        Ok(record)
    }

    /// Merges `patch` into the record with `id` and returns the stored result.
    pub fn update(&mut self, id: EntityId, patch: E::Patch) -> StoreResult<E, E::Invalid> {
        let index = self.position(id).ok_or(StoreError::NotFound(id))?;
        let mut next = self.records[index].clone();
        next.apply_patch(patch, self.clock.now_ms());
        next.validate().map_err(StoreError::Rejected)?;

        let previous = std::mem::replace(&mut self.records[index], next.clone());
        if let Err(err) = self.commit() {
            self.records[index] = previous;
            self.invalidate();
            return Err(err.into());
        }

        self.notify(StoreEvent::Updated(id));
        Ok(next)
    }

    /// Removes the record with `id`; returns whether anything was removed.
    pub fn remove(&mut self, id: EntityId) -> StoreResult<bool, E::Invalid> {
        let removal = self.remove_where(id, |_| true)?;
        Ok(matches!(removal, Removal::Removed(_)))
    }

    /// Removes the record with `id` only when `allow` accepts it.
    pub fn remove_where<F>(&mut self, id: EntityId, allow: F) -> StoreResult<Removal<E>, E::Invalid>
    where
        F: FnOnce(&E) -> bool,
    {
        let Some(index) = self.position(id) else {
            return Ok(Removal::Absent);
        };
        if !allow(&self.records[index]) {
            return Ok(Removal::Refused(self.records[index].clone()));
        }

        let removed = self.records.remove(index);
        if let Err(err) = self.commit() {
            self.records.insert(index, removed);
            self.invalidate();
            return Err(err.into());
        }

        self.notify(StoreEvent::Removed(id));
        Ok(Removal::Removed(removed))
    }

    /// Swaps the whole collection, e.g. to install seed data.
    pub fn replace_all(&mut self, records: Vec<E>) -> StoreResult<(), E::Invalid> {
        for record in &records {
            record.validate().map_err(StoreError::Rejected)?;
        }
        ensure_unique_ids(&records)?;

        let previous = std::mem::replace(&mut self.records, records);
        if let Err(err) = self.commit() {
            self.records = previous;
            self.invalidate();
            return Err(err.into());
        }

        self.notify(StoreEvent::Replaced);
        Ok(())
    }

    /// Registers a listener called synchronously after each persisted change.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn position(&self, id: EntityId) -> Option<usize> {
        self.records.iter().position(|record| record.id() == id)
    }

    fn next_id(&self) -> EntityId {
        let max_id = self.records.iter().map(|record| record.id()).max().unwrap_or(0);
        match self.id_strategy {
            IdStrategy::Sequential => max_id + 1,
            IdStrategy::TimeDerived => self.clock.now_ms().max(max_id + 1),
        }
    }

    fn invalidate(&mut self) {
        self.derived.take();
    }

    /// Drops stale views and writes the full snapshot.
    fn commit(&mut self) -> Result<(), StorageError> {
        self.invalidate();
        match save_json(self.storage.as_ref(), self.key, &self.records) {
            Ok(()) => {
                debug!(
                    "event=store_persist module=entity_store status=ok key={} count={}",
                    self.key,
                    self.records.len()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_persist module=entity_store status=error key={} error={}",
                    self.key, err
                );
                Err(err)
            }
        }
    }

    fn notify(&mut self, event: StoreEvent) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }
}

fn ensure_unique_ids<E: Entity>(records: &[E]) -> StoreResult<(), E::Invalid> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id()) {
            return Err(StoreError::DuplicateId(record.id()));
        }
    }
    Ok(())
}
