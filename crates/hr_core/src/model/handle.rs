//! Typed entity handles and to-many collections.
//!
//! # Invariants
//! - A handle is only meaningful to the session that issued it.
//! - Collections are order-irrelevant sets and start empty.

use crate::model::entity::EntityKind;
use std::collections::BTreeSet;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use uuid::Uuid;

/// Position of one tracked entity inside a session, with the type erased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot {
    pub(crate) session: Uuid,
    pub(crate) kind: EntityKind,
    pub(crate) index: usize,
}

impl Slot {
    pub(crate) fn new(session: Uuid, kind: EntityKind, index: usize) -> Self {
        Self {
            session,
            kind,
            index,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }
}

/// Object reference to an entity tracked by a session.
pub struct Handle<E> {
    slot: Slot,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Handle<E> {
    pub(crate) fn from_slot(slot: Slot) -> Self {
        Self {
            slot,
            _entity: PhantomData,
        }
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }
}

impl<E> Clone for Handle<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Handle<E> {}

impl<E> PartialEq for Handle<E> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl<E> Eq for Handle<E> {}

impl<E> Hash for Handle<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot.hash(state);
    }
}

impl<E> PartialOrd for Handle<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Handle<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.slot.cmp(&other.slot)
    }
}

impl<E> Debug for Handle<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}#{})", self.slot.kind, self.slot.index)
    }
}

/// To-many relationship field.
///
/// Filled by eager or explicit loading. Persistence always follows the
/// child's own to-one reference; editing a collection only changes
/// navigation inside the session.
pub struct Collection<E> {
    items: BTreeSet<Handle<E>>,
    loaded: bool,
}

impl<E> Collection<E> {
    pub fn new() -> Self {
        Self {
            items: BTreeSet::new(),
            loaded: false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, handle: Handle<E>) -> bool {
        self.items.contains(&handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = Handle<E>> + '_ {
        self.items.iter().copied()
    }

    /// Whether the collection has been populated from the store at least once.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn insert(&mut self, handle: Handle<E>) -> bool {
        self.items.insert(handle)
    }

    pub fn remove(&mut self, handle: Handle<E>) -> bool {
        self.items.remove(&handle)
    }

    pub(crate) fn replace_loaded(&mut self, related: Vec<Slot>) {
        self.items = related.into_iter().map(Handle::from_slot).collect();
        self.loaded = true;
    }

    pub(crate) fn forget(&mut self, slot: Slot) {
        self.items.remove(&Handle::from_slot(slot));
    }
}

impl<E> Default for Collection<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Collection<E> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            loaded: self.loaded,
        }
    }
}

impl<E> PartialEq for Collection<E> {
    fn eq(&self, other: &Self) -> bool {
        self.loaded == other.loaded && self.items == other.items
    }
}

impl<E> Debug for Collection<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("len", &self.items.len())
            .field("loaded", &self.loaded)
            .finish()
    }
}
