//! Identity map and per-entity change state for one session.
//!
//! # Invariants
//! - Entry indices are never reused; a detached entry keeps its slot.
//! - The identity map only points at live (non-detached) entries.

use crate::model::entity::{EntityKind, Record, RowKey};
use crate::model::handle::Slot;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Change state of one tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Staged for insertion.
    Added,
    /// Loaded and untouched since the last commit.
    Unchanged,
    /// Loaded and handed out mutably; the whole row is rewritten at commit.
    Modified,
    /// Staged for deletion.
    Deleted,
    /// No longer tracked: deleted by a commit or un-staged before insertion.
    Detached,
}

impl EntryState {
    pub fn is_live(self) -> bool {
        self != Self::Detached
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Self::Added | Self::Modified | Self::Deleted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Unchanged => "unchanged",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Detached => "detached",
        }
    }
}

#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) record: Box<dyn Record>,
    pub(crate) state: EntryState,
    /// Key of the persisted row, `None` until the row exists in the store.
    pub(crate) original_key: Option<RowKey>,
}

impl Clone for Entry {
    fn clone(&self) -> Self {
        Self {
            record: self.record.clone_record(),
            state: self.state,
            original_key: self.original_key.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Tracker {
    session: Uuid,
    entries: Vec<Entry>,
    identity: HashMap<(EntityKind, RowKey), usize>,
}

impl Tracker {
    pub(crate) fn new(session: Uuid) -> Self {
        Self {
            session,
            entries: Vec::new(),
            identity: HashMap::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entry(&self, index: usize) -> &Entry {
        &self.entries[index]
    }

    pub(crate) fn entry_mut(&mut self, index: usize) -> &mut Entry {
        &mut self.entries[index]
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (usize, &Entry)> + '_ {
        self.entries.iter().enumerate()
    }

    pub(crate) fn slot(&self, index: usize) -> Slot {
        Slot::new(self.session, self.entries[index].record.kind(), index)
    }

    /// Index behind `slot`, if the slot was issued by this tracker.
    pub(crate) fn index_of(&self, slot: Slot) -> Option<usize> {
        if slot.session != self.session {
            return None;
        }
        let entry = self.entries.get(slot.index)?;
        (entry.record.kind() == slot.kind).then_some(slot.index)
    }

    /// In-memory value of `column` on the entry at `index`. A to-one column
    /// holding a handle reads the target's current key; a target still
    /// waiting for its generated key has no value.
    pub(crate) fn column_value(&self, index: usize, column: &str) -> Option<Value> {
        let record = &self.entries[index].record;
        if let Some(target) = record.link_at(column).and_then(|link| link.target) {
            let target = self.index_of(target)?;
            return self.entries[target].record.row_key().map(Value::from);
        }
        record.column_value(column)
    }

    /// Live entry currently holding `key` for `kind`.
    pub(crate) fn lookup(&self, kind: EntityKind, key: &RowKey) -> Option<usize> {
        let index = *self.identity.get(&(kind, key.clone()))?;
        let entry = &self.entries[index];
        (entry.state.is_live() && entry.record.row_key().as_ref() == Some(key)).then_some(index)
    }

    pub(crate) fn push_added(&mut self, record: Box<dyn Record>) -> usize {
        let index = self.entries.len();
        if let Some(key) = record.row_key() {
            self.identity.insert((record.kind(), key), index);
        }
        self.entries.push(Entry {
            record,
            state: EntryState::Added,
            original_key: None,
        });
        index
    }

    /// Tracks a row read from the store, or returns the entry already
    /// tracking it. The in-memory entry wins over the fetched values.
    pub(crate) fn attach(&mut self, record: Box<dyn Record>) -> usize {
        let kind = record.kind();
        let key = record.row_key();
        if let Some(key) = key.as_ref() {
            if let Some(index) = self.lookup(kind, key) {
                return index;
            }
            if let Some(index) = self.find_persisted(kind, key) {
                return index;
            }
        }

        let index = self.entries.len();
        if let Some(key) = key.clone() {
            self.identity.insert((kind, key), index);
        }
        self.entries.push(Entry {
            record,
            state: EntryState::Unchanged,
            original_key: key,
        });
        index
    }

    /// Live entry whose persisted key is `key`, even when its in-memory key
    /// was edited since loading.
    fn find_persisted(&self, kind: EntityKind, key: &RowKey) -> Option<usize> {
        self.entries.iter().position(|entry| {
            entry.state.is_live()
                && entry.record.kind() == kind
                && entry.original_key.as_ref() == Some(key)
        })
    }

    pub(crate) fn set_state(&mut self, index: usize, state: EntryState) {
        self.entries[index].state = state;
        if state == EntryState::Detached {
            if let Some(key) = self.entries[index].record.row_key() {
                let kind = self.entries[index].record.kind();
                if self.identity.get(&(kind, key.clone())) == Some(&index) {
                    self.identity.remove(&(kind, key));
                }
            }
        }
    }

    /// Drops every handle pointing at one of `slots` from all live entries.
    pub(crate) fn forget_slots(&mut self, slots: &[Slot]) {
        if slots.is_empty() {
            return;
        }
        for entry in self.entries.iter_mut().filter(|entry| entry.state.is_live()) {
            for slot in slots {
                entry.record.forget_slot(*slot);
            }
        }
    }

    pub(crate) fn rebuild_identity(&mut self) {
        self.identity.clear();
        for (index, entry) in self.entries.iter().enumerate() {
            if !entry.state.is_live() {
                continue;
            }
            if let Some(key) = entry.record.row_key() {
                self.identity.insert((entry.record.kind(), key), index);
            }
        }
    }

    /// Forgets everything; later slots issued before the clear stay invalid.
    pub(crate) fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.state = EntryState::Detached;
        }
        self.identity.clear();
    }

    pub(crate) fn count_in(&self, state: EntryState) -> usize {
        self.entries.iter().filter(|entry| entry.state == state).count()
    }
}

#[cfg(test)]
mod tests {
    use super::{EntryState, Tracker};
    use crate::model::entity::{EntityKind, RowKey};
    use crate::model::handle::Slot;
    use crate::model::{Country, Region};
    use uuid::Uuid;

    #[test]
    fn attach_returns_existing_entry_for_same_key() {
        let mut tracker = Tracker::new(Uuid::new_v4());
        let first = tracker.attach(Box::new(Region::with_id(1, "Europe")));
        let second = tracker.attach(Box::new(Region::with_id(1, "Europa")));
        assert_eq!(first, second);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.entry(first).state, EntryState::Unchanged);
        assert_eq!(tracker.entry(first).original_key, Some(RowKey::Int(1)));
    }

    #[test]
    fn detaching_releases_the_identity() {
        let mut tracker = Tracker::new(Uuid::new_v4());
        let index = tracker.push_added(Box::new(Country::new("WL", "Wilkes Land")));
        let key = RowKey::Code("WL".to_string());
        assert_eq!(tracker.lookup(EntityKind::Country, &key), Some(index));

        tracker.set_state(index, EntryState::Detached);
        assert_eq!(tracker.lookup(EntityKind::Country, &key), None);
    }

    #[test]
    fn foreign_slots_are_rejected() {
        let session = Uuid::new_v4();
        let mut tracker = Tracker::new(session);
        let index = tracker.push_added(Box::new(Region::new("Antarctica")));
        assert_eq!(tracker.index_of(tracker.slot(index)), Some(index));

        let foreign = Slot::new(Uuid::new_v4(), EntityKind::Region, index);
        assert_eq!(tracker.index_of(foreign), None);
        let out_of_range = Slot::new(session, EntityKind::Region, 99);
        assert_eq!(tracker.index_of(out_of_range), None);
    }
}
