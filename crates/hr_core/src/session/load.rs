//! Relationship loading shared by eager queries and explicit loads.
//!
//! # Invariants
//! - Loading never marks an entity dirty.
//! - Rows already tracked keep their in-memory values; removed rows are not
//!   linked.

use super::tracker::EntryState;
use super::{Session, SessionError, SessionResult};
use crate::model::entity::{Entity, EntityKind, RelationSpec, RowKey};
use crate::model::handle::{Handle, Slot};
use crate::repo::row_store::{self, ColumnFilter};
use log::debug;
use std::collections::HashMap;

fn is_visible(state: EntryState) -> bool {
    matches!(
        state,
        EntryState::Added | EntryState::Unchanged | EntryState::Modified
    )
}

impl<'conn> Session<'conn> {
    /// Populates one relationship of an already tracked entity.
    ///
    /// A to-many relationship with no related rows becomes an empty, loaded
    /// collection.
    pub fn load<E: Entity>(&mut self, handle: Handle<E>, relation: E::Relation) -> SessionResult<()> {
        self.ensure_open()?;
        self.load_relation(&[handle], relation)
    }

    pub(crate) fn load_relation<E: Entity>(
        &mut self,
        parents: &[Handle<E>],
        relation: E::Relation,
    ) -> SessionResult<()> {
        let mut indices = Vec::with_capacity(parents.len());
        for handle in parents {
            let index = self
                .tracker()
                .index_of(handle.slot())
                .filter(|index| self.tracker().entry(*index).state.is_live())
                .ok_or(SessionError::UnknownEntity(E::KIND))?;
            indices.push(index);
        }
        if indices.is_empty() {
            return Ok(());
        }

        let related = match E::relation(relation) {
            RelationSpec::ToOne { column, target } => self.load_to_one(&indices, column, target)?,
            RelationSpec::ToMany { child, column } => self.load_to_many(&indices, child, column)?,
        };

        for (index, slots) in indices.into_iter().zip(related) {
            self.tracker_mut()
                .entry_mut(index)
                .record
                .as_any_mut()
                .downcast_mut::<E>()
                .ok_or(SessionError::UnknownEntity(E::KIND))?
                .attach_related(relation, slots);
        }

        debug!(
            "event=relation_load module=session status=ok kind={} relation={:?} parents={}",
            E::KIND,
            relation,
            parents.len()
        );
        Ok(())
    }

    fn load_to_one(
        &mut self,
        indices: &[usize],
        column: &'static str,
        target: EntityKind,
    ) -> SessionResult<Vec<Vec<Slot>>> {
        let mut missing: Vec<RowKey> = Vec::new();
        for index in indices {
            let Some(link) = self.tracker().entry(*index).record.link_at(column) else {
                continue;
            };
            if link.target.is_some() {
                continue;
            }
            if let Some(key) = link.key {
                if self.tracker().lookup(target, &key).is_none() {
                    missing.push(key);
                }
            }
        }
        missing.sort();
        missing.dedup();

        if !missing.is_empty() {
            let rows = row_store::fetch_records(
                self.conn(),
                target,
                &[ColumnFilter::In(target.key_column(), missing)],
            )?;
            for row in rows {
                self.tracker_mut().attach(row);
            }
        }

        let tracker = self.tracker();
        Ok(indices
            .iter()
            .map(|index| {
                let Some(link) = tracker.entry(*index).record.link_at(column) else {
                    return Vec::new();
                };
                let found = match link.target {
                    Some(slot) => tracker.index_of(slot),
                    None => link.key.and_then(|key| tracker.lookup(target, &key)),
                };
                found
                    .filter(|found| is_visible(tracker.entry(*found).state))
                    .map(|found| vec![tracker.slot(found)])
                    .unwrap_or_default()
            })
            .collect())
    }

    fn load_to_many(
        &mut self,
        indices: &[usize],
        child: EntityKind,
        column: &'static str,
    ) -> SessionResult<Vec<Vec<Slot>>> {
        let mut keys: Vec<RowKey> = indices
            .iter()
            .filter_map(|index| self.tracker().entry(*index).original_key.clone())
            .collect();
        keys.sort();
        keys.dedup();

        if !keys.is_empty() {
            let rows =
                row_store::fetch_records(self.conn(), child, &[ColumnFilter::In(column, keys)])?;
            for row in rows {
                self.tracker_mut().attach(row);
            }
        }

        let tracker = self.tracker();
        let mut by_slot: HashMap<Slot, Vec<Slot>> = HashMap::new();
        let mut by_key: HashMap<RowKey, Vec<Slot>> = HashMap::new();
        for (index, entry) in tracker.entries() {
            if entry.record.kind() != child || !is_visible(entry.state) {
                continue;
            }
            let Some(link) = entry.record.link_at(column) else {
                continue;
            };
            match (link.target, link.key) {
                (Some(parent), _) => by_slot.entry(parent).or_default().push(tracker.slot(index)),
                (None, Some(key)) => by_key.entry(key).or_default().push(tracker.slot(index)),
                (None, None) => {}
            }
        }

        Ok(indices
            .iter()
            .map(|index| {
                let mut related = by_slot
                    .get(&tracker.slot(*index))
                    .cloned()
                    .unwrap_or_default();
                if let Some(key) = tracker.entry(*index).record.row_key() {
                    related.extend(by_key.get(&key).into_iter().flatten().copied());
                }
                related
            })
            .collect())
    }
}
