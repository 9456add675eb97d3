//! Reconciles object references with scalar foreign keys.
//!
//! # Invariants
//! - A set handle always wins: the scalar key is overwritten with the target's
//!   key.
//! - Only the entity's own fields are touched.

use super::tracker::{EntryState, Tracker};
use super::{SessionError, SessionResult};
use crate::model::schema::foreign_keys_of;

/// Normalizes the to-one links of the entry at `index`.
///
/// Returns the indices of pending inserts this row has to follow.
pub(crate) fn resolve_links(tracker: &mut Tracker, index: usize) -> SessionResult<Vec<usize>> {
    let kind = tracker.entry(index).record.kind();
    let mut depends_on = Vec::new();

    for fk in foreign_keys_of(kind) {
        let Some(link) = tracker.entry(index).record.link_at(fk.column) else {
            continue;
        };
        let unresolved = || SessionError::UnresolvedReference {
            kind,
            column: fk.column,
        };

        match link.target {
            Some(target) => {
                let target_index = tracker.index_of(target).ok_or_else(unresolved)?;
                let target_entry = tracker.entry(target_index);
                let target_key = target_entry.record.row_key();
                match target_entry.state {
                    EntryState::Added => depends_on.push(target_index),
                    EntryState::Unchanged | EntryState::Modified => {
                        if target_key.is_none() {
                            return Err(unresolved());
                        }
                    }
                    EntryState::Deleted | EntryState::Detached => return Err(unresolved()),
                }
                if target_key.is_some() {
                    tracker
                        .entry_mut(index)
                        .record
                        .set_link_key_at(fk.column, target_key);
                }
            }
            None => {
                if let Some(key) = link.key {
                    let pending = tracker
                        .lookup(fk.parent, &key)
                        .filter(|parent| tracker.entry(*parent).state == EntryState::Added);
                    depends_on.extend(pending);
                }
            }
        }
    }

    Ok(depends_on)
}

/// Copies the now-known keys of handle targets into the entry's scalar
/// foreign keys. Called during apply, after parents got their keys.
pub(crate) fn settle_keys(tracker: &mut Tracker, index: usize) -> SessionResult<()> {
    let kind = tracker.entry(index).record.kind();
    for fk in foreign_keys_of(kind) {
        let Some(target) = tracker
            .entry(index)
            .record
            .link_at(fk.column)
            .and_then(|link| link.target)
        else {
            continue;
        };
        let key = tracker
            .index_of(target)
            .and_then(|target_index| tracker.entry(target_index).record.row_key())
            .ok_or(SessionError::UnresolvedReference {
                kind,
                column: fk.column,
            })?;
        tracker
            .entry_mut(index)
            .record
            .set_link_key_at(fk.column, Some(key));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::resolve_links;
    use crate::model::entity::RowKey;
    use crate::model::handle::{Handle, Slot};
    use crate::model::{Country, EntityKind, Region};
    use crate::session::tracker::{EntryState, Tracker};
    use crate::session::SessionError;
    use uuid::Uuid;

    #[test]
    fn handle_to_persisted_parent_overwrites_scalar_key() {
        let mut tracker = Tracker::new(Uuid::new_v4());
        let region = tracker.attach(Box::new(Region::with_id(4, "Middle East and Africa")));
        let handle = Handle::from_slot(tracker.slot(region));
        let country = tracker.push_added(Box::new(
            Country::new("ZM", "Zambia").in_region_id(1).in_region(handle),
        ));

        let depends_on = resolve_links(&mut tracker, country).unwrap();
        assert!(depends_on.is_empty());
        let link = tracker.entry(country).record.link_at("region_id").unwrap();
        assert_eq!(link.key, Some(RowKey::Int(4)));
    }

    #[test]
    fn handle_to_pending_parent_becomes_a_dependency() {
        let mut tracker = Tracker::new(Uuid::new_v4());
        let region = tracker.push_added(Box::new(Region::new("Antarctica")));
        let handle = Handle::from_slot(tracker.slot(region));
        let country = tracker.push_added(Box::new(Country::new("WL", "Wilkes Land").in_region(handle)));

        assert_eq!(resolve_links(&mut tracker, country).unwrap(), vec![region]);
    }

    #[test]
    fn handle_to_removed_or_foreign_entity_is_unresolved() {
        let mut tracker = Tracker::new(Uuid::new_v4());
        let region = tracker.push_added(Box::new(Region::new("Antarctica")));
        let handle = Handle::from_slot(tracker.slot(region));
        tracker.set_state(region, EntryState::Detached);
        let country = tracker.push_added(Box::new(Country::new("WL", "Wilkes Land").in_region(handle)));
        assert!(matches!(
            resolve_links(&mut tracker, country),
            Err(SessionError::UnresolvedReference { column: "region_id", .. })
        ));

        let foreign = Handle::from_slot(Slot::new(Uuid::new_v4(), EntityKind::Region, 0));
        let other = tracker.push_added(Box::new(Country::new("EL", "Enderby Land").in_region(foreign)));
        assert!(matches!(
            resolve_links(&mut tracker, other),
            Err(SessionError::UnresolvedReference { .. })
        ));
    }
}
