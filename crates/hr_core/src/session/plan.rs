//! Commit planning: cascade expansion, link resolution and row ordering.
//!
//! # Responsibility
//! - Turn the staged set into an ordered list of inserts, updates and deletes.
//! - Pull persisted children of removed rows into the session so cascades and
//!   set-null rules are applied by the session rather than hidden in SQL.
//!
//! # Invariants
//! - Runs on a working copy of the tracker; errors leave the session intact.
//! - Inserts come parent first and deletes leaf first, at row level.

use super::resolve::resolve_links;
use super::tracker::{EntryState, Tracker};
use super::{CommitSummary, SessionError, SessionResult};
use crate::model::entity::RowKey;
use crate::model::handle::Slot;
use crate::model::schema::{foreign_keys_of, referencing, DeleteRule, ForeignKey};
use crate::repo::row_store::{self, ColumnFilter};
use log::debug;
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Ordered work for one commit, as entry indices of the working tracker.
#[derive(Debug, Default)]
pub(crate) struct Plan {
    pub(crate) inserts: Vec<usize>,
    pub(crate) updates: Vec<usize>,
    pub(crate) deletes: Vec<usize>,
    pub(crate) cascaded: usize,
}

impl Plan {
    pub(crate) fn summary(&self) -> CommitSummary {
        CommitSummary {
            inserted: self.inserts.len(),
            updated: self.updates.len(),
            deleted: self.deletes.len(),
            cascaded: self.cascaded,
        }
    }
}

pub(crate) fn build(conn: &Connection, work: &mut Tracker) -> SessionResult<Plan> {
    let cascaded = expand_cascades(conn, work)?;

    let mut dependencies: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut updates = Vec::new();
    for index in 0..work.len() {
        match work.entry(index).state {
            EntryState::Added => {
                let depends_on = resolve_links(work, index)?;
                work.entry(index).record.check()?;
                dependencies.insert(index, depends_on);
            }
            EntryState::Modified => {
                resolve_links(work, index)?;
                let entry = work.entry(index);
                entry.record.check()?;
                if let Some(original) = entry.original_key.clone() {
                    if entry.record.row_key().as_ref() != Some(&original) {
                        return Err(SessionError::ImmutableKey {
                            kind: entry.record.kind(),
                            original,
                        });
                    }
                }
                updates.push(index);
            }
            EntryState::Unchanged | EntryState::Deleted | EntryState::Detached => {}
        }
    }

    let inserts = insert_order(work, &dependencies)?;
    updates.sort_by_key(|index| (work.entry(*index).record.kind().rank(), *index));
    let deletes = delete_order(work)?;

    debug!(
        "event=commit_plan module=session status=ok inserts={} updates={} deletes={} cascaded={}",
        inserts.len(),
        updates.len(),
        deletes.len(),
        cascaded
    );
    Ok(Plan {
        inserts,
        updates,
        deletes,
        cascaded,
    })
}

/// Applies delete rules for every removed row, following cascades
/// transitively. Returns how many rows were removed by cascade.
fn expand_cascades(conn: &Connection, work: &mut Tracker) -> SessionResult<usize> {
    let mut queue: VecDeque<usize> = work
        .entries()
        .filter(|(_, entry)| entry.state == EntryState::Deleted)
        .map(|(index, _)| index)
        .collect();
    let mut cascaded = 0;

    while let Some(parent) = queue.pop_front() {
        let parent_entry = work.entry(parent);
        let parent_kind = parent_entry.record.kind();
        let persisted_key = parent_entry.original_key.clone();
        let parent_key = persisted_key.clone().or_else(|| parent_entry.record.row_key());
        let parent_slot = work.slot(parent);

        for fk in referencing(parent_kind) {
            if let Some(key) = persisted_key.clone() {
                let rows = row_store::fetch_records(
                    conn,
                    fk.child,
                    &[ColumnFilter::Eq(fk.column, key.into())],
                )
                .map_err(SessionError::CommitFailed)?;
                for row in rows {
                    work.attach(row);
                }
            }

            let children: Vec<usize> = (0..work.len())
                .filter(|child| *child != parent)
                .filter(|child| references(&*work, *child, fk, parent_slot, parent_key.as_ref()))
                .collect();

            for child in children {
                let state = work.entry(child).state;
                match fk.on_delete {
                    DeleteRule::Cascade => match state {
                        EntryState::Added => {
                            work.set_state(child, EntryState::Detached);
                            queue.push_back(child);
                        }
                        EntryState::Unchanged | EntryState::Modified => {
                            work.set_state(child, EntryState::Deleted);
                            cascaded += 1;
                            queue.push_back(child);
                        }
                        EntryState::Deleted | EntryState::Detached => {}
                    },
                    DeleteRule::SetNull => {
                        let record = &mut work.entry_mut(child).record;
                        record.set_link_key_at(fk.column, None);
                        record.set_link_target_at(fk.column, None);
                        if state == EntryState::Unchanged {
                            work.set_state(child, EntryState::Modified);
                        }
                    }
                }
            }
        }
    }

    Ok(cascaded)
}

/// Whether the live entry at `child` points at the parent through `fk`.
fn references(
    work: &Tracker,
    child: usize,
    fk: &ForeignKey,
    parent_slot: Slot,
    parent_key: Option<&RowKey>,
) -> bool {
    let entry = work.entry(child);
    if entry.record.kind() != fk.child
        || !matches!(
            entry.state,
            EntryState::Added | EntryState::Unchanged | EntryState::Modified
        )
    {
        return false;
    }
    let Some(link) = entry.record.link_at(fk.column) else {
        return false;
    };
    match link.target {
        Some(target) => target == parent_slot,
        None => parent_key.is_some() && link.key.as_ref() == parent_key,
    }
}

fn insert_order(
    work: &Tracker,
    dependencies: &BTreeMap<usize, Vec<usize>>,
) -> SessionResult<Vec<usize>> {
    let edges = dependencies
        .iter()
        .flat_map(|(row, parents)| parents.iter().map(move |parent| (*parent, *row)))
        .collect();
    topological(work, dependencies.keys().copied().collect(), edges, |work, index| {
        work.entry(index).record.kind().rank()
    })
}

/// Children removed by cascade go before their parent; set-null references
/// between removed rows are left to the store's `ON DELETE SET NULL`.
fn delete_order(work: &Tracker) -> SessionResult<Vec<usize>> {
    let deleted: Vec<usize> = work
        .entries()
        .filter(|(_, entry)| entry.state == EntryState::Deleted)
        .map(|(index, _)| index)
        .collect();

    let mut edges = Vec::new();
    for child in &deleted {
        let child_entry = work.entry(*child);
        for fk in foreign_keys_of(child_entry.record.kind())
            .filter(|fk| fk.on_delete == DeleteRule::Cascade)
        {
            let Some(link) = child_entry.record.link_at(fk.column) else {
                continue;
            };
            for parent in deleted.iter().filter(|parent| *parent != child) {
                let parent_entry = work.entry(*parent);
                if parent_entry.record.kind() != fk.parent {
                    continue;
                }
                let by_handle = link.target == Some(work.slot(*parent));
                let by_key = link.target.is_none()
                    && link.key.is_some()
                    && link.key == parent_entry.original_key;
                if by_handle || by_key {
                    edges.push((*child, *parent));
                }
            }
        }
    }

    topological(work, deleted, edges, |work, index| {
        u8::MAX - work.entry(index).record.kind().rank()
    })
}

/// Kahn's algorithm over entry indices. `edges` are `(before, after)` pairs;
/// among ready rows the lowest `(priority, index)` goes first.
fn topological(
    work: &Tracker,
    nodes: Vec<usize>,
    edges: Vec<(usize, usize)>,
    priority: impl Fn(&Tracker, usize) -> u8,
) -> SessionResult<Vec<usize>> {
    let mut in_degree: HashMap<usize, usize> = nodes.iter().map(|node| (*node, 0)).collect();
    let mut successors: HashMap<usize, Vec<usize>> = HashMap::new();
    for (before, after) in edges {
        successors.entry(before).or_default().push(after);
        *in_degree.entry(after).or_insert(0) += 1;
    }

    let mut ready: BTreeSet<(u8, usize)> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(node, _)| (priority(work, *node), *node))
        .collect();

    let mut sorted = Vec::with_capacity(nodes.len());
    while let Some((_, node)) = ready.pop_first() {
        sorted.push(node);
        for next in successors.get(&node).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert((priority(work, *next), *next));
                }
            }
        }
    }

    if sorted.len() != nodes.len() {
        let mut stuck: Vec<usize> = in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(node, _)| node)
            .collect();
        stuck.sort_unstable();
        return Err(SessionError::CyclicDependency {
            stuck: stuck
                .into_iter()
                .map(|index| {
                    let record = &work.entry(index).record;
                    (record.kind(), record.row_key())
                })
                .collect(),
        });
    }

    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::build;
    use crate::db::open_db_in_memory;
    use crate::model::{Country, Employee, Region};
    use crate::session::tracker::{EntryState, Tracker};
    use crate::session::SessionError;
    use uuid::Uuid;

    #[test]
    fn inserts_follow_handles_not_staging_order() {
        let conn = open_db_in_memory().unwrap();
        let mut work = Tracker::new(Uuid::new_v4());
        let country = work.push_added(Box::new(Country::new("WL", "Wilkes Land")));
        let region = work.push_added(Box::new(Region::new("Antarctica")));
        let region_slot = work.slot(region);
        work.entry_mut(country)
            .record
            .set_link_target_at("region_id", Some(region_slot));

        let plan = build(&conn, &mut work).unwrap();
        assert_eq!(plan.inserts, vec![region, country]);
    }

    #[test]
    fn mutual_managers_cannot_be_ordered() {
        let conn = open_db_in_memory().unwrap();
        let mut work = Tracker::new(Uuid::new_v4());
        let first = work.push_added(Box::new(Employee::new("Doe", "a.doe@example.org", 1.0)));
        let second = work.push_added(Box::new(Employee::new("Roe", "b.roe@example.org", 1.0)));
        let (first_slot, second_slot) = (work.slot(first), work.slot(second));
        work.entry_mut(first)
            .record
            .set_link_target_at("manager_id", Some(second_slot));
        work.entry_mut(second)
            .record
            .set_link_target_at("manager_id", Some(first_slot));

        let err = build(&conn, &mut work).unwrap_err();
        match err {
            SessionError::CyclicDependency { stuck } => assert_eq!(stuck.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(work.entry(first).state, EntryState::Added);
    }
}
