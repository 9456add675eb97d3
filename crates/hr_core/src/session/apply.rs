//! Writes a commit plan inside one SQLite transaction.
//!
//! # Invariants
//! - Inserts, then updates, then deletes, all in one `IMMEDIATE` transaction.
//! - Any error drops the transaction, which rolls it back.

use super::plan::Plan;
use super::resolve::settle_keys;
use super::tracker::{EntryState, Tracker};
use crate::model::handle::Slot;
use crate::repo::row_store::{self, RepoError, RepoResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};

pub(crate) fn apply(conn: &Connection, work: &mut Tracker, plan: &Plan) -> RepoResult<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    for index in &plan.inserts {
        settle_keys(work, *index).map_err(|err| RepoError::InvalidData(err.to_string()))?;
        let key = row_store::insert_row(&tx, work.entry(*index).record.as_ref())?;
        let entry = work.entry_mut(*index);
        if !entry.record.assign_key(&key) {
            return Err(RepoError::InvalidData(format!(
                "{} received key of the wrong shape: {key}",
                entry.record.kind()
            )));
        }
        entry.original_key = Some(key);
    }

    for index in &plan.updates {
        settle_keys(work, *index).map_err(|err| RepoError::InvalidData(err.to_string()))?;
        let entry = work.entry(*index);
        let key = entry.original_key.as_ref().ok_or_else(|| {
            RepoError::InvalidData(format!("{} has no persisted key", entry.record.kind()))
        })?;
        row_store::update_row(&tx, entry.record.as_ref(), key)?;
    }

    for index in &plan.deletes {
        let entry = work.entry(*index);
        let key = entry.original_key.as_ref().ok_or_else(|| {
            RepoError::InvalidData(format!("{} has no persisted key", entry.record.kind()))
        })?;
        row_store::delete_row(&tx, entry.record.kind(), key)?;
    }

    tx.commit()?;
    Ok(())
}

/// Moves the working tracker to its post-commit state.
pub(crate) fn settle(work: &mut Tracker) {
    let mut detached: Vec<Slot> = Vec::new();
    for index in 0..work.len() {
        match work.entry(index).state {
            EntryState::Added | EntryState::Modified => {
                work.set_state(index, EntryState::Unchanged);
            }
            EntryState::Deleted => {
                work.set_state(index, EntryState::Detached);
                detached.push(work.slot(index));
            }
            EntryState::Detached => detached.push(work.slot(index)),
            EntryState::Unchanged => {}
        }
    }
    work.forget_slots(&detached);
    work.rebuild_identity();
}
