//! Unit-of-work session over one SQLite connection.
//!
//! # Responsibility
//! - Track entities loaded or staged through this session (identity map).
//! - Stage inserts, updates and removals and apply them atomically at commit.
//! - Hand out typed handles and resolve them back to entities.
//!
//! # Invariants
//! - One tracked entry per `(kind, key)`; queries return the tracked entry.
//! - A failed commit leaves every tracked entry exactly as it was.
//! - After `close()` every operation fails with `SessionError::SessionClosed`.

use crate::model::entity::{Entity, EntityKey, EntityKind, RowKey};
use crate::model::handle::Handle;
use crate::model::validation::ValidationError;
use crate::repo::row_store::{self, RepoError};
use log::{debug, error, info};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

mod apply;
mod load;
mod plan;
mod resolve;
mod tracker;

pub use tracker::EntryState;
use tracker::Tracker;

pub type SessionResult<T> = Result<T, SessionError>;

/// Error for session, commit and query operations.
#[derive(Debug)]
pub enum SessionError {
    /// A relationship points at an entity that has no key and is not pending
    /// insertion in this session.
    UnresolvedReference {
        kind: EntityKind,
        column: &'static str,
    },
    /// The handle is not tracked by this session.
    UnknownEntity(EntityKind),
    /// An entity with the same key is already tracked.
    DuplicateStaged { kind: EntityKind, key: RowKey },
    /// Pending rows depend on each other so no insert order exists.
    CyclicDependency {
        stuck: Vec<(EntityKind, Option<RowKey>)>,
    },
    /// The store rejected the commit; nothing was written.
    CommitFailed(RepoError),
    SessionClosed,
    Validation(ValidationError),
    /// The primary key of a persisted row was edited.
    ImmutableKey {
        kind: EntityKind,
        original: RowKey,
    },
    UnknownColumn { kind: EntityKind, column: String },
    /// Read-path store failure.
    Db(RepoError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnresolvedReference { kind, column } => {
                write!(f, "{kind}.{column} references an entity with no key")
            }
            Self::UnknownEntity(kind) => write!(f, "{kind} is not tracked by this session"),
            Self::DuplicateStaged { kind, key } => {
                write!(f, "{kind} {key} is already tracked by this session")
            }
            Self::CyclicDependency { stuck } => {
                let rows: Vec<String> = stuck
                    .iter()
                    .map(|(kind, key)| match key {
                        Some(key) => format!("{kind} {key}"),
                        None => format!("new {kind}"),
                    })
                    .collect();
                write!(f, "cyclic dependency between pending rows: {}", rows.join(", "))
            }
            Self::CommitFailed(err) => write!(f, "commit failed: {err}"),
            Self::SessionClosed => write!(f, "session is closed"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::ImmutableKey { kind, original } => {
                write!(f, "primary key of {kind} {original} cannot change")
            }
            Self::UnknownColumn { kind, column } => write!(f, "{kind} has no column `{column}`"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CommitFailed(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for SessionError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SessionError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(value.into())
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Committing,
    Closed,
}

/// Row counts written by one successful commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Deleted rows that were not removed explicitly but followed a parent.
    pub cascaded: usize,
}

/// Explicit unit of work. Create one per logical operation and drop it when
/// done; nothing is shared between sessions except the connection.
pub struct Session<'conn> {
    conn: &'conn Connection,
    id: Uuid,
    state: SessionState,
    tracker: Tracker,
}

impl<'conn> Session<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        let id = Uuid::new_v4();
        debug!("event=session_open module=session status=ok session_id={id}");
        Self {
            conn,
            id,
            state: SessionState::Open,
            tracker: Tracker::new(id),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn conn(&self) -> &'conn Connection {
        self.conn
    }

    pub(crate) fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub(crate) fn tracker_mut(&mut self) -> &mut Tracker {
        &mut self.tracker
    }

    pub(crate) fn ensure_open(&self) -> SessionResult<()> {
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Committing | SessionState::Closed => Err(SessionError::SessionClosed),
        }
    }

    /// Stages `entity` for insertion.
    ///
    /// # Errors
    /// - `DuplicateStaged` when an entity with the same key is tracked.
    pub fn add<E: Entity>(&mut self, entity: E) -> SessionResult<Handle<E>> {
        self.ensure_open()?;
        if let Some(key) = entity.key() {
            let key = key.to_row_key();
            if self.tracker.lookup(E::KIND, &key).is_some() {
                return Err(SessionError::DuplicateStaged { kind: E::KIND, key });
            }
        }
        let index = self.tracker.push_added(Box::new(entity));
        Ok(Handle::from_slot(self.tracker.slot(index)))
    }

    /// Stages every entity for insertion, or none of them on error.
    pub fn add_range<E: Entity>(
        &mut self,
        entities: impl IntoIterator<Item = E>,
    ) -> SessionResult<Vec<Handle<E>>> {
        self.ensure_open()?;
        let entities: Vec<E> = entities.into_iter().collect();
        let mut seen = std::collections::HashSet::new();
        for key in entities.iter().filter_map(|entity| entity.key()) {
            let key = key.to_row_key();
            if self.tracker.lookup(E::KIND, &key).is_some() || !seen.insert(key.clone()) {
                return Err(SessionError::DuplicateStaged { kind: E::KIND, key });
            }
        }
        entities.into_iter().map(|entity| self.add(entity)).collect()
    }

    /// Stages the entity behind `handle` for deletion.
    ///
    /// Removing a pending insert un-stages it. Removing an entity twice is a
    /// no-op.
    pub fn remove<E: Entity>(&mut self, handle: Handle<E>) -> SessionResult<()> {
        self.ensure_open()?;
        let index = self.live_index(handle)?;
        match self.tracker.entry(index).state {
            EntryState::Added => self.tracker.set_state(index, EntryState::Detached),
            EntryState::Unchanged | EntryState::Modified => {
                self.tracker.set_state(index, EntryState::Deleted)
            }
            EntryState::Deleted | EntryState::Detached => {}
        }
        Ok(())
    }

    /// Stages every handle for deletion after checking all of them.
    pub fn remove_range<E: Entity>(
        &mut self,
        handles: impl IntoIterator<Item = Handle<E>>,
    ) -> SessionResult<()> {
        self.ensure_open()?;
        let handles: Vec<Handle<E>> = handles.into_iter().collect();
        for handle in &handles {
            self.live_index(*handle)?;
        }
        for handle in handles {
            self.remove(handle)?;
        }
        Ok(())
    }

    /// Current in-memory value of a tracked entity.
    /// Detached entities are no longer readable.
    pub fn get<E: Entity>(&self, handle: Handle<E>) -> SessionResult<&E> {
        self.ensure_open()?;
        let index = self.live_index(handle)?;
        self.tracker
            .entry(index)
            .record
            .as_any()
            .downcast_ref::<E>()
            .ok_or(SessionError::UnknownEntity(E::KIND))
    }

    /// Mutable access to a tracked entity. A loaded entity becomes
    /// `Modified` and its whole row is rewritten at commit.
    pub fn get_mut<E: Entity>(&mut self, handle: Handle<E>) -> SessionResult<&mut E> {
        self.ensure_open()?;
        let index = self.live_index(handle)?;
        if self.tracker.entry(index).state == EntryState::Unchanged {
            self.tracker.set_state(index, EntryState::Modified);
        }
        self.tracker
            .entry_mut(index)
            .record
            .as_any_mut()
            .downcast_mut::<E>()
            .ok_or(SessionError::UnknownEntity(E::KIND))
    }

    /// Applies `change` through `get_mut`.
    pub fn modify<E: Entity, R>(
        &mut self,
        handle: Handle<E>,
        change: impl FnOnce(&mut E) -> R,
    ) -> SessionResult<R> {
        Ok(change(self.get_mut(handle)?))
    }

    pub fn entry_state<E: Entity>(&self, handle: Handle<E>) -> SessionResult<EntryState> {
        self.ensure_open()?;
        let index = self
            .tracker
            .index_of(handle.slot())
            .ok_or(SessionError::UnknownEntity(E::KIND))?;
        Ok(self.tracker.entry(index).state)
    }

    pub fn has_changes(&self) -> bool {
        self.pending_changes() > 0
    }

    /// Number of entities staged for insert, update or delete.
    pub fn pending_changes(&self) -> usize {
        self.tracker
            .entries()
            .filter(|(_, entry)| entry.state.is_pending())
            .count()
    }

    /// Looks up an entity by key: identity map first, then the store.
    pub fn find<E: Entity>(&mut self, key: &E::Key) -> SessionResult<Option<Handle<E>>> {
        self.ensure_open()?;
        let row_key = key.to_row_key();
        if let Some(index) = self.tracker.lookup(E::KIND, &row_key) {
            return Ok(match self.tracker.entry(index).state {
                EntryState::Deleted | EntryState::Detached => None,
                _ => Some(Handle::from_slot(self.tracker.slot(index))),
            });
        }
        match row_store::select_by_key::<E>(self.conn, &row_key)? {
            Some(entity) => {
                let index = self.tracker.attach(Box::new(entity));
                Ok(match self.tracker.entry(index).state {
                    EntryState::Deleted | EntryState::Detached => None,
                    _ => Some(Handle::from_slot(self.tracker.slot(index))),
                })
            }
            None => Ok(None),
        }
    }

    /// Number of persisted rows of `E`, ignoring anything staged here.
    pub fn count_persisted<E: Entity>(&self) -> SessionResult<u64> {
        self.ensure_open()?;
        Ok(row_store::count_rows(self.conn, E::KIND, &[])?)
    }

    /// Applies every staged change in one transaction.
    ///
    /// # Errors
    /// - Resolution, ordering and validation errors before anything is written.
    /// - `CommitFailed` when the store rejects a statement; the transaction is
    ///   rolled back and tracked state is left untouched.
    pub fn commit(&mut self) -> SessionResult<CommitSummary> {
        self.ensure_open()?;
        let started_at = Instant::now();
        info!(
            "event=session_commit module=session status=start session_id={} pending={}",
            self.id,
            self.pending_changes()
        );

        self.state = SessionState::Committing;
        let mut work = self.tracker.clone();
        let outcome = plan::build(self.conn, &mut work).and_then(|plan| {
            apply::apply(self.conn, &mut work, &plan).map_err(SessionError::CommitFailed)?;
            Ok(plan)
        });
        self.state = SessionState::Open;

        match outcome {
            Ok(plan) => {
                apply::settle(&mut work);
                self.tracker = work;
                let summary = plan.summary();
                info!(
                    "event=session_commit module=session status=ok session_id={} duration_ms={} inserted={} updated={} deleted={} cascaded={}",
                    self.id,
                    started_at.elapsed().as_millis(),
                    summary.inserted,
                    summary.updated,
                    summary.deleted,
                    summary.cascaded
                );
                Ok(summary)
            }
            Err(err) => {
                error!(
                    "event=session_commit module=session status=error session_id={} duration_ms={} error={}",
                    self.id,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Releases all tracked state. Later calls fail with `SessionClosed`.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        let discarded = self.pending_changes();
        self.tracker.clear();
        self.state = SessionState::Closed;
        debug!(
            "event=session_close module=session status=ok session_id={} discarded={}",
            self.id, discarded
        );
    }

    fn live_index<E: Entity>(&self, handle: Handle<E>) -> SessionResult<usize> {
        let index = self
            .tracker
            .index_of(handle.slot())
            .ok_or(SessionError::UnknownEntity(E::KIND))?;
        if !self.tracker.entry(index).state.is_live() {
            return Err(SessionError::UnknownEntity(E::KIND));
        }
        Ok(index)
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::{EntryState, Session, SessionError, SessionState};
    use crate::db::open_db_in_memory;
    use crate::model::{Country, Region};

    #[test]
    fn add_remove_round_trip_leaves_nothing_pending() {
        let conn = open_db_in_memory().unwrap();
        let mut session = Session::new(&conn);
        let region = session.add(Region::new("Antarctica")).unwrap();
        assert_eq!(session.entry_state(region).unwrap(), EntryState::Added);
        assert!(session.has_changes());

        session.remove(region).unwrap();
        assert_eq!(session.entry_state(region).unwrap(), EntryState::Detached);
        assert!(!session.has_changes());
        assert!(matches!(
            session.remove(region),
            Err(SessionError::UnknownEntity(_))
        ));
    }

    #[test]
    fn add_range_is_all_or_nothing() {
        let conn = open_db_in_memory().unwrap();
        let mut session = Session::new(&conn);
        let err = session
            .add_range(vec![
                Country::new("WL", "Wilkes Land"),
                Country::new("WL", "Wilkes Land again"),
            ])
            .unwrap_err();
        assert!(matches!(err, SessionError::DuplicateStaged { .. }));
        assert_eq!(session.pending_changes(), 0);
    }

    #[test]
    fn handles_from_another_session_are_unknown() {
        let conn = open_db_in_memory().unwrap();
        let mut first = Session::new(&conn);
        let mut second = Session::new(&conn);
        let region = first.add(Region::new("Antarctica")).unwrap();

        assert!(matches!(second.get(region), Err(SessionError::UnknownEntity(_))));
        assert!(matches!(second.remove(region), Err(SessionError::UnknownEntity(_))));
    }

    #[test]
    fn closed_session_rejects_every_operation() {
        let conn = open_db_in_memory().unwrap();
        let mut session = Session::new(&conn);
        let region = session.add(Region::new("Antarctica")).unwrap();
        session.close();

        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(session.get(region), Err(SessionError::SessionClosed)));
        assert!(matches!(
            session.add(Region::new("Arctic")),
            Err(SessionError::SessionClosed)
        ));
        assert!(matches!(session.commit(), Err(SessionError::SessionClosed)));
    }
}
