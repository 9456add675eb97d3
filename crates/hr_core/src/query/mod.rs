//! Query façade over the session.
//!
//! # Responsibility
//! - Build filtered, sorted reads of one entity type.
//! - Populate relationships eagerly through the session's loader.
//!
//! # Invariants
//! - Results go through the identity map: a tracked row is returned as the
//!   existing handle with its in-memory values.
//! - Rows staged for removal and pending inserts are never returned.
//! - Column conditions run in SQL and are re-checked against in-memory values;
//!   a foreign-key column follows the handle assigned in this session.

use crate::model::entity::{Entity, Record};
use crate::model::handle::Handle;
use crate::repo::row_store::{self, ColumnFilter};
use crate::session::{EntryState, Session, SessionError, SessionResult};
use log::debug;
use rusqlite::types::Value;
use std::cmp::Ordering;

type Predicate<'s, 'conn, E> = Box<dyn Fn(&Session<'conn>, &E) -> bool + 's>;
type Comparator<'s, 'conn, E> = Box<dyn Fn(&Session<'conn>, &E, &E) -> Ordering + 's>;

/// Buffered read of `E` rows. Nothing runs until `list`, `first` or `count`.
pub struct Query<'s, 'conn, E: Entity> {
    session: &'s mut Session<'conn>,
    filters: Vec<ColumnFilter>,
    unknown_column: Option<String>,
    eager: Vec<E::Relation>,
    predicates: Vec<Predicate<'s, 'conn, E>>,
    comparators: Vec<Comparator<'s, 'conn, E>>,
}

impl<'conn> Session<'conn> {
    pub fn query<E: Entity>(&mut self) -> Query<'_, 'conn, E> {
        Query {
            session: self,
            filters: Vec::new(),
            unknown_column: None,
            eager: Vec::new(),
            predicates: Vec::new(),
            comparators: Vec::new(),
        }
    }
}

impl<'s, 'conn, E: Entity> Query<'s, 'conn, E> {
    /// Keeps rows whose `column` equals `value`.
    pub fn where_eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        if self.check_column(column) {
            self.filters.push(ColumnFilter::Eq(column, value.into()));
        }
        self
    }

    /// Keeps rows whose `column` is `NULL`.
    pub fn where_null(mut self, column: &'static str) -> Self {
        if self.check_column(column) {
            self.filters.push(ColumnFilter::IsNull(column));
        }
        self
    }

    /// Populates `relation` on every returned entity before predicates and
    /// ordering run.
    pub fn eager(mut self, relation: E::Relation) -> Self {
        if !self.eager.contains(&relation) {
            self.eager.push(relation);
        }
        self
    }

    /// Keeps entities for which `predicate` holds. Runs in memory.
    pub fn filter(mut self, predicate: impl Fn(&Session<'conn>, &E) -> bool + 's) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    /// Sorts by `key`, ascending. Later calls break ties of earlier ones.
    pub fn order_by<K: Ord>(mut self, key: impl Fn(&Session<'conn>, &E) -> K + 's) -> Self {
        self.comparators
            .push(Box::new(move |session, left, right| {
                key(session, left).cmp(&key(session, right))
            }));
        self
    }

    pub fn order_by_desc<K: Ord>(mut self, key: impl Fn(&Session<'conn>, &E) -> K + 's) -> Self {
        self.comparators
            .push(Box::new(move |session, left, right| {
                key(session, right).cmp(&key(session, left))
            }));
        self
    }

    /// Runs the query. Without ordering, results come by primary key.
    pub fn list(self) -> SessionResult<Vec<Handle<E>>> {
        let Query {
            session,
            filters,
            unknown_column,
            eager,
            predicates,
            comparators,
        } = self;
        session.ensure_open()?;
        if let Some(column) = unknown_column {
            return Err(SessionError::UnknownColumn {
                kind: E::KIND,
                column,
            });
        }

        let rows = row_store::select_where::<E>(session.conn(), &filters)?;
        let fetched = rows.len();
        for row in rows {
            session.tracker_mut().attach(Box::new(row));
        }

        let tracker = session.tracker();
        let mut candidates: Vec<usize> = tracker
            .entries()
            .filter(|(index, entry)| {
                entry.record.kind() == E::KIND
                    && matches!(entry.state, EntryState::Unchanged | EntryState::Modified)
                    && filters.iter().all(|filter| {
                        matches_filter(tracker.column_value(*index, filter.column()), filter)
                    })
            })
            .map(|(index, _)| index)
            .collect();
        candidates.sort_by_key(|index| tracker.entry(*index).original_key.clone());
        let handles: Vec<Handle<E>> = candidates
            .into_iter()
            .map(|index| Handle::from_slot(tracker.slot(index)))
            .collect();

        for relation in eager {
            session.load_relation(&handles, relation)?;
        }

        let session: &Session<'conn> = session;
        let mut matched: Vec<(Handle<E>, &E)> = Vec::with_capacity(handles.len());
        for handle in handles {
            let entity = session.get(handle)?;
            if predicates.iter().all(|predicate| predicate(session, entity)) {
                matched.push((handle, entity));
            }
        }
        matched.sort_by(|(_, left), (_, right)| {
            comparators
                .iter()
                .map(|compare| compare(session, left, right))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        debug!(
            "event=query_list module=query status=ok kind={} fetched={} returned={}",
            E::KIND,
            fetched,
            matched.len()
        );
        Ok(matched.into_iter().map(|(handle, _)| handle).collect())
    }

    pub fn first(self) -> SessionResult<Option<Handle<E>>> {
        Ok(self.list()?.into_iter().next())
    }

    pub fn count(self) -> SessionResult<usize> {
        Ok(self.list()?.len())
    }

    fn check_column(&mut self, column: &'static str) -> bool {
        if row_store::has_column(E::KIND, column) {
            return true;
        }
        if self.unknown_column.is_none() {
            self.unknown_column = Some(column.to_string());
        }
        false
    }
}

fn matches_filter(current: Option<Value>, filter: &ColumnFilter) -> bool {
    let Some(current) = current else {
        return false;
    };
    match filter {
        ColumnFilter::Eq(_, expected) => same_value(&current, expected),
        ColumnFilter::IsNull(_) => current == Value::Null,
        ColumnFilter::In(_, keys) => keys
            .iter()
            .any(|key| same_value(&current, &Value::from(key.clone()))),
    }
}

/// SQL equality: `NULL` never matches, integers and reals compare by value.
fn same_value(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Integer(left), Value::Real(right)) | (Value::Real(right), Value::Integer(left)) => {
            (*left as f64) == *right
        }
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::same_value;
    use rusqlite::types::Value;

    #[test]
    fn null_never_equals_anything() {
        assert!(!same_value(&Value::Null, &Value::Null));
        assert!(!same_value(&Value::Null, &Value::Integer(1)));
    }

    #[test]
    fn integers_and_reals_compare_by_value() {
        assert!(same_value(&Value::Integer(9000), &Value::Real(9000.0)));
        assert!(same_value(&Value::Real(9000.0), &Value::Integer(9000)));
        assert!(!same_value(&Value::Text("9000".to_string()), &Value::Integer(9000)));
    }
}
