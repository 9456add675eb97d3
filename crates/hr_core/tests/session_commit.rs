use hr_core::model::{Country, Dependent, Employee, Location, Region};
use hr_core::{open_db_in_memory, seed_sample_data, EntryState, Session, SessionError};
use rusqlite::Connection;

fn seeded() -> Connection {
    let conn = open_db_in_memory().unwrap();
    seed_sample_data(&conn).unwrap();
    conn
}

#[test]
fn country_referencing_pending_region_gets_its_generated_key() {
    let conn = seeded();
    let mut session = Session::new(&conn);
    let antarctica = session.add(Region::new("Antarctica")).unwrap();
    let countries = session
        .add_range(vec![
            Country::new("WL", "Wilkes Land").in_region(antarctica),
            Country::new("EL", "Enderby Land").in_region(antarctica),
            Country::new("SP", "Spain").in_region_id(1),
        ])
        .unwrap();
    session
        .add(Location::new("Iceford").at("12 Icy Road").in_country(countries[0]))
        .unwrap();

    let summary = session.commit().unwrap();
    assert_eq!(summary.inserted, 5);
    assert!(!session.has_changes());

    let region_id = session.get(antarctica).unwrap().region_id.unwrap();
    assert_eq!(region_id, 5);
    assert_eq!(session.entry_state(antarctica).unwrap(), EntryState::Unchanged);

    let mut fresh = Session::new(&conn);
    let wilkes = fresh.find::<Country>(&"WL".to_string()).unwrap().unwrap();
    assert_eq!(fresh.get(wilkes).unwrap().region_id, Some(region_id));
    let iceford = fresh
        .query::<Location>()
        .where_eq("city", "Iceford".to_string())
        .first()
        .unwrap()
        .unwrap();
    assert_eq!(fresh.get(iceford).unwrap().country_id.as_deref(), Some("WL"));
}

#[test]
fn updating_one_field_leaves_the_rest_of_the_row_alone() {
    let conn = seeded();
    let before = {
        let mut session = Session::new(&conn);
        let neena = session.find::<Employee>(&101).unwrap().unwrap();
        let before = serde_json::to_value(session.get(neena).unwrap()).unwrap();
        session.get_mut(neena).unwrap().salary = 17500.0;
        assert_eq!(session.entry_state(neena).unwrap(), EntryState::Modified);
        let summary = session.commit().unwrap();
        assert_eq!(summary.updated, 1);
        before
    };

    let mut session = Session::new(&conn);
    let neena = session.find::<Employee>(&101).unwrap().unwrap();
    let mut after = serde_json::to_value(session.get(neena).unwrap()).unwrap();
    assert_eq!(after["salary"], serde_json::json!(17500.0));
    after["salary"] = before["salary"].clone();
    assert_eq!(after, before);
}

#[test]
fn failed_commit_writes_nothing_and_keeps_staged_state() {
    let conn = seeded();
    let mut session = Session::new(&conn);
    let arctic = session.add(Region::new("Arctic")).unwrap();
    let orphan = session
        .add(Dependent::new("Jonathan", "Doe", "Child").of_employee_id(99_999))
        .unwrap();

    let err = session.commit().unwrap_err();
    assert!(matches!(err, SessionError::CommitFailed(_)), "{err}");
    assert_eq!(session.count_persisted::<Region>().unwrap(), 4);
    assert_eq!(session.entry_state(arctic).unwrap(), EntryState::Added);
    assert_eq!(session.get(arctic).unwrap().region_id, None);
    assert_eq!(session.pending_changes(), 2);

    session.remove(orphan).unwrap();
    session.commit().unwrap();
    assert_eq!(session.count_persisted::<Region>().unwrap(), 5);
}

#[test]
fn pending_employees_managing_each_other_cannot_be_ordered() {
    let conn = seeded();
    let mut session = Session::new(&conn);
    let first = session
        .add(Employee::new("Doe", "jane.doe@sqltutorial.org", 5000.0))
        .unwrap();
    let second = session
        .add(Employee::new("Roe", "richard.roe@sqltutorial.org", 5000.0).managed_by(first))
        .unwrap();
    session.get_mut(first).unwrap().manager = Some(second);

    match session.commit().unwrap_err() {
        SessionError::CyclicDependency { stuck } => assert_eq!(stuck.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(session.count_persisted::<Employee>().unwrap(), 26);

    session.get_mut(first).unwrap().manager = None;
    session.commit().unwrap();
    let second_manager = session.get(second).unwrap().manager_id;
    assert_eq!(second_manager, session.get(first).unwrap().employee_id);
}

#[test]
fn operations_after_close_fail() {
    let conn = seeded();
    let mut session = Session::new(&conn);
    let king = session.find::<Employee>(&100).unwrap().unwrap();
    session.close();

    assert!(matches!(session.get(king), Err(SessionError::SessionClosed)));
    assert!(matches!(session.remove(king), Err(SessionError::SessionClosed)));
    assert!(matches!(
        session.query::<Employee>().list(),
        Err(SessionError::SessionClosed)
    ));
    assert!(matches!(session.commit(), Err(SessionError::SessionClosed)));
}

#[test]
fn removing_an_untracked_handle_fails() {
    let conn = seeded();
    let mut other = Session::new(&conn);
    let king = other.find::<Employee>(&100).unwrap().unwrap();

    let mut session = Session::new(&conn);
    assert!(matches!(
        session.remove(king),
        Err(SessionError::UnknownEntity(_))
    ));
}

#[test]
fn duplicate_keys_are_rejected_at_staging() {
    let conn = seeded();
    let mut session = Session::new(&conn);
    session.add(Country::new("WL", "Wilkes Land")).unwrap();
    assert!(matches!(
        session.add(Country::new("WL", "Wilkes Land")),
        Err(SessionError::DuplicateStaged { .. })
    ));

    session.find::<Country>(&"US".to_string()).unwrap().unwrap();
    assert!(matches!(
        session.add(Country::new("US", "United States")),
        Err(SessionError::DuplicateStaged { .. })
    ));
}

#[test]
fn handle_to_an_unstaged_entity_is_unresolved() {
    let conn = seeded();
    let mut session = Session::new(&conn);
    let antarctica = session.add(Region::new("Antarctica")).unwrap();
    session
        .add(Country::new("WL", "Wilkes Land").in_region(antarctica))
        .unwrap();
    session.remove(antarctica).unwrap();

    assert!(matches!(
        session.commit(),
        Err(SessionError::UnresolvedReference {
            column: "region_id",
            ..
        })
    ));
}

#[test]
fn invalid_fields_and_key_edits_are_rejected_before_writing() {
    let conn = seeded();
    let mut session = Session::new(&conn);
    let king = session.find::<Employee>(&100).unwrap().unwrap();
    session.get_mut(king).unwrap().email = "not-an-email".to_string();
    assert!(matches!(session.commit(), Err(SessionError::Validation(_))));

    session.get_mut(king).unwrap().email = "steven.king@sqltutorial.org".to_string();
    session.get_mut(king).unwrap().employee_id = Some(999);
    assert!(matches!(
        session.commit(),
        Err(SessionError::ImmutableKey { .. })
    ));
}
