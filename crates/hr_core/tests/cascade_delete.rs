use hr_core::model::{Department, Dependent, Employee, EmployeeRelation, Region};
use hr_core::{open_db_in_memory, seed_sample_data, EntryState, Session, SessionError};
use rusqlite::Connection;

fn seeded() -> Connection {
    let conn = open_db_in_memory().unwrap();
    seed_sample_data(&conn).unwrap();
    conn
}

fn shipping(session: &mut Session<'_>) -> hr_core::Handle<Department> {
    session
        .query::<Department>()
        .where_eq("department_name", "Shipping".to_string())
        .first()
        .unwrap()
        .unwrap()
}

#[test]
fn removing_a_department_removes_its_employees_and_their_dependents() {
    let conn = seeded();
    let mut session = Session::new(&conn);
    let king = session.find::<Employee>(&100).unwrap().unwrap();
    let weiss = session.find::<Employee>(&120).unwrap().unwrap();
    session.load(king, EmployeeRelation::Subordinates).unwrap();
    assert_eq!(session.get(king).unwrap().subordinates.len(), 9);

    let department = shipping(&mut session);
    session.remove(department).unwrap();
    let summary = session.commit().unwrap();

    assert_eq!(summary.deleted, 8);
    assert_eq!(summary.cascaded, 7);
    assert_eq!(session.count_persisted::<Department>().unwrap(), 10);
    assert_eq!(session.count_persisted::<Employee>().unwrap(), 22);
    assert_eq!(session.count_persisted::<Dependent>().unwrap(), 14);

    assert_eq!(session.entry_state(weiss).unwrap(), EntryState::Detached);
    assert_eq!(session.entry_state(department).unwrap(), EntryState::Detached);
    assert!(matches!(session.get(weiss), Err(SessionError::UnknownEntity(_))));
    assert!(matches!(session.get_mut(weiss), Err(SessionError::UnknownEntity(_))));
    let subordinates = &session.get(king).unwrap().subordinates;
    assert_eq!(subordinates.len(), 6);
    assert!(!subordinates.contains(weiss));
    assert!(session.find::<Employee>(&126).unwrap().is_none());
}

#[test]
fn removing_a_manager_keeps_subordinates_without_a_manager() {
    let conn = seeded();
    let mut session = Session::new(&conn);
    let russell = session.find::<Employee>(&145).unwrap().unwrap();
    session.remove(russell).unwrap();

    let summary = session.commit().unwrap();
    assert_eq!(summary.deleted, 2);
    assert_eq!(summary.cascaded, 1);
    assert_eq!(summary.updated, 3);

    let mut fresh = Session::new(&conn);
    for id in [176, 177, 178] {
        let employee = fresh.find::<Employee>(&id).unwrap().unwrap();
        assert_eq!(fresh.get(employee).unwrap().manager_id, None);
    }
    let fred = fresh
        .query::<Dependent>()
        .where_eq("first_name", "Fred".to_string())
        .count()
        .unwrap();
    assert_eq!(fred, 0);
}

#[test]
fn removing_a_region_orphans_its_countries() {
    let conn = seeded();
    let mut session = Session::new(&conn);
    let africa = session.find::<Region>(&4).unwrap().unwrap();
    session.remove(africa).unwrap();

    let summary = session.commit().unwrap();
    assert_eq!((summary.deleted, summary.updated), (1, 1));

    let mut fresh = Session::new(&conn);
    let zambia = fresh.find::<hr_core::Country>(&"ZM".to_string()).unwrap().unwrap();
    assert_eq!(fresh.get(zambia).unwrap().region_id, None);
}

#[test]
fn cascade_is_part_of_the_same_atomic_commit() {
    let conn = seeded();
    let mut session = Session::new(&conn);
    let department = shipping(&mut session);
    session.remove(department).unwrap();
    session
        .add(Dependent::new("Jonathan", "Doe", "Child").of_employee_id(99_999))
        .unwrap();

    assert!(matches!(session.commit(), Err(SessionError::CommitFailed(_))));
    assert_eq!(session.count_persisted::<Employee>().unwrap(), 26);
    assert_eq!(session.count_persisted::<Dependent>().unwrap(), 17);
    assert_eq!(session.entry_state(department).unwrap(), EntryState::Deleted);
}

#[test]
fn rows_staged_for_removal_disappear_from_queries() {
    let conn = seeded();
    let mut session = Session::new(&conn);
    let department = shipping(&mut session);
    session.remove(department).unwrap();

    let names: Vec<String> = session
        .query::<Department>()
        .list()
        .unwrap()
        .into_iter()
        .map(|handle| session.get(handle).unwrap().department_name.clone())
        .collect();
    assert_eq!(names.len(), 10);
    assert!(!names.contains(&"Shipping".to_string()));
}
