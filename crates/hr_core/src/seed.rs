//! HR sample dataset used by the CLI scenarios and integration tests.
//!
//! # Invariants
//! - Seeding is skipped when the store already holds regions.
//! - All rows go through one session commit, so a partial seed never lands.

use crate::model::{Country, Department, Dependent, Employee, Location, Region};
use crate::session::{Session, SessionResult};
use log::info;
use rusqlite::Connection;

const REGIONS: &[(i64, &str)] = &[
    (1, "Europe"),
    (2, "Americas"),
    (3, "Asia"),
    (4, "Middle East and Africa"),
];

const COUNTRIES: &[(&str, &str, i64)] = &[
    ("AR", "Argentina", 2),
    ("AU", "Australia", 3),
    ("BR", "Brazil", 2),
    ("CA", "Canada", 2),
    ("CN", "China", 3),
    ("DE", "Germany", 1),
    ("FR", "France", 1),
    ("IN", "India", 3),
    ("JP", "Japan", 3),
    ("UK", "United Kingdom", 1),
    ("US", "United States of America", 2),
    ("ZM", "Zambia", 4),
];

/// `(id, street, postal code, city, state/province, country)`.
const LOCATIONS: &[(i64, &str, &str, &str, Option<&str>, &str)] = &[
    (1400, "2014 Jabberwocky Rd", "26192", "Southlake", Some("Texas"), "US"),
    (1500, "2011 Interiors Blvd", "99236", "South San Francisco", Some("California"), "US"),
    (1700, "2004 Charade Rd", "98199", "Seattle", Some("Washington"), "US"),
    (1800, "147 Spadina Ave", "M5V 2L7", "Toronto", Some("Ontario"), "CA"),
    (2400, "8204 Arthur St", "", "London", None, "UK"),
    (2500, "Magdalen Centre, The Oxford Science Park", "OX9 9ZB", "Oxford", Some("Oxford"), "UK"),
    (2700, "Schwanthalerstr. 7031", "80925", "Munich", Some("Bavaria"), "DE"),
];

const DEPARTMENTS: &[(i64, &str, i64)] = &[
    (1, "Administration", 1700),
    (2, "Marketing", 1800),
    (3, "Purchasing", 1700),
    (4, "Human Resources", 2400),
    (5, "Shipping", 1500),
    (6, "IT", 1400),
    (7, "Public Relations", 2700),
    (8, "Sales", 2500),
    (9, "Executive", 1700),
    (10, "Finance", 1700),
    (11, "Accounting", 1700),
];

/// `(id, first, last, phone, salary, manager, department)`.
type EmployeeRow = (
    i64,
    &'static str,
    &'static str,
    Option<&'static str>,
    f64,
    Option<i64>,
    Option<i64>,
);

const EMPLOYEES: &[EmployeeRow] = &[
    (100, "Steven", "King", Some("515.123.4567"), 24000.0, None, Some(9)),
    (101, "Neena", "Kochhar", Some("515.123.4568"), 17000.0, Some(100), Some(9)),
    (102, "Lex", "De Haan", Some("515.123.4569"), 17000.0, Some(100), Some(9)),
    (103, "Alexander", "Hunold", Some("590.423.4567"), 9000.0, Some(102), Some(6)),
    (104, "Bruce", "Ernst", Some("590.423.4568"), 6000.0, Some(103), Some(6)),
    (108, "Nancy", "Greenberg", Some("515.124.4569"), 12000.0, Some(101), Some(10)),
    (109, "Daniel", "Faviet", Some("515.124.4169"), 9000.0, Some(108), Some(10)),
    (112, "Jose Manuel", "Urman", Some("515.124.4469"), 7800.0, Some(108), Some(10)),
    (114, "Den", "Raphaely", Some("515.127.4561"), 11000.0, Some(100), Some(3)),
    (115, "Alexander", "Khoo", Some("515.127.4562"), 3100.0, Some(114), Some(3)),
    (120, "Matthew", "Weiss", Some("650.123.1234"), 8000.0, Some(100), Some(5)),
    (121, "Adam", "Fripp", Some("650.123.2234"), 8200.0, Some(100), Some(5)),
    (122, "Payam", "Kaufling", Some("650.123.3234"), 7900.0, Some(100), Some(5)),
    (126, "Irene", "Mikkilineni", Some("650.124.1224"), 2700.0, Some(120), Some(5)),
    (145, "John", "Russell", Some("011.44.1344.429268"), 14000.0, Some(100), Some(8)),
    (146, "Karen", "Partners", Some("011.44.1344.467268"), 13500.0, Some(100), Some(8)),
    (176, "Jonathon", "Taylor", Some("011.44.1644.429265"), 8600.0, Some(145), Some(8)),
    (177, "Jack", "Livingston", None, 8400.0, Some(145), Some(8)),
    (178, "Kimberely", "Grant", None, 7000.0, Some(145), None),
    (200, "Jennifer", "Whalen", Some("515.123.4444"), 4400.0, Some(101), Some(1)),
    (201, "Michael", "Hartstein", Some("515.123.5555"), 13000.0, Some(100), Some(2)),
    (202, "Pat", "Fay", Some("603.123.6666"), 6000.0, Some(201), Some(2)),
    (203, "Susan", "Mavris", Some("515.123.7777"), 6500.0, Some(101), Some(4)),
    (204, "Hermann", "Baer", Some("515.123.8888"), 10000.0, Some(101), Some(7)),
    (205, "Shelley", "Higgins", Some("515.123.8080"), 12000.0, Some(101), Some(11)),
    (206, "William", "Gietz", Some("515.123.8181"), 8300.0, Some(205), Some(11)),
];

/// `(id, first name, last name, employee)`; every dependent is a child.
const DEPENDENTS: &[(i64, &str, &str, i64)] = &[
    (1, "Penelope", "Gietz", 206),
    (2, "Nick", "Higgins", 205),
    (3, "Ed", "Whalen", 200),
    (4, "Jennifer", "King", 100),
    (5, "Johnny", "Kochhar", 101),
    (6, "Bette", "De Haan", 102),
    (7, "Grace", "Faviet", 109),
    (8, "Uma", "Urman", 112),
    (9, "Kirsten", "Weiss", 120),
    (10, "Elvis", "Fripp", 121),
    (11, "Sean", "Kaufling", 122),
    (12, "Fred", "Russell", 145),
    (13, "Sandra", "Taylor", 176),
    (14, "Vivien", "Hartstein", 201),
    (15, "David", "Mavris", 203),
    (16, "Cuba", "Baer", 204),
    (17, "Kirsten", "Hunold", 103),
];

/// `first.last@sqltutorial.org`, lowercase with spaces removed.
pub fn sample_email(first: &str, last: &str) -> String {
    let local = format!("{first}.{last}").to_lowercase().replace(' ', "");
    format!("{local}@sqltutorial.org")
}

/// Loads the sample dataset into an empty store.
///
/// Returns `false` without writing when regions already exist.
pub fn seed_sample_data(conn: &Connection) -> SessionResult<bool> {
    let mut session = Session::new(conn);
    if session.count_persisted::<Region>()? > 0 {
        info!("event=seed module=seed status=skipped reason=store_not_empty");
        return Ok(false);
    }

    session.add_range(
        REGIONS
            .iter()
            .map(|(id, name)| Region::with_id(*id, *name)),
    )?;
    session.add_range(
        COUNTRIES
            .iter()
            .map(|(code, name, region)| Country::new(*code, *name).in_region_id(*region)),
    )?;
    session.add_range(LOCATIONS.iter().map(
        |(id, street, postal_code, city, state, country)| Location {
            location_id: Some(*id),
            postal_code: (!postal_code.is_empty()).then(|| postal_code.to_string()),
            state_province: state.map(str::to_string),
            ..Location::new(*city).at(*street).in_country_id(*country)
        },
    ))?;
    session.add_range(DEPARTMENTS.iter().map(|(id, name, location)| Department {
        department_id: Some(*id),
        ..Department::new(*name).at_location_id(*location)
    }))?;
    session.add_range(EMPLOYEES.iter().map(
        |(id, first, last, phone, salary, manager, department)| Employee {
            employee_id: Some(*id),
            first_name: Some(first.to_string()),
            phone_number: phone.map(str::to_string),
            manager_id: *manager,
            department_id: *department,
            ..Employee::new(*last, sample_email(first, last), *salary)
        },
    ))?;
    session.add_range(DEPENDENTS.iter().map(|(id, first, last, employee)| Dependent {
        dependent_id: Some(*id),
        ..Dependent::new(*first, *last, "Child").of_employee_id(*employee)
    }))?;

    let summary = session.commit()?;
    info!(
        "event=seed module=seed status=ok inserted={}",
        summary.inserted
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::{sample_email, seed_sample_data};
    use crate::db::open_db_in_memory;
    use crate::model::{Dependent, Employee, Region};
    use crate::session::Session;

    #[test]
    fn sample_email_strips_spaces() {
        assert_eq!(sample_email("Lex", "De Haan"), "lex.dehaan@sqltutorial.org");
        assert_eq!(
            sample_email("Jose Manuel", "Urman"),
            "josemanuel.urman@sqltutorial.org"
        );
    }

    #[test]
    fn seeding_twice_writes_once() {
        let conn = open_db_in_memory().unwrap();
        assert!(seed_sample_data(&conn).unwrap());
        assert!(!seed_sample_data(&conn).unwrap());

        let session = Session::new(&conn);
        assert_eq!(session.count_persisted::<Region>().unwrap(), 4);
        assert_eq!(session.count_persisted::<Employee>().unwrap(), 26);
        assert_eq!(session.count_persisted::<Dependent>().unwrap(), 17);
    }
}
