//! Demo command: the create, read, update and delete scenarios, each in its
//! own session.
//!
//! Usage: hr demo --db <PATH>

use super::{CommandResult, DbArgs};
use clap::Args;
use hr_core::service::staff_service::{
    change_family_name, close_department, departments_in_country,
    dismiss_employees_without_phone, find_employee_by_name, raise_salary_for_parents,
    transfer_employee,
};
use hr_core::{Country, Dependent, Employee, Location, Region, Session};
use log::info;
use rusqlite::Connection;

const PARENT_RAISE: f64 = 200.0;

#[derive(Debug, Args)]
pub struct DemoArgs {
    #[command(flatten)]
    pub db: DbArgs,
}

/// Execute demo command
pub fn execute(args: DemoArgs) -> CommandResult {
    let conn = hr_core::open_db(&args.db.db)?;
    if hr_core::seed_sample_data(&conn)? {
        println!("Seeded sample data into {}", args.db.db.display());
    }

    create(&conn)?;
    read(&conn)?;
    update(&conn)?;
    delete(&conn)?;
    info!("event=demo module=cli status=ok");
    Ok(())
}

fn create(conn: &Connection) -> CommandResult {
    let mut session = Session::new(conn);
    if session.find::<Country>(&"WL".to_string())?.is_some() {
        println!("Antarctic countries already exist; skipping create");
        return Ok(());
    }

    let antarctica = session.add(Region::new("Antarctica"))?;
    let countries = session.add_range(vec![
        Country::new("WL", "Wilkes Land").in_region(antarctica),
        Country::new("EL", "Enderby Land").in_region(antarctica),
        Country::new("SP", "Spain").in_region_id(1),
    ])?;
    session.add(
        Location::new("Iceford")
            .at("12 Icy Road")
            .in_country(countries[0]),
    )?;
    session.add(Location {
        state_province: Some("Sachsen".to_string()),
        ..Location::new("Dresden")
            .at("134 Schnitzel Strasse")
            .in_country_id("DE")
    })?;
    session.add(Dependent::new("Jonathan", "Doe", "Child").of_employee_id(112))?;

    let summary = session.commit()?;
    println!("Created {} rows", summary.inserted);
    Ok(())
}

fn read(conn: &Connection) -> CommandResult {
    let mut session = Session::new(conn);
    println!("Departments located in the US:");
    for line in departments_in_country(&mut session, "US")? {
        println!("{}, {} employees", line.department_name, line.employee_count);
    }
    Ok(())
}

fn update(conn: &Connection) -> CommandResult {
    let mut session = Session::new(conn);
    let raised = raise_salary_for_parents(&mut session, PARENT_RAISE)?;
    println!("Raised salary of {raised} employees with dependents");

    if let Some(neena) = find_employee_by_name(&mut session, "Neena", "Kochhar")? {
        let renamed =
            change_family_name(&mut session, neena, "Smith", "neena.smith@sqltutorial.org")?;
        println!("Neena Kochhar is now Neena Smith ({renamed} dependents renamed)");
    }

    if transfer_employee(&mut session, 206, "Finance")? {
        println!("Employee 206 moved to Finance");
    }

    let summary = session.commit()?;
    println!("Updated {} rows", summary.updated);
    Ok(())
}

fn delete(conn: &Connection) -> CommandResult {
    let mut session = Session::new(conn);
    if close_department(&mut session, "Shipping")? {
        println!(
            "\nEmployees before closing Shipping: {}",
            session.count_persisted::<Employee>()?
        );
        session.commit()?;
        println!(
            "Employees after closing Shipping: {}",
            session.count_persisted::<Employee>()?
        );
    }

    dismiss_employees_without_phone(&mut session)?;
    session.commit()?;
    println!(
        "Employees after dismissals: {}",
        session.count_persisted::<Employee>()?
    );
    Ok(())
}
