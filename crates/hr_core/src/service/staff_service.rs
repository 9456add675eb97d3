//! Staff use-cases over a unit-of-work session.
//!
//! # Responsibility
//! - Express the HR read/update/delete scenarios as reusable operations.
//! - Stage changes only; callers decide when to commit.
//!
//! # Invariants
//! - Every operation reads through the session, so staged edits in the same
//!   session are visible to later operations.

use crate::model::{
    Department, DepartmentId, DepartmentRelation, Employee, EmployeeId, EmployeeRelation, Handle,
};
use crate::session::{Session, SessionResult};
use log::info;
use serde::{Deserialize, Serialize};

/// One line of the per-country department listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentHeadcount {
    pub department_id: DepartmentId,
    pub department_name: String,
    pub employee_count: usize,
}

/// Departments located in `country_id`, fewest employees first.
pub fn departments_in_country(
    session: &mut Session<'_>,
    country_id: &str,
) -> SessionResult<Vec<DepartmentHeadcount>> {
    let code = country_id.to_string();
    let departments = session
        .query::<Department>()
        .eager(DepartmentRelation::Location)
        .eager(DepartmentRelation::Employees)
        .filter(move |session, department| located_in(session, department, &code))
        .order_by(|_, department| department.employees.len())
        .list()?;

    departments
        .into_iter()
        .map(|handle| {
            let department = session.get(handle)?;
            Ok(DepartmentHeadcount {
                department_id: department.department_id.unwrap_or_default(),
                department_name: department.department_name.clone(),
                employee_count: department.employees.len(),
            })
        })
        .collect()
}

fn located_in(session: &Session<'_>, department: &Department, country_id: &str) -> bool {
    department
        .location
        .and_then(|location| session.get(location).ok())
        .is_some_and(|location| location.country_id.as_deref() == Some(country_id))
}

/// Adds `amount` to the salary of every employee with at least one dependent.
///
/// Returns how many employees got the raise.
pub fn raise_salary_for_parents(session: &mut Session<'_>, amount: f64) -> SessionResult<usize> {
    let parents = session
        .query::<Employee>()
        .eager(EmployeeRelation::Dependents)
        .filter(|_, employee| !employee.dependents.is_empty())
        .list()?;

    for parent in &parents {
        session.modify(*parent, |employee| employee.salary += amount)?;
    }
    info!(
        "event=salary_raise module=service status=ok employees={} amount={}",
        parents.len(),
        amount
    );
    Ok(parents.len())
}

pub fn find_employee_by_name(
    session: &mut Session<'_>,
    first_name: &str,
    last_name: &str,
) -> SessionResult<Option<Handle<Employee>>> {
    session
        .query::<Employee>()
        .where_eq("first_name", first_name.to_string())
        .where_eq("last_name", last_name.to_string())
        .first()
}

/// Renames an employee and every dependent, and replaces the email address.
///
/// Dependents are loaded explicitly. Returns how many dependents were renamed.
pub fn change_family_name(
    session: &mut Session<'_>,
    employee: Handle<Employee>,
    last_name: &str,
    email: &str,
) -> SessionResult<usize> {
    session.modify(employee, |employee| {
        employee.last_name = last_name.to_string();
        employee.email = email.to_string();
    })?;
    session.load(employee, EmployeeRelation::Dependents)?;

    let dependents: Vec<_> = session.get(employee)?.dependents.iter().collect();
    for dependent in &dependents {
        session.modify(*dependent, |dependent| {
            dependent.last_name = last_name.to_string();
        })?;
    }
    Ok(dependents.len())
}

/// Moves an employee into the named department.
///
/// Returns `false` when either the employee or the department does not exist.
pub fn transfer_employee(
    session: &mut Session<'_>,
    employee_id: EmployeeId,
    department_name: &str,
) -> SessionResult<bool> {
    let department = session
        .query::<Department>()
        .where_eq("department_name", department_name.to_string())
        .first()?;
    let employee = session.find::<Employee>(&employee_id)?;

    match (employee, department) {
        (Some(employee), Some(department)) => {
            session.modify(employee, |employee| employee.department = Some(department))?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Stages removal of the named department. Its employees and their
/// dependents follow at commit.
pub fn close_department(session: &mut Session<'_>, department_name: &str) -> SessionResult<bool> {
    let department = session
        .query::<Department>()
        .where_eq("department_name", department_name.to_string())
        .first()?;
    match department {
        Some(department) => {
            session.remove(department)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Stages removal of every employee without a phone number on record.
pub fn dismiss_employees_without_phone(session: &mut Session<'_>) -> SessionResult<usize> {
    let employees = session
        .query::<Employee>()
        .where_null("phone_number")
        .list()?;
    let dismissed = employees.len();
    session.remove_range(employees)?;
    Ok(dismissed)
}
