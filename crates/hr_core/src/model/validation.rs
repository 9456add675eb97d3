//! Field rules checked before any row reaches the store.

use crate::model::entity::EntityKind;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static COUNTRY_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}$").expect("valid country code regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Field-level rule violation for one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text is empty or whitespace.
    BlankField {
        kind: EntityKind,
        field: &'static str,
    },
    /// Country codes are two uppercase ASCII letters.
    InvalidCountryCode(String),
    InvalidEmail(String),
    /// Salary is negative, NaN or infinite.
    InvalidSalary(f64),
    /// A required relationship has neither a key nor an object reference.
    MissingReference {
        kind: EntityKind,
        column: &'static str,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField { kind, field } => write!(f, "{kind}.{field} must not be blank"),
            Self::InvalidCountryCode(code) => {
                write!(f, "country code `{code}` must be two uppercase letters")
            }
            Self::InvalidEmail(email) => write!(f, "invalid email address `{email}`"),
            Self::InvalidSalary(value) => write!(f, "salary must be a non-negative amount, got {value}"),
            Self::MissingReference { kind, column } => {
                write!(f, "{kind}.{column} must reference an existing row")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(
    kind: EntityKind,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField { kind, field });
    }
    Ok(())
}

pub(crate) fn require_country_code(code: &str) -> Result<(), ValidationError> {
    if !COUNTRY_CODE_RE.is_match(code) {
        return Err(ValidationError::InvalidCountryCode(code.to_string()));
    }
    Ok(())
}

pub(crate) fn require_email(email: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

pub(crate) fn require_salary(salary: f64) -> Result<(), ValidationError> {
    if !salary.is_finite() || salary < 0.0 {
        return Err(ValidationError::InvalidSalary(salary));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{require_country_code, require_email, require_salary, require_text};
    use crate::model::entity::EntityKind;

    #[test]
    fn country_code_must_be_two_uppercase_letters() {
        assert!(require_country_code("WL").is_ok());
        assert!(require_country_code("wl").is_err());
        assert!(require_country_code("USA").is_err());
        assert!(require_country_code("").is_err());
    }

    #[test]
    fn email_needs_user_and_domain() {
        assert!(require_email("neena.smith@sqltutorial.org").is_ok());
        assert!(require_email("neena.smith").is_err());
        assert!(require_email("neena smith@sqltutorial.org").is_err());
    }

    #[test]
    fn salary_rejects_negative_and_nan() {
        assert!(require_salary(0.0).is_ok());
        assert!(require_salary(-1.0).is_err());
        assert!(require_salary(f64::NAN).is_err());
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(require_text(EntityKind::Region, "region_name", "  ").is_err());
        assert!(require_text(EntityKind::Region, "region_name", "Europe").is_ok());
    }
}
