//! Declarative constraints on user fields.
//!
//! Validation is pure and collects every violation instead of stopping at
//! the first one. Uniqueness needs the store and is checked by the service.

use serde::Serialize;

/// Maximum length for email and name fields.
pub const MAX_FIELD_LEN: usize = 255;

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// bcrypt only looks at the first 72 bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// A single failed constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON name of the offending field.
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The field values to check.
#[derive(Debug, Clone, Copy, Default)]
pub struct Candidate<'a> {
    pub email: Option<&'a str>,
    /// Plaintext password, when one is being set.
    pub password: Option<&'a str>,
    pub password_required: bool,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

/// Check every constraint and return all violations.
pub fn validate(candidate: &Candidate<'_>) -> Vec<Violation> {
    let mut violations = Vec::new();

    match candidate.email.map(str::trim) {
        None | Some("") => violations.push(not_blank("email")),
        Some(email) => {
            if email.chars().count() > MAX_FIELD_LEN {
                violations.push(too_long("email", MAX_FIELD_LEN));
            }
            if !is_valid_email(email) {
                violations.push(Violation::new(
                    "email",
                    "This value is not a valid email address.",
                ));
            }
        }
    }

    match candidate.password {
        None | Some("") if candidate.password_required => {
            violations.push(not_blank("password"));
        }
        None | Some("") => {}
        Some(password) => {
            if password.chars().count() < MIN_PASSWORD_LEN {
                violations.push(Violation::new(
                    "password",
                    format!(
                        "This value is too short. It should have {MIN_PASSWORD_LEN} characters or more."
                    ),
                ));
            }
            if password.len() > MAX_PASSWORD_BYTES {
                violations.push(too_long("password", MAX_PASSWORD_BYTES));
            }
        }
    }

    for (field, value) in [
        ("firstName", candidate.first_name),
        ("lastName", candidate.last_name),
    ] {
        if value.is_some_and(|v| v.chars().count() > MAX_FIELD_LEN) {
            violations.push(too_long(field, MAX_FIELD_LEN));
        }
    }

    violations
}

fn not_blank(field: &str) -> Violation {
    Violation::new(field, "This value should not be blank.")
}

fn too_long(field: &str, max: usize) -> Violation {
    Violation::new(
        field,
        format!("This value is too long. It should have {max} characters or less."),
    )
}

/// Basic email validation.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
