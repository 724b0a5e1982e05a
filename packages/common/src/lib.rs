pub mod capacity;
pub mod registration_status;
pub mod role;

pub use capacity::Occupancy;
pub use registration_status::RegistrationStatus;
pub use role::UserRole;

/// Error when parsing an invalid enum string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field} '{invalid}'. Valid values: {valid}")]
pub struct ParseEnumError {
    field: &'static str,
    invalid: String,
    valid: String,
}

impl ParseEnumError {
    pub(crate) fn new<'a>(
        field: &'static str,
        invalid: &str,
        valid: impl Iterator<Item = &'a str>,
    ) -> Self {
        Self {
            field,
            invalid: invalid.to_string(),
            valid: valid.collect::<Vec<_>>().join(", "),
        }
    }
}
