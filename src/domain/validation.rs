use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Missing { field: &'static str },
    Empty { field: &'static str },
    WrongType {
        field: &'static str,
        expected: &'static str,
        input: String,
    },
    InvalidEmail { field: &'static str, input: String },
    InvalidPhone { field: &'static str, input: String },
    InvalidDate { field: &'static str, input: String },
    BirthDayTooOld { field: &'static str, input: String },
    InvalidGender { field: &'static str, input: String },
    InvalidClientId { field: &'static str, input: String },
    NotEnoughArguments,
    UnknownMethod { method: String },
}

impl ValidationError {
    /// Name of the field that failed validation, when the failure is tied to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Missing { field }
            | Self::Empty { field }
            | Self::WrongType { field, .. }
            | Self::InvalidEmail { field, .. }
            | Self::InvalidPhone { field, .. }
            | Self::InvalidDate { field, .. }
            | Self::BirthDayTooOld { field, .. }
            | Self::InvalidGender { field, .. }
            | Self::InvalidClientId { field, .. } => Some(*field),
            Self::NotEnoughArguments => None,
            Self::UnknownMethod { .. } => Some("method"),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { field } => write!(f, "{field} is required"),
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::WrongType {
                field,
                expected,
                input,
            } => write!(f, "{field} must be {expected}, got {input}"),
            Self::InvalidEmail { field, input } => write!(f, "invalid {field}: {input}"),
            Self::InvalidPhone { field, input } => write!(f, "invalid {field}: {input}"),
            Self::InvalidDate { field, input } => {
                write!(f, "invalid {field}: {input} (expected DD.MM.YYYY)")
            }
            Self::BirthDayTooOld { field, input } => {
                write!(f, "{field} is more than 70 years ago: {input}")
            }
            Self::InvalidGender { field, input } => {
                write!(f, "invalid {field}: {input} (expected 0, 1 or 2)")
            }
            Self::InvalidClientId { field, input } => {
                write!(f, "{field} must contain only integers, got {input}")
            }
            Self::NotEnoughArguments => write!(
                f,
                "at least one pair is required: phone/email, first_name/last_name or gender/birthday"
            ),
            Self::UnknownMethod { method } => write!(f, "unknown method: {method}"),
        }
    }
}

impl std::error::Error for ValidationError {}
