use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde_json::{Map, Value};

use crate::domain::validation::ValidationError;

/// Declaration of one named slot in a request schema.
///
/// `required` means the key must be present with a non-null value; `nullable`
/// means an empty value (`""`, `[]`, `{}`) is accepted and treated as "no value".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub nullable: bool,
}

enum Slot<'a> {
    Absent,
    Empty(&'a Value),
    Present(&'a Value),
}

impl FieldSpec {
    pub const fn new(name: &'static str, required: bool, nullable: bool) -> Self {
        Self {
            name,
            required,
            nullable,
        }
    }

    /// Validate the slot as a [`FieldKind`]; `Ok(None)` when there is no value.
    pub fn extract<T: FieldKind>(
        &self,
        args: &Map<String, Value>,
    ) -> Result<Option<T>, ValidationError> {
        match self.slot(args)? {
            Slot::Absent => Ok(None),
            Slot::Empty(value) => {
                self.check_shape::<T>(value)?;
                Ok(None)
            }
            Slot::Present(value) => {
                self.check_shape::<T>(value)?;
                T::parse(self.name, value).map(Some)
            }
        }
    }

    /// Validate the slot as text. Absent and empty values both become empty text.
    pub fn extract_text(&self, args: &Map<String, Value>) -> Result<CharText, ValidationError> {
        Ok(self.extract::<CharText>(args)?.unwrap_or_default())
    }

    fn slot<'a>(&self, args: &'a Map<String, Value>) -> Result<Slot<'a>, ValidationError> {
        let value = match args.get(self.name) {
            None | Some(Value::Null) => {
                if self.required {
                    return Err(ValidationError::Missing { field: self.name });
                }
                return Ok(Slot::Absent);
            }
            Some(value) => value,
        };
        if is_empty(value) {
            if !self.nullable {
                return Err(ValidationError::Empty { field: self.name });
            }
            return Ok(Slot::Empty(value));
        }
        Ok(Slot::Present(value))
    }

    fn check_shape<T: FieldKind>(&self, value: &Value) -> Result<(), ValidationError> {
        if T::accepts(value) {
            return Ok(());
        }
        Err(ValidationError::WrongType {
            field: self.name,
            expected: T::EXPECTED,
            input: value.to_string(),
        })
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// A validated value constructed from a raw JSON value.
///
/// `parse` only sees present, non-empty values whose JSON shape passed [`FieldKind::accepts`].
pub trait FieldKind: Sized {
    /// Human-readable description of the accepted JSON shape.
    const EXPECTED: &'static str;

    fn accepts(value: &Value) -> bool;

    fn parse(field: &'static str, value: &Value) -> Result<Self, ValidationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
/// Free-form text.
pub struct CharText(String);

impl CharText {
    /// Wrap text; any string is valid.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for absent or empty input.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FieldKind for CharText {
    const EXPECTED: &'static str = "a string";

    fn accepts(value: &Value) -> bool {
        value.is_string()
    }

    fn parse(_field: &'static str, value: &Value) -> Result<Self, ValidationError> {
        Ok(Self(value.as_str().unwrap_or_default().to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
/// Method arguments. Only the top-level shape is checked here.
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Borrow the raw argument object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Every key the caller sent, in key order, whatever its value
    /// (`null` and empty values included).
    pub fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }
}

impl FieldKind for Arguments {
    const EXPECTED: &'static str = "an object";

    fn accepts(value: &Value) -> bool {
        value.is_object()
    }

    fn parse(_field: &'static str, value: &Value) -> Result<Self, ValidationError> {
        Ok(Self(value.as_object().cloned().unwrap_or_default()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// E-mail address.
///
/// Invariant: contains `@`.
pub struct Email(String);

impl Email {
    /// Borrow the validated address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FieldKind for Email {
    const EXPECTED: &'static str = "a string";

    fn accepts(value: &Value) -> bool {
        value.is_string()
    }

    fn parse(field: &'static str, value: &Value) -> Result<Self, ValidationError> {
        let raw = value.as_str().unwrap_or_default();
        if !raw.contains('@') {
            return Err(ValidationError::InvalidEmail {
                field,
                input: raw.to_owned(),
            });
        }
        Ok(Self(raw.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Russian mobile phone number in `7XXXXXXXXXX` form.
///
/// Accepted from either a JSON string or a JSON integer; stored as text.
pub struct Phone(String);

impl Phone {
    pub const LEN: usize = 11;

    /// Borrow the validated number as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FieldKind for Phone {
    const EXPECTED: &'static str = "a string or an integer";

    fn accepts(value: &Value) -> bool {
        value.is_string() || value.is_number()
    }

    fn parse(field: &'static str, value: &Value) -> Result<Self, ValidationError> {
        let raw = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let valid = raw.len() == Self::LEN
            && raw.starts_with('7')
            && raw.bytes().all(|b| b.is_ascii_digit());
        if !valid {
            return Err(ValidationError::InvalidPhone { field, input: raw });
        }
        Ok(Self(raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Calendar date written as `DD.MM.YYYY`.
///
/// The raw text is kept alongside the parsed date.
pub struct Date {
    raw: String,
    date: NaiveDate,
}

impl Date {
    pub const FORMAT: &'static str = "%d.%m.%Y";

    /// Borrow the text as the caller sent it.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed calendar date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl FieldKind for Date {
    const EXPECTED: &'static str = "a string";

    fn accepts(value: &Value) -> bool {
        value.is_string()
    }

    fn parse(field: &'static str, value: &Value) -> Result<Self, ValidationError> {
        let raw = value.as_str().unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw, Self::FORMAT).map_err(|_| {
            ValidationError::InvalidDate {
                field,
                input: raw.to_owned(),
            }
        })?;
        Ok(Self {
            raw: raw.to_owned(),
            date,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Date of birth.
///
/// Invariant: midnight of the date is no earlier than 70×365.25 days before
/// the validation instant.
pub struct BirthDay(Date);

impl BirthDay {
    /// 70 × 365.25 days, in seconds.
    pub const MAX_AGE_SECS: i64 = 25_567 * 86_400 + 43_200;

    /// [`Self::MAX_AGE_SECS`] as a duration.
    pub fn max_age() -> TimeDelta {
        TimeDelta::seconds(Self::MAX_AGE_SECS)
    }

    /// Apply the age limit to an already parsed [`Date`].
    pub fn from_date(
        field: &'static str,
        date: Date,
        now: NaiveDateTime,
    ) -> Result<Self, ValidationError> {
        let oldest = now - Self::max_age();
        if date.date().and_time(chrono::NaiveTime::MIN) < oldest {
            return Err(ValidationError::BirthDayTooOld {
                field,
                input: date.raw,
            });
        }
        Ok(Self(date))
    }

    /// Borrow the text as the caller sent it.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The parsed date of birth.
    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Gender code: `0` unknown, `1` male, `2` female.
pub enum Gender {
    Unknown,
    Male,
    Female,
}

impl Gender {
    /// Map a wire code to a [`Gender`]; `None` outside `0..=2`.
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => Self::Unknown,
            1 => Self::Male,
            2 => Self::Female,
            _ => return None,
        })
    }

    /// The wire code.
    pub fn code(self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Male => 1,
            Self::Female => 2,
        }
    }

    /// Lower-case name used in logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

impl FieldKind for Gender {
    const EXPECTED: &'static str = "an integer";

    fn accepts(value: &Value) -> bool {
        value.is_number()
    }

    fn parse(field: &'static str, value: &Value) -> Result<Self, ValidationError> {
        value
            .as_i64()
            .and_then(Self::from_code)
            .ok_or_else(|| ValidationError::InvalidGender {
                field,
                input: value.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Ordered list of client ids.
///
/// Invariant: non-empty.
pub struct ClientIds(Vec<i64>);

impl ClientIds {
    /// Borrow the ids in request order.
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    /// Number of ids requested.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for a validated list.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FieldKind for ClientIds {
    const EXPECTED: &'static str = "an array";

    fn accepts(value: &Value) -> bool {
        value.is_array()
    }

    fn parse(field: &'static str, value: &Value) -> Result<Self, ValidationError> {
        let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
        if items.is_empty() {
            return Err(ValidationError::Empty { field });
        }
        let ids = items
            .iter()
            .map(|item| {
                item.as_i64().ok_or_else(|| ValidationError::InvalidClientId {
                    field,
                    input: item.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(ids))
    }
}
