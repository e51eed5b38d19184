//! Field validation for resource inputs
//!
//! Rules run before any network activity and accumulate: a [`Validator`]
//! reports every failing field at once instead of stopping at the first.

use chrono::Datelike;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// One failed rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every rule that failed for one input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Errors reported against one field
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.errors.iter().filter(move |e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        fn $name() -> &'static Regex {
            static CELL: OnceLock<Regex> = OnceLock::new();
            CELL.get_or_init(|| Regex::new($re).unwrap_or_else(|e| panic!("invalid pattern {}: {e}", $re)))
        }
    };
}

// S0123/0001/2019, or the digits run together
pattern!(index_number_regex, r"(?i)^[A-Z]{1,2}\d{4}(/\d{4}/\d{4}|\d{6,8})$");
pattern!(programme_code_regex, r"(?i)^[A-Z]{2,6}\d{1,4}[A-Z]?$");
pattern!(phone_regex, r"^(\+?255|0)[67]\d{8}$");
pattern!(email_regex, r"^[^@\s]+@[^@\s]+\.[^@\s]+$");
pattern!(confirmation_code_regex, r"^[A-Za-z0-9]{6}$");

/// Oldest examination year accepted
pub const MIN_YEAR: i32 = 1970;

/// Accumulates rule failures for one input
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&mut self, field: &str, ok: bool, message: impl FnOnce() -> String) -> &mut Self {
        if !ok {
            self.errors.add(field, message());
        }
        self
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(field, !value.trim().is_empty(), || "is required".to_string())
    }

    /// CSEE (form four) index number, e.g. `S0123/0001/2019`
    pub fn f4_index(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(field, index_number_regex().is_match(value.trim()), || {
            format!("{:?} is not a valid form four index number", value)
        })
    }

    /// ACSEE (form six) index number; same shape as form four
    pub fn f6_index(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(field, index_number_regex().is_match(value.trim()), || {
            format!("{:?} is not a valid form six index number", value)
        })
    }

    pub fn programme_code(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(field, programme_code_regex().is_match(value.trim()), || {
            format!("{:?} is not a valid programme code", value)
        })
    }

    pub fn phone(&mut self, field: &str, value: &str) -> &mut Self {
        let digits: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        self.check(field, phone_regex().is_match(&digits), || {
            format!("{:?} is not a valid mobile number", value)
        })
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(field, email_regex().is_match(value.trim()), || {
            format!("{:?} is not a valid email address", value)
        })
    }

    /// Six alphanumeric characters
    pub fn confirmation_code(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(field, confirmation_code_regex().is_match(value), || {
            "must be exactly 6 letters or digits".to_string()
        })
    }

    /// Between [`MIN_YEAR`] and next year
    pub fn year(&mut self, field: &str, value: i32) -> &mut Self {
        let latest = chrono::Utc::now().year() + 1;
        self.check(field, (MIN_YEAR..=latest).contains(&value), || {
            format!("{} is outside {}..={}", value, MIN_YEAR, latest)
        })
    }

    pub fn non_empty<T>(&mut self, field: &str, values: &[T]) -> &mut Self {
        self.check(field, !values.is_empty(), || "needs at least one entry".to_string())
    }

    /// Run a rule only when the value is present
    pub fn optional<F>(&mut self, value: Option<&str>, rule: F) -> &mut Self
    where
        F: FnOnce(&mut Self, &str),
    {
        if let Some(value) = value {
            rule(self, value);
        }
        self
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
