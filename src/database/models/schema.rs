use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use std::fmt;

use crate::database::document::{lookup, Document};
use crate::query::QueryError;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[A-Za-z]{2,}$").expect("static email pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    /// RFC 3339 timestamp stored as a string
    Date,
    StringArray,
    Object,
    /// Reference to another document's `_id`
    Id,
}

impl FieldType {
    fn describe(&self) -> &'static str {
        match self {
            FieldType::String => "a string",
            FieldType::Number => "a number",
            FieldType::Boolean => "true or false",
            FieldType::Date => "a date",
            FieldType::StringArray => "a list of strings",
            FieldType::Object => "an object",
            FieldType::Id => "an identifier",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Email,
    Url,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldType,
    pub required: Option<&'static str>,
    pub max_length: Option<(usize, &'static str)>,
    pub allowed: &'static [&'static str],
    pub range: Option<(f64, f64, &'static str)>,
    pub format: Option<(Format, &'static str)>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldType) -> Self {
        Self { name, kind, required: None, max_length: None, allowed: &[], range: None, format: None }
    }

    pub const fn required(mut self, message: &'static str) -> Self {
        self.required = Some(message);
        self
    }

    pub const fn max_length(mut self, max: usize, message: &'static str) -> Self {
        self.max_length = Some((max, message));
        self
    }

    pub const fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = allowed;
        self
    }

    pub const fn range(mut self, min: f64, max: f64, message: &'static str) -> Self {
        self.range = Some((min, max, message));
        self
    }

    pub const fn format(mut self, format: Format, message: &'static str) -> Self {
        self.format = Some((format, message));
        self
    }
}

/// Field-level validation failures, in schema order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub fields: Vec<(String, String)>,
}

impl ValidationError {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { fields: vec![(field.into(), message.into())] }
    }

    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.fields.push((field.to_string(), message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.fields.iter().map(|(_, m)| m.as_str()).collect();
        write!(f, "{}", messages.join(", "))
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Every required field must be present
    Create,
    /// Only fields present in the patch are checked
    Update,
}

/// Field layout and rules for one document collection
#[derive(Debug, Clone)]
pub struct CollectionSchema {
    pub collection: &'static str,
    /// Human-readable resource name used in error messages
    pub resource: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl CollectionSchema {
    pub fn field(&self, path: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == path)
    }

    /// Unknown fields are treated as strings
    pub fn field_type(&self, path: &str) -> FieldType {
        match path {
            crate::query::ID_FIELD => FieldType::Id,
            crate::query::CREATED_AT_FIELD => FieldType::Date,
            _ => self.field(path).map(|f| f.kind).unwrap_or(FieldType::String),
        }
    }

    /// Cast one query-string value to the JSON value stored for `field`
    pub fn cast(&self, field: &str, raw: &str) -> Result<Value, QueryError> {
        let kind = self.field_type(field);
        let invalid = || QueryError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
            expected: kind.describe(),
        };

        match kind {
            FieldType::String | FieldType::StringArray | FieldType::Id => Ok(Value::String(raw.to_string())),
            FieldType::Number => parse_number(raw.trim()).ok_or_else(invalid),
            FieldType::Boolean => match raw.trim() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            FieldType::Date => parse_date(raw.trim()).map(Value::String).ok_or_else(invalid),
            FieldType::Object => Err(invalid()),
        }
    }

    pub fn validate(&self, doc: &Document, mode: ValidationMode) -> Result<(), ValidationError> {
        let mut errors = ValidationError::default();

        for spec in &self.fields {
            let value = lookup(doc, spec.name);
            let missing = match value {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(Value::Array(a)) => a.is_empty(),
                _ => false,
            };

            if missing {
                let checked = mode == ValidationMode::Create || value.is_some();
                if let (true, Some(message)) = (checked, spec.required) {
                    errors.push(spec.name, message);
                }
                continue;
            }

            if let Some(value) = value {
                check_field(spec, value, &mut errors);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn check_field(spec: &FieldSpec, value: &Value, errors: &mut ValidationError) {
    let type_error = || format!("{} must be {}", spec.name, spec.kind.describe());

    match spec.kind {
        FieldType::String | FieldType::Id => {
            let Some(s) = value.as_str() else {
                errors.push(spec.name, type_error());
                return;
            };
            if let Some((max, message)) = spec.max_length {
                if s.chars().count() > max {
                    errors.push(spec.name, message);
                }
            }
            if !spec.allowed.is_empty() && !spec.allowed.contains(&s) {
                errors.push(spec.name, format!("`{}` is not a valid value for {}", s, spec.name));
            }
            if let Some((format, message)) = spec.format {
                let ok = match format {
                    Format::Email => EMAIL_RE.is_match(s),
                    Format::Url => url::Url::parse(s)
                        .map(|u| matches!(u.scheme(), "http" | "https"))
                        .unwrap_or(false),
                };
                if !ok {
                    errors.push(spec.name, message);
                }
            }
        }
        FieldType::Number => {
            let Some(n) = value.as_f64() else {
                errors.push(spec.name, type_error());
                return;
            };
            if let Some((min, max, message)) = spec.range {
                if n < min || n > max {
                    errors.push(spec.name, message);
                }
            }
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                errors.push(spec.name, type_error());
            }
        }
        FieldType::Date => {
            if !value.as_str().map(|s| parse_date(s).is_some()).unwrap_or(false) {
                errors.push(spec.name, type_error());
            }
        }
        FieldType::StringArray => {
            let Some(items) = value.as_array() else {
                errors.push(spec.name, type_error());
                return;
            };
            for item in items {
                match item.as_str() {
                    Some(s) if spec.allowed.is_empty() || spec.allowed.contains(&s) => {}
                    Some(s) => errors.push(spec.name, format!("`{}` is not a valid value for {}", s, spec.name)),
                    None => {
                        errors.push(spec.name, type_error());
                        break;
                    }
                }
            }
        }
        FieldType::Object => {
            if !value.is_object() {
                errors.push(spec.name, type_error());
            }
        }
    }
}

/// Integral values become JSON integers so they compare equal to stored integers
pub fn parse_number(raw: &str) -> Option<Value> {
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    let f = raw.parse::<f64>().ok().filter(|f| f.is_finite())?;
    Number::from_f64(f).map(Value::Number)
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC)
pub fn parse_date(raw: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(format_timestamp(dt.with_timezone(&Utc)));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let dt = date.and_hms_opt(0, 0, 0)?.and_utc();
    Some(format_timestamp(dt))
}

/// Fixed-width timestamps keep lexical and chronological order identical
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
