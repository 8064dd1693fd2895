use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::ValidationError;

/// Primary key of the color table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Formats the triple as `#rrggbb`
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R:{}, G:{}, B:{}", self.r, self.g, self.b)
    }
}

/// One entry of the lookup table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorRecord {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub name: String,
}

impl ColorRecord {
    /// Creates a record from already-bounded components. The name is trimmed.
    pub fn new(r: u8, g: u8, b: u8, name: impl Into<String>) -> Self {
        Self {
            r,
            g,
            b,
            name: name.into().trim().to_string(),
        }
    }

    /// Parses textual components, as typed by a user or read from a CSV cell.
    pub fn parse(r: &str, g: &str, b: &str, name: &str) -> Result<Self, ValidationError> {
        let r = parse_component("r", r)?;
        let g = parse_component("g", g)?;
        let b = parse_component("b", b)?;
        let record = Self::new(r, g, b, name);
        record.validate()?;
        Ok(record)
    }

    /// Parses one delimited-text row. Fields past the fourth are ignored.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self, ValidationError> {
        if fields.len() < 4 {
            return Err(ValidationError::TooFewFields { found: fields.len() });
        }
        Self::parse(
            fields[0].as_ref(),
            fields[1].as_ref(),
            fields[2].as_ref(),
            fields[3].as_ref(),
        )
    }

    /// Parses one element of a structured list.
    ///
    /// Accepted keys are `r|red`, `g|green`, `b|blue` and `name`. Components may
    /// be JSON integers or strings holding integers. A missing name is treated
    /// as empty and rejected.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let object = value.as_object().ok_or(ValidationError::NotAnObject)?;

        let component = |channel: &'static str, alias: &str| -> Result<u8, ValidationError> {
            let raw = object
                .get(channel)
                .or_else(|| object.get(alias))
                .ok_or(ValidationError::MissingKey { key: channel })?;
            match raw {
                Value::Number(n) => match n.as_i64() {
                    Some(v) => check_range(channel, v),
                    None => Err(ValidationError::NotAnInteger {
                        channel,
                        value: n.to_string(),
                    }),
                },
                Value::String(s) => parse_component(channel, s),
                other => Err(ValidationError::NotAnInteger {
                    channel,
                    value: other.to_string(),
                }),
            }
        };

        let r = component("r", "red")?;
        let g = component("g", "green")?;
        let b = component("b", "blue")?;
        let name = object.get("name").and_then(Value::as_str).unwrap_or_default();

        let record = Self::new(r, g, b, name);
        record.validate()?;
        Ok(record)
    }

    /// Checks the invariants that the type system does not already enforce
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }

    pub fn rgb(&self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }
}

impl fmt::Display for ColorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.rgb())
    }
}

fn parse_component(channel: &'static str, raw: &str) -> Result<u8, ValidationError> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::NotAnInteger {
            channel,
            value: raw.to_string(),
        })?;
    check_range(channel, value)
}

fn check_range(channel: &'static str, value: i64) -> Result<u8, ValidationError> {
    u8::try_from(value).map_err(|_| ValidationError::OutOfRange { channel, value })
}
