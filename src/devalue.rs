//! Decoder for the flattened structured-value format the tRPC backend uses
//! to ship values JSON cannot express natively (dates, `undefined`, maps).
//!
//! The payload is a JSON array. Element 0 is the root value, and containers
//! refer to their children by index into the same array:
//!
//! ```text
//! [{"id":1,"createdAt":2},"123",["Date","2024-05-01T10:00:00.000Z"]]
//! ```
//!
//! Arrays whose first element is a string are tagged values such as
//! `["Date", iso]`. Negative indices are sentinels for values with no JSON
//! spelling.

use chrono::{DateTime, SecondsFormat};
use serde_json::{Map, Number, Value};
use thiserror::Error;

const UNDEFINED: i64 = -1;
const HOLE: i64 = -2;
const NAN: i64 = -3;
const POSITIVE_INFINITY: i64 = -4;
const NEGATIVE_INFINITY: i64 = -5;
const NEGATIVE_ZERO: i64 = -6;

/// Deepest chain of references followed before giving up.
const MAX_DEPTH: usize = 256;
/// Shared indices are copied on every reference; cap the total expansion
/// relative to the input length.
const MAX_EXPANSION: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{0}")]
    Json(String),

    #[error("Invalid input")]
    InvalidInput,

    #[error("Invalid index {0}")]
    InvalidIndex(String),

    #[error("Unknown type {0}")]
    UnknownType(String),

    #[error("Malformed {0} value")]
    MalformedTag(String),

    #[error("Cyclic reference at index {0}")]
    Cyclic(usize),

    #[error("Nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("Expands to more than {0} values")]
    TooLarge(usize),
}

/// A decoded value. Keeps the non-JSON kinds apart until the caller asks
/// for plain JSON with [`Structured::into_json`].
#[derive(Debug, Clone, PartialEq)]
pub enum Structured {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(String),
    String(String),
    Date(String),
    RegExp { source: String, flags: String },
    Array(Vec<Structured>),
    Set(Vec<Structured>),
    Map(Vec<(Structured, Structured)>),
    Object(Vec<(String, Structured)>),
}

/// Decode a flattened payload string.
pub fn parse(input: &str) -> Result<Structured, DecodeError> {
    let parsed: Value =
        serde_json::from_str(input).map_err(|e| DecodeError::Json(e.to_string()))?;
    match parsed {
        Value::Number(n) => {
            let index = n
                .as_i64()
                .ok_or_else(|| DecodeError::InvalidIndex(n.to_string()))?;
            sentinel(index).ok_or(DecodeError::InvalidInput)
        }
        Value::Array(values) if !values.is_empty() => {
            let mut decoder = Decoder {
                visiting: vec![false; values.len()],
                depth: 0,
                remaining: values.len().saturating_mul(MAX_EXPANSION),
                values: &values,
            };
            decoder.hydrate(0)
        }
        _ => Err(DecodeError::InvalidInput),
    }
}

fn sentinel(index: i64) -> Option<Structured> {
    match index {
        UNDEFINED | HOLE => Some(Structured::Undefined),
        NAN => Some(Structured::Number(f64::NAN)),
        POSITIVE_INFINITY => Some(Structured::Number(f64::INFINITY)),
        NEGATIVE_INFINITY => Some(Structured::Number(f64::NEG_INFINITY)),
        NEGATIVE_ZERO => Some(Structured::Number(-0.0)),
        _ => None,
    }
}

struct Decoder<'a> {
    values: &'a [Value],
    visiting: Vec<bool>,
    depth: usize,
    remaining: usize,
}

impl Decoder<'_> {
    fn hydrate_ref(&mut self, reference: &Value) -> Result<Structured, DecodeError> {
        let index = reference
            .as_i64()
            .ok_or_else(|| DecodeError::InvalidIndex(reference.to_string()))?;
        if index < 0 {
            return sentinel(index).ok_or_else(|| DecodeError::InvalidIndex(index.to_string()));
        }
        let index = usize::try_from(index)
            .ok()
            .filter(|i| *i < self.values.len())
            .ok_or_else(|| DecodeError::InvalidIndex(index.to_string()))?;
        self.hydrate(index)
    }

    fn hydrate(&mut self, index: usize) -> Result<Structured, DecodeError> {
        if self.visiting[index] {
            return Err(DecodeError::Cyclic(index));
        }
        if self.depth >= MAX_DEPTH {
            return Err(DecodeError::TooDeep(MAX_DEPTH));
        }
        self.remaining = self
            .remaining
            .checked_sub(1)
            .ok_or(DecodeError::TooLarge(self.values.len().saturating_mul(MAX_EXPANSION)))?;

        self.visiting[index] = true;
        self.depth += 1;
        let values = self.values;
        let decoded = self.hydrate_value(&values[index]);
        self.depth -= 1;
        self.visiting[index] = false;
        decoded
    }

    fn hydrate_value(&mut self, value: &Value) -> Result<Structured, DecodeError> {
        match value {
            Value::Null => Ok(Structured::Null),
            Value::Bool(b) => Ok(Structured::Bool(*b)),
            Value::Number(n) => Ok(Structured::Number(n.as_f64().unwrap_or(f64::NAN))),
            Value::String(s) => Ok(Structured::String(s.clone())),
            Value::Array(items) => match items.first() {
                Some(Value::String(tag)) => self.hydrate_tagged(tag, &items[1..]),
                _ => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(self.hydrate_ref(item)?);
                    }
                    Ok(Structured::Array(out))
                }
            },
            Value::Object(fields) => {
                let mut out = Vec::with_capacity(fields.len());
                for (key, reference) in fields {
                    out.push((key.clone(), self.hydrate_ref(reference)?));
                }
                Ok(Structured::Object(out))
            }
        }
    }

    fn hydrate_tagged(&mut self, tag: &str, args: &[Value]) -> Result<Structured, DecodeError> {
        let malformed = || DecodeError::MalformedTag(tag.to_string());
        match tag {
            "Date" => match args.first() {
                Some(Value::String(raw)) => Ok(Structured::Date(raw.clone())),
                _ => Err(malformed()),
            },
            "Set" => {
                let mut out = Vec::with_capacity(args.len());
                for reference in args {
                    out.push(self.hydrate_ref(reference)?);
                }
                Ok(Structured::Set(out))
            }
            "Map" => {
                if args.len() % 2 != 0 {
                    return Err(malformed());
                }
                let mut out = Vec::with_capacity(args.len() / 2);
                for pair in args.chunks(2) {
                    out.push((self.hydrate_ref(&pair[0])?, self.hydrate_ref(&pair[1])?));
                }
                Ok(Structured::Map(out))
            }
            "null" => {
                if args.len() % 2 != 0 {
                    return Err(malformed());
                }
                let mut out = Vec::with_capacity(args.len() / 2);
                for pair in args.chunks(2) {
                    let key = pair[0].as_str().ok_or_else(malformed)?.to_string();
                    out.push((key, self.hydrate_ref(&pair[1])?));
                }
                Ok(Structured::Object(out))
            }
            "RegExp" => {
                let source = args.first().and_then(Value::as_str).ok_or_else(malformed)?;
                let flags = args.get(1).and_then(Value::as_str).unwrap_or_default();
                Ok(Structured::RegExp {
                    source: source.to_string(),
                    flags: flags.to_string(),
                })
            }
            "BigInt" => match args.first() {
                Some(Value::String(digits)) => Ok(Structured::BigInt(digits.clone())),
                Some(Value::Number(n)) => Ok(Structured::BigInt(n.to_string())),
                _ => Err(malformed()),
            },
            "Object" => {
                let boxed = args.first().ok_or_else(malformed)?;
                self.hydrate_value(boxed)
            }
            other => Err(DecodeError::UnknownType(other.to_string())),
        }
    }
}

/// Normalize an ISO timestamp to millisecond UTC form when it parses, else
/// return it untouched.
pub fn normalize_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| {
            dt.with_timezone(&chrono::Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        })
        .unwrap_or_else(|_| raw.to_string())
}

fn number_to_json(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn map_key(key: Structured) -> String {
    match key {
        Structured::String(s) => s,
        other => other.into_json().to_string(),
    }
}

impl Structured {
    /// Lower to plain JSON. Dates become ISO strings, sets become arrays,
    /// maps become objects and `undefined` object fields are dropped.
    pub fn into_json(self) -> Value {
        match self {
            Structured::Undefined | Structured::Null => Value::Null,
            Structured::Bool(b) => Value::Bool(b),
            Structured::Number(n) => number_to_json(n),
            Structured::BigInt(digits) => Value::String(digits),
            Structured::String(s) => Value::String(s),
            Structured::Date(raw) => Value::String(normalize_timestamp(&raw)),
            Structured::RegExp { source, flags } => Value::String(format!("/{source}/{flags}")),
            Structured::Array(items) | Structured::Set(items) => {
                Value::Array(items.into_iter().map(Structured::into_json).collect())
            }
            Structured::Map(entries) => Value::Object(
                entries
                    .into_iter()
                    .filter(|(_, v)| *v != Structured::Undefined)
                    .map(|(k, v)| (map_key(k), v.into_json()))
                    .collect::<Map<String, Value>>(),
            ),
            Structured::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .filter(|(_, v)| *v != Structured::Undefined)
                    .map(|(k, v)| (k, v.into_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

/// Encode a value into the flattened format that [`parse`] reads.
pub fn stringify(value: &Structured) -> String {
    let mut encoder = Encoder { values: Vec::new() };
    match encoder.flatten(value) {
        index if index < 0 => index.to_string(),
        _ => Value::Array(encoder.values).to_string(),
    }
}

struct Encoder {
    values: Vec<Value>,
}

impl Encoder {
    fn flatten(&mut self, value: &Structured) -> i64 {
        match value {
            Structured::Undefined => return UNDEFINED,
            Structured::Number(n) if n.is_nan() => return NAN,
            Structured::Number(n) if *n == f64::INFINITY => return POSITIVE_INFINITY,
            Structured::Number(n) if *n == f64::NEG_INFINITY => return NEGATIVE_INFINITY,
            Structured::Number(n) if *n == 0.0 && n.is_sign_negative() => return NEGATIVE_ZERO,
            _ => {}
        }

        let index = self.values.len();
        self.values.push(Value::Null);
        let encoded = match value {
            Structured::Null => Value::Null,
            Structured::Bool(b) => Value::Bool(*b),
            Structured::Number(n) => number_to_json(*n),
            Structured::String(s) => Value::String(s.clone()),
            Structured::BigInt(digits) => tagged("BigInt", vec![Value::String(digits.clone())]),
            Structured::Date(raw) => tagged("Date", vec![Value::String(raw.clone())]),
            Structured::RegExp { source, flags } => tagged(
                "RegExp",
                vec![Value::String(source.clone()), Value::String(flags.clone())],
            ),
            Structured::Array(items) => {
                Value::Array(items.iter().map(|item| self.reference(item)).collect())
            }
            Structured::Set(items) => {
                let refs = items.iter().map(|item| self.reference(item)).collect();
                tagged("Set", refs)
            }
            Structured::Map(entries) => {
                let mut refs = Vec::with_capacity(entries.len() * 2);
                for (k, v) in entries {
                    refs.push(self.reference(k));
                    refs.push(self.reference(v));
                }
                tagged("Map", refs)
            }
            Structured::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), self.reference(v)))
                    .collect(),
            ),
            Structured::Undefined => Value::Null,
        };
        self.values[index] = encoded;
        index as i64
    }

    fn reference(&mut self, value: &Structured) -> Value {
        Value::Number(Number::from(self.flatten(value)))
    }
}

fn tagged(tag: &str, mut args: Vec<Value>) -> Value {
    args.insert(0, Value::String(tag.to_string()));
    Value::Array(args)
}
