use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single row: column name to scalar value.
///
/// The shape is determined entirely by the queried resource. Uses
/// `BTreeMap` for deterministic serialization order.
pub type Row = BTreeMap<String, Value>;

/// Scalar cell value carried in a [`Row`].
///
/// Serializes as plain JSON (untagged), so a row round-trips as an ordinary
/// JSON object such as `{"city": "Oslo", "floor_area": 1200.5}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL `NULL` / JSON `null`.
    Null,
    /// Boolean flag (stored as `TINYINT` in the row store).
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit IEEE 754 float.
    Float(f64),
    /// UTF-8 text.
    String(String),
}

impl Value {
    /// Renders the value as text for search concatenation.
    ///
    /// `Null` renders as the empty string, the same way `CONCAT_WS` skips
    /// `NULL` arguments. Booleans render as `1`/`0`.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Null => Cow::Borrowed(""),
            Self::Bool(true) => Cow::Borrowed("1"),
            Self::Bool(false) => Cow::Borrowed("0"),
            Self::Int(i) => Cow::Owned(i.to_string()),
            Self::Float(f) => Cow::Owned(f.to_string()),
            Self::String(s) => Cow::Borrowed(s),
        }
    }

    /// Returns the numeric view of the value, if it has one.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Null | Self::String(_) => None,
        }
    }

    /// Whether the value is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value identifies the row addressed by a path `id`.
    ///
    /// Integer keys match their decimal rendering; text keys match exactly.
    #[must_use]
    pub fn matches_key(&self, id: &str) -> bool {
        match self {
            Self::Int(i) => id.trim().parse::<i64>().is_ok_and(|parsed| parsed == *i),
            Self::String(s) => s == id,
            Self::Null | Self::Bool(_) | Self::Float(_) => false,
        }
    }

    /// Total order used when sorting rows by a column.
    ///
    /// `Null` sorts first, then numbers (booleans count as 0/1, integers and
    /// floats compare numerically), then strings. Strings compare
    /// case-insensitively first and byte-wise only to break ties.
    #[must_use]
    pub fn cmp_for_sort(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => self.sort_rank().cmp(&other.sort_rank()),
            },
        }
    }

    fn sort_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) | Self::Int(_) | Self::Float(_) => 1,
            Self::String(_) => 2,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
