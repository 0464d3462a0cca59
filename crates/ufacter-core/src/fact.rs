//! Fact record and fact values
//!
//! A [`Fact`] is one named piece of host information. Its path is a list of
//! segments (`["memory", "system", "used_bytes"]`) that the namespace turns
//! into nested mappings. A fact with an empty path is the sentinel a reporter
//! uses to say it is done.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Path prefix for diagnostics reported by failing reporters
pub const ERRORS_PREFIX: [&str; 2] = ["ufacter", "errors"];

/// Path prefix for per-reporter timing facts
pub const STATS_PREFIX: [&str; 2] = ["ufacter", "stats"];

// ============================================================================
// Fact values
// ============================================================================

/// Value carried by a fact
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FactValue {
    /// Boolean flag (`is_virtual`)
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer (byte counts, MTU)
    UInt(u64),
    /// Floating point number
    Float(f64),
    /// Text
    String(String),
    /// Ordered sequence
    List(Vec<FactValue>),
    /// String-keyed mapping, sorted by key
    Map(BTreeMap<String, FactValue>),
}

impl FactValue {
    /// Whether the value carries nothing worth reporting
    ///
    /// Empty strings, sequences and mappings are empty. Numeric zero and
    /// `false` are real answers and are not.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            FactValue::String(s) => s.is_empty(),
            FactValue::List(items) => items.is_empty(),
            FactValue::Map(entries) => entries.is_empty(),
            FactValue::Bool(_) | FactValue::Int(_) | FactValue::UInt(_) | FactValue::Float(_) => {
                false
            }
        }
    }

    /// Name of the value kind, used in log output
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            FactValue::Bool(_) => "bool",
            FactValue::Int(_) => "int",
            FactValue::UInt(_) => "uint",
            FactValue::Float(_) => "float",
            FactValue::String(_) => "string",
            FactValue::List(_) => "list",
            FactValue::Map(_) => "map",
        }
    }
}

impl fmt::Display for FactValue {
    /// Scalars print bare, sequences and mappings print as compact JSON
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactValue::Bool(b) => write!(f, "{b}"),
            FactValue::Int(n) => write!(f, "{n}"),
            FactValue::UInt(n) => write!(f, "{n}"),
            FactValue::Float(n) => write!(f, "{n}"),
            FactValue::String(s) => f.write_str(s),
            FactValue::List(_) | FactValue::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<bool> for FactValue {
    fn from(value: bool) -> Self {
        FactValue::Bool(value)
    }
}

impl From<i32> for FactValue {
    fn from(value: i32) -> Self {
        FactValue::Int(i64::from(value))
    }
}

impl From<i64> for FactValue {
    fn from(value: i64) -> Self {
        FactValue::Int(value)
    }
}

impl From<u32> for FactValue {
    fn from(value: u32) -> Self {
        FactValue::UInt(u64::from(value))
    }
}

impl From<u64> for FactValue {
    fn from(value: u64) -> Self {
        FactValue::UInt(value)
    }
}

impl From<usize> for FactValue {
    fn from(value: usize) -> Self {
        FactValue::UInt(value as u64)
    }
}

impl From<f64> for FactValue {
    fn from(value: f64) -> Self {
        FactValue::Float(value)
    }
}

impl From<String> for FactValue {
    fn from(value: String) -> Self {
        FactValue::String(value)
    }
}

impl From<&str> for FactValue {
    fn from(value: &str) -> Self {
        FactValue::String(value.to_string())
    }
}

impl<T: Into<FactValue>> From<Vec<T>> for FactValue {
    fn from(values: Vec<T>) -> Self {
        FactValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FactValue>> From<BTreeMap<String, T>> for FactValue {
    fn from(entries: BTreeMap<String, T>) -> Self {
        FactValue::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

// ============================================================================
// Fact
// ============================================================================

/// One reported fact
///
/// Built stable and native by [`Fact::new`]; use [`Fact::volatile`] and
/// [`Fact::extended`] to change the flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    /// Structured name, empty only for the sentinel
    path: Vec<String>,
    /// Reported value, absent only for the sentinel
    value: Option<FactValue>,
    /// Changes between invocations (free memory, uptime)
    volatile: bool,
    /// Also reported by the legacy facter tool
    native: bool,
}

impl Fact {
    /// Create a stable native fact
    pub fn new<I, S>(path: I, value: impl Into<FactValue>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            value: Some(value.into()),
            volatile: false,
            native: true,
        }
    }

    /// Create the end-of-stream marker for one reporter
    #[must_use]
    pub fn sentinel() -> Self {
        Self {
            path: Vec::new(),
            value: None,
            volatile: false,
            native: true,
        }
    }

    /// Mark the fact as volatile
    #[must_use]
    pub fn volatile(mut self) -> Self {
        self.volatile = true;
        self
    }

    /// Mark the fact as extension-only (not reported by legacy facter)
    #[must_use]
    pub fn extended(mut self) -> Self {
        self.native = false;
        self
    }

    /// Whether this is a reporter's completion marker
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.path.is_empty()
    }

    /// Path segments
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Reported value
    #[must_use]
    pub fn value(&self) -> Option<&FactValue> {
        self.value.as_ref()
    }

    #[must_use]
    pub fn is_volatile(&self) -> bool {
        self.volatile
    }

    #[must_use]
    pub fn is_native(&self) -> bool {
        self.native
    }

    /// Whether the fact has no value worth reporting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.as_ref().is_none_or(FactValue::is_empty)
    }

    /// Path joined with dots, e.g. `memory.system.used_bytes`
    #[must_use]
    pub fn dotted(&self) -> String {
        self.path.join(".")
    }

    /// Split into path and value, consuming the fact
    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, Option<FactValue>) {
        (self.path, self.value)
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sentinel() {
            return f.write_str("<end of facts>");
        }
        match &self.value {
            Some(value) => write!(f, "{} = {value}", self.dotted()),
            None => write!(f, "{} = <none>", self.dotted()),
        }
    }
}
