//! Typed value model of the wire protocol.
//!
//! Every decoded message is a [`Value`]: a closed tagged union covering the
//! scalar, string, container, graph-entity, temporal and path types the
//! server can emit. The graph-shaped variants are recursive (`List`, `Map`,
//! `Path`).

use std::collections::HashMap;
use std::fmt;

use bigdecimal::BigDecimal;

/// A decoded wire value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    UInt8(u8),
    UInt32(u32),
    UInt64(u64),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Arbitrary-precision decimal, carried on the wire in its canonical
    /// string form. Never a binary float.
    Decimal(BigDecimal),
    String(String),
    /// Language-tagged string literal.
    StringLang { text: String, lang: String },
    /// Datatype-tagged string literal.
    StringDatatype { text: String, datatype: String },
    Iri(String),
    /// Named graph node, identified by name.
    Node(String),
    Edge(String),
    /// Anonymous graph node.
    Anon(String),
    Date(Date),
    Time(Time),
    DateTime(DateTime),
    Path(Box<Path>),
    List(Vec<Value>),
    /// String-keyed mapping; insertion order is not significant.
    Map(HashMap<String, Value>),
}

impl Value {
    /// Borrow the inner string if this is a `String` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Widen any unsigned integer variant to u64.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt8(v) => Some(u64::from(*v)),
            Value::UInt32(v) => Some(u64::from(*v)),
            Value::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    /// Borrow the elements if this is a `List` value.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the entries if this is a `Map` value.
    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

/// Calendar date with a timezone offset in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    pub year: i64,
    pub month: i64,
    pub day: i64,
    pub tz_offset_minutes: i64,
}

/// Wall-clock time with a timezone offset in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    pub hour: i64,
    pub minute: i64,
    pub second: i64,
    pub tz_offset_minutes: i64,
}

/// Combined date and time with a timezone offset in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub year: i64,
    pub month: i64,
    pub day: i64,
    pub hour: i64,
    pub minute: i64,
    pub second: i64,
    pub tz_offset_minutes: i64,
}

/// One directed hop of a graph path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub from: Value,
    pub to: Value,
    /// Edge type of the hop.
    pub segment_type: Value,
    /// Display direction: `true` means the hop reads `(to)<-[type]-(from)`.
    pub reverse: bool,
}

/// A path through the graph.
///
/// A zero-length path has `start == end` and no segments; otherwise `start`
/// is the first segment's `from` and `end` the last segment's `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub start: Value,
    pub end: Value,
    pub segments: Vec<PathSegment>,
}

impl Path {
    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Render a timezone offset: `Z` for zero, else sign and zero-padded
/// `HH:MM` of the absolute offset.
fn fmt_tz(f: &mut fmt::Formatter<'_>, tz_offset_minutes: i64) -> fmt::Result {
    if tz_offset_minutes == 0 {
        return write!(f, "Z");
    }
    let sign = if tz_offset_minutes < 0 { '-' } else { '+' };
    let magnitude = tz_offset_minutes.unsigned_abs();
    write!(f, "{}{:02}:{:02}", sign, magnitude / 60, magnitude % 60)
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}-{:02}", self.year, self.month, self.day)?;
        fmt_tz(f, self.tz_offset_minutes)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)?;
        fmt_tz(f, self.tz_offset_minutes)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        fmt_tz(f, self.tz_offset_minutes)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "path(length={})", self.len())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::StringLang { text, lang } => write!(f, "\"{text}\"@{lang}"),
            Value::StringDatatype { text, datatype } => write!(f, "\"{text}\"^^<{datatype}>"),
            Value::Iri(v) => write!(f, "{v}"),
            Value::Node(id) | Value::Edge(id) | Value::Anon(id) => write!(f, "{id}"),
            Value::Date(v) => write!(f, "{v}"),
            Value::Time(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{v}"),
            Value::Path(v) => write!(f, "{v}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                // Keys are sorted so the rendering is deterministic.
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                write!(f, "{{")?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {}", entries[key])?;
                }
                write!(f, "}}")
            }
        }
    }
}
