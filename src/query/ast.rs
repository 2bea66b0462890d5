use std::fmt;
use serde::{Serialize, Deserialize};
use crate::core::types::{AttrValue, SpanKind, SpanStatus, TagValue};

/// Scope bucket an attribute lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeScope {
    None,            // unscoped, or "all scopes" for tag searches
    Span,
    Resource,
    Event,
    Link,
    Instrumentation,
    Intrinsic,
    Unknown,
}

impl AttributeScope {
    /// Buckets tag searches enumerate; intrinsics are synthesized elsewhere.
    pub const BUCKETS: [AttributeScope; 5] = [
        AttributeScope::Span,
        AttributeScope::Resource,
        AttributeScope::Event,
        AttributeScope::Link,
        AttributeScope::Instrumentation,
    ];

    pub fn parse(s: &str) -> Self {
        match s {
            "" | "none" => AttributeScope::None,
            "span" => AttributeScope::Span,
            "resource" => AttributeScope::Resource,
            "event" => AttributeScope::Event,
            "link" => AttributeScope::Link,
            "instrumentation" => AttributeScope::Instrumentation,
            "intrinsic" => AttributeScope::Intrinsic,
            _ => AttributeScope::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeScope::None => "none",
            AttributeScope::Span => "span",
            AttributeScope::Resource => "resource",
            AttributeScope::Event => "event",
            AttributeScope::Link => "link",
            AttributeScope::Instrumentation => "instrumentation",
            AttributeScope::Intrinsic => "intrinsic",
            AttributeScope::Unknown => "unknown",
        }
    }

    /// True if a tag search over `self` should report names from `bucket`
    pub fn covers(&self, bucket: AttributeScope) -> bool {
        *self == AttributeScope::None || *self == bucket
    }
}

impl fmt::Display for AttributeScope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intrinsic {
    Name,
    Duration,
    Status,
    Kind,
    TraceId,
    SpanId,
    ParentId,
}

impl Intrinsic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intrinsic::Name => "name",
            Intrinsic::Duration => "duration",
            Intrinsic::Status => "status",
            Intrinsic::Kind => "kind",
            Intrinsic::TraceId => "trace:id",
            Intrinsic::SpanId => "span:id",
            Intrinsic::ParentId => "span:parentID",
        }
    }

    /// Identifiers whose values are never enumerated by tag-value searches
    pub fn is_id(&self) -> bool {
        matches!(self, Intrinsic::TraceId | Intrinsic::SpanId | Intrinsic::ParentId)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Scoped { scope: AttributeScope, name: String },
    Intrinsic(Intrinsic),
}

impl Attribute {
    pub fn scoped(scope: AttributeScope, name: impl Into<String>) -> Self {
        Attribute::Scoped { scope, name: name.into() }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Attribute::Scoped { scope: AttributeScope::None, name } => write!(f, ".{}", name),
            Attribute::Scoped { scope, name } => write!(f, "{}.{}", scope, name),
            Attribute::Intrinsic(i) => f.write_str(i.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Regex,
    NotRegex,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Regex => "=~",
            Operator::NotRegex => "!~",
        }
    }
}

/// Literal on the right-hand side of a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Static {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Duration(u64), // nanoseconds
    Status(SpanStatus),
    Kind(SpanKind),
}

const NANOS_PER_UNIT: [(u64, &str); 6] = [
    (3_600_000_000_000, "h"),
    (60_000_000_000, "m"),
    (1_000_000_000, "s"),
    (1_000_000, "ms"),
    (1_000, "us"),
    (1, "ns"),
];

impl fmt::Display for Static {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Static::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                f.write_str("\"")
            }
            Static::Int(i) => write!(f, "{}", i),
            Static::Float(v) => write!(f, "{:?}", v),
            Static::Bool(b) => write!(f, "{}", b),
            Static::Duration(nanos) => {
                if *nanos == 0 {
                    return f.write_str("0s");
                }
                // largest unit that divides evenly
                for (unit, suffix) in NANOS_PER_UNIT {
                    if nanos % unit == 0 {
                        return write!(f, "{}{}", nanos / unit, suffix);
                    }
                }
                write!(f, "{}ns", nanos)
            }
            Static::Status(s) => f.write_str(s.as_str()),
            Static::Kind(k) => f.write_str(k.as_str()),
        }
    }
}

impl Static {
    /// Typed value as reported by tag-value searches
    pub fn to_tag_value(&self) -> TagValue {
        match self {
            Static::String(s) => TagValue::new("string", s.clone()),
            Static::Int(i) => TagValue::new("int", i.to_string()),
            Static::Float(v) => TagValue::new("float", v.to_string()),
            Static::Bool(b) => TagValue::new("bool", b.to_string()),
            Static::Duration(_) => TagValue::new("duration", self.to_string()),
            Static::Status(s) => TagValue::new("keyword", s.as_str()),
            Static::Kind(k) => TagValue::new("keyword", k.as_str()),
        }
    }
}

impl From<&AttrValue> for Static {
    fn from(v: &AttrValue) -> Self {
        match v {
            AttrValue::String(s) => Static::String(s.clone()),
            AttrValue::Int(i) => Static::Int(*i),
            AttrValue::Float(f) => Static::Float(*f),
            AttrValue::Bool(b) => Static::Bool(*b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: Attribute,
    pub op: Operator,
    pub operand: Static,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.attribute, self.op.as_str(), self.operand)
    }
}

pub const HINT_MOST_RECENT: &str = "most_recent";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hints {
    pub entries: Vec<(String, Static)>,
}

impl Hints {
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| matches!(v, Static::Bool(true)))
            .unwrap_or(default)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A span filter: every condition must hold for the same span
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub conditions: Vec<Condition>,
    pub hints: Hints,
}

impl Query {
    pub fn match_all() -> Self {
        Query::default()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn most_recent(&self) -> bool {
        self.hints.get_bool(HINT_MOST_RECENT, false)
    }
}

/// Canonical form, used for cache keys
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.conditions.is_empty() {
            f.write_str("{ }")?;
        } else {
            f.write_str("{ ")?;
            for (i, cond) in self.conditions.iter().enumerate() {
                if i > 0 {
                    f.write_str(" && ")?;
                }
                write!(f, "{}", cond)?;
            }
            f.write_str(" }")?;
        }

        if !self.hints.is_empty() {
            f.write_str(" with (")?;
            for (i, (k, v)) in self.hints.entries.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}={}", k, v)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}
