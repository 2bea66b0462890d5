use std::cmp::Ordering;
use regex::Regex;
use crate::core::error::Result;
use crate::core::types::{InstrumentationScope, KeyValue, ResourceSpans, Span, TagValue, Trace};
use crate::query::ast::{Attribute, AttributeScope, Condition, Intrinsic, Operator, Query, Static};

/// One span together with the resource and scope it was emitted under
#[derive(Clone, Copy)]
pub struct SpanContext<'a> {
    pub trace: &'a Trace,
    pub resource: &'a ResourceSpans,
    pub scope: &'a InstrumentationScope,
    pub span: &'a Span,
}

impl<'a> SpanContext<'a> {
    /// Visit every span of a trace. Stops early when `f` returns true.
    pub fn for_each(trace: &'a Trace, mut f: impl FnMut(SpanContext<'a>) -> bool) -> bool {
        for resource in &trace.batches {
            for ss in &resource.scope_spans {
                for span in &ss.spans {
                    let ctx = SpanContext { trace, resource, scope: &ss.scope, span };
                    if f(ctx) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// All values the attribute resolves to on this span.
    /// An unscoped attribute looks at the span first, then the resource.
    pub fn resolve(&self, attr: &Attribute) -> Vec<Static> {
        match attr {
            Attribute::Intrinsic(i) => vec![self.intrinsic(*i)],
            Attribute::Scoped { scope: AttributeScope::None, name } => {
                let found = lookup(&self.span.attributes, name);
                if found.is_empty() {
                    lookup(&self.resource.resource, name)
                } else {
                    found
                }
            }
            Attribute::Scoped { scope, name } => self
                .attributes(*scope)
                .flat_map(|kv| kv.iter())
                .filter(|kv| kv.key == *name)
                .map(|kv| Static::from(&kv.value))
                .collect(),
        }
    }

    /// Attribute lists of one scope bucket
    pub fn attributes(&self, scope: AttributeScope) -> Box<dyn Iterator<Item = &'a [KeyValue]> + 'a> {
        let span = self.span;
        match scope {
            AttributeScope::Span => Box::new(std::iter::once(span.attributes.as_slice())),
            AttributeScope::Resource => Box::new(std::iter::once(self.resource.resource.as_slice())),
            AttributeScope::Instrumentation => Box::new(std::iter::once(self.scope.attributes.as_slice())),
            AttributeScope::Event => Box::new(span.events.iter().map(|e| e.attributes.as_slice())),
            AttributeScope::Link => Box::new(span.links.iter().map(|l| l.attributes.as_slice())),
            _ => Box::new(std::iter::empty()),
        }
    }

    fn intrinsic(&self, i: Intrinsic) -> Static {
        match i {
            Intrinsic::Name => Static::String(self.span.name.clone()),
            Intrinsic::Duration => Static::Duration(self.span.duration_nanos()),
            Intrinsic::Status => Static::Status(self.span.status),
            Intrinsic::Kind => Static::Kind(self.span.kind),
            Intrinsic::TraceId => Static::String(self.trace.trace_id.to_hex()),
            Intrinsic::SpanId => Static::String(format!("{:016x}", self.span.span_id)),
            Intrinsic::ParentId => Static::String(format!("{:016x}", self.span.parent_span_id)),
        }
    }
}

fn lookup(attrs: &[KeyValue], name: &str) -> Vec<Static> {
    attrs
        .iter()
        .filter(|kv| kv.key == name)
        .map(|kv| Static::from(&kv.value))
        .collect()
}

struct CompiledCondition {
    condition: Condition,
    regex: Option<Regex>,
}

/// Span predicate compiled from a query
pub struct SpanMatcher {
    conditions: Vec<CompiledCondition>,
}

impl SpanMatcher {
    pub fn new(query: &Query) -> Result<Self> {
        let mut conditions = Vec::with_capacity(query.conditions.len());
        for condition in &query.conditions {
            let regex = match (&condition.op, &condition.operand) {
                (Operator::Regex | Operator::NotRegex, Static::String(pattern)) => Some(Regex::new(pattern)?),
                _ => None,
            };
            conditions.push(CompiledCondition {
                condition: condition.clone(),
                regex,
            });
        }
        Ok(SpanMatcher { conditions })
    }

    pub fn match_all(&self) -> bool {
        self.conditions.is_empty()
    }

    /// All conditions must hold on the same span
    pub fn matches(&self, span: &SpanContext<'_>) -> bool {
        self.conditions.iter().all(|c| {
            span.resolve(&c.condition.attribute)
                .iter()
                .any(|v| compare(v, c.condition.op, &c.condition.operand, c.regex.as_ref()))
        })
    }

    /// Number of spans in the trace that match
    pub fn count_matches(&self, trace: &Trace) -> usize {
        let mut count = 0;
        SpanContext::for_each(trace, |span| {
            if self.matches(&span) {
                count += 1;
            }
            false
        });
        count
    }
}

fn compare(lhs: &Static, op: Operator, rhs: &Static, regex: Option<&Regex>) -> bool {
    match op {
        Operator::Regex | Operator::NotRegex => {
            let (Static::String(s), Some(re)) = (lhs, regex) else {
                return false;
            };
            re.is_match(s) == (op == Operator::Regex)
        }
        _ => {
            let Some(ord) = ordering(lhs, rhs) else {
                return false;
            };
            match op {
                Operator::Eq => ord == Ordering::Equal,
                Operator::NotEq => ord != Ordering::Equal,
                Operator::Gt => ord == Ordering::Greater,
                Operator::Gte => ord != Ordering::Less,
                Operator::Lt => ord == Ordering::Less,
                Operator::Lte => ord != Ordering::Greater,
                Operator::Regex | Operator::NotRegex => false,
            }
        }
    }
}

// None when the operand types are not comparable
fn ordering(lhs: &Static, rhs: &Static) -> Option<Ordering> {
    match (lhs, rhs) {
        (Static::String(a), Static::String(b)) => Some(a.cmp(b)),
        (Static::Int(a), Static::Int(b)) => Some(a.cmp(b)),
        (Static::Float(a), Static::Float(b)) => a.partial_cmp(b),
        (Static::Int(a), Static::Float(b)) => (*a as f64).partial_cmp(b),
        (Static::Float(a), Static::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Static::Bool(a), Static::Bool(b)) => Some(a.cmp(b)),
        (Static::Duration(a), Static::Duration(b)) => Some(a.cmp(b)),
        (Static::Status(a), Static::Status(b)) => Some(a.as_str().cmp(b.as_str())),
        (Static::Kind(a), Static::Kind(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => None,
    }
}

/// Typed values of `attr` on one span
pub fn tag_values_of(span: &SpanContext<'_>, attr: &Attribute) -> Vec<TagValue> {
    span.resolve(attr).iter().map(Static::to_tag_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{KeyValue, ScopeSpans, SpanStatus, TraceId};
    use crate::query::parser::QueryParser;

    fn trace() -> Trace {
        let mut trace = Trace::new(TraceId::from_u128(7));
        trace.batches.push(ResourceSpans {
            resource: vec![KeyValue::new("service.name", "checkout")],
            scope_spans: vec![ScopeSpans {
                scope: InstrumentationScope::default(),
                spans: vec![
                    Span {
                        span_id: 1,
                        name: "GET /cart".into(),
                        status: SpanStatus::Error,
                        start_unix_nanos: 1_000,
                        end_unix_nanos: 2_000_000_000,
                        attributes: vec![KeyValue::new("http.status", 500i64), KeyValue::new("foo", "bar")],
                        ..Span::default()
                    },
                    Span {
                        span_id: 2,
                        parent_span_id: 1,
                        name: "db".into(),
                        attributes: vec![KeyValue::new("foo", "baz")],
                        ..Span::default()
                    },
                ],
            }],
        });
        trace
    }

    fn count(q: &str) -> usize {
        let query = QueryParser::new().parse(q).unwrap();
        SpanMatcher::new(&query).unwrap().count_matches(&trace())
    }

    #[test]
    fn test_match_all() {
        assert_eq!(count("{ }"), 2);
    }

    #[test]
    fn test_conditions_bind_to_one_span() {
        assert_eq!(count(r#"{ span.foo = "bar" }"#), 1);
        assert_eq!(count(r#"{ span.foo = "baz" && status = error }"#), 0);
        assert_eq!(count(r#"{ .foo =~ "ba." }"#), 2);
        assert_eq!(count(r#"{ .foo !~ "ba." }"#), 0);
    }

    #[test]
    fn test_unscoped_falls_back_to_resource() {
        assert_eq!(count(r#"{ .service.name = "checkout" }"#), 2);
        assert_eq!(count(r#"{ span.service.name = "checkout" }"#), 0);
    }

    #[test]
    fn test_numeric_and_duration() {
        assert_eq!(count("{ span.http.status >= 500 }"), 1);
        assert_eq!(count("{ span.http.status > 500.5 }"), 0);
        assert_eq!(count("{ duration > 1s }"), 1);
        assert_eq!(count(r#"{ span.http.status = "500" }"#), 0);
    }

    #[test]
    fn test_intrinsic_tag_values() {
        let t = trace();
        let mut got = Vec::new();
        SpanContext::for_each(&t, |span| {
            got.extend(tag_values_of(&span, &Attribute::Intrinsic(Intrinsic::Status)));
            false
        });
        assert_eq!(got, vec![TagValue::new("keyword", "error"), TagValue::new("keyword", "unset")]);
    }
}
