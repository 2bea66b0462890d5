use std::fmt;
use std::fmt::Write as _;
use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TraceId(pub [u8; 16]);

impl TraceId {
    pub fn new(bytes: [u8; 16]) -> Self {
        TraceId(bytes)
    }

    pub fn from_u128(id: u128) -> Self {
        TraceId(id.to_be_bytes())
    }

    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(32);
        for b in &self.0 {
            let _ = write!(out, "{:02x}", b);
        }
        out
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl AttrValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::String(_) => "string",
            AttrValue::Int(_) => "int",
            AttrValue::Float(_) => "float",
            AttrValue::Bool(_) => "bool",
        }
    }

    pub fn to_tag_value(&self) -> TagValue {
        TagValue::new(self.type_name(), self.to_string())
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttrValue::String(s) => f.write_str(s),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::String(s)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: AttrValue,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpanKind {
    #[default]
    Unspecified,
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Unspecified => "unspecified",
            SpanKind::Internal => "internal",
            SpanKind::Server => "server",
            SpanKind::Client => "client",
            SpanKind::Producer => "producer",
            SpanKind::Consumer => "consumer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error,
}

impl SpanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanStatus::Unset => "unset",
            SpanStatus::Ok => "ok",
            SpanStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub time_unix_nanos: u64,
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub trace_id: TraceId,
    pub span_id: u64,
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Span {
    pub span_id: u64,
    pub parent_span_id: u64, // 0 for the root span
    pub name: String,
    pub kind: SpanKind,
    pub status: SpanStatus,
    pub start_unix_nanos: u64,
    pub end_unix_nanos: u64,
    pub attributes: Vec<KeyValue>,
    pub events: Vec<Event>,
    pub links: Vec<Link>,
}

impl Span {
    pub fn duration_nanos(&self) -> u64 {
        self.end_unix_nanos.saturating_sub(self.start_unix_nanos)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstrumentationScope {
    pub name: String,
    pub version: String,
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScopeSpans {
    pub scope: InstrumentationScope,
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceSpans {
    pub resource: Vec<KeyValue>,
    pub scope_spans: Vec<ScopeSpans>,
}

/// One trace as pushed by the ingest path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub trace_id: TraceId,
    pub batches: Vec<ResourceSpans>,
}

impl Trace {
    pub fn new(trace_id: TraceId) -> Self {
        Trace {
            trace_id,
            batches: Vec::new(),
        }
    }

    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.batches
            .iter()
            .flat_map(|b| b.scope_spans.iter())
            .flat_map(|ss| ss.spans.iter())
    }

    pub fn span_count(&self) -> usize {
        self.spans().count()
    }

    pub fn start_unix_nanos(&self) -> u64 {
        self.spans().map(|s| s.start_unix_nanos).min().unwrap_or(0)
    }

    pub fn end_unix_nanos(&self) -> u64 {
        self.spans().map(|s| s.end_unix_nanos).max().unwrap_or(0)
    }

    /// Root span and the resource it was emitted under
    pub fn root(&self) -> Option<(&ResourceSpans, &Span)> {
        for batch in &self.batches {
            for ss in &batch.scope_spans {
                if let Some(span) = ss.spans.iter().find(|s| s.parent_span_id == 0) {
                    return Some((batch, span));
                }
            }
        }
        None
    }

    pub fn root_service_name(&self) -> String {
        self.root()
            .and_then(|(batch, _)| {
                batch.resource.iter().find(|kv| kv.key == "service.name")
            })
            .map(|kv| kv.value.to_string())
            .unwrap_or_default()
    }

    pub fn root_span_name(&self) -> String {
        self.root().map(|(_, span)| span.name.clone()).unwrap_or_default()
    }
}

/// A typed distinct tag value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagValue {
    pub value_type: String,
    pub value: String,
}

impl TagValue {
    pub fn new(value_type: impl Into<String>, value: impl Into<String>) -> Self {
        TagValue {
            value_type: value_type.into(),
            value: value.into(),
        }
    }

    /// Weight charged against the byte budget of a tag-value query
    pub fn size(&self) -> usize {
        self.value_type.len() + self.value.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub start: u32, // unix seconds, 0 = open
    pub end: u32,   // unix seconds, 0 = open
    pub limit: u32,
    pub spans_per_span_set: u32,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        SearchRequest {
            query: query.into(),
            ..SearchRequest::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_range(mut self, start: u32, end: u32) -> Self {
        self.start = start;
        self.end = end;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSearchMetadata {
    pub trace_id: String,
    pub root_service_name: String,
    pub root_trace_name: String,
    pub start_time_unix_nano: u64,
    pub duration_ms: u32,
    pub matched_spans: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMetrics {
    pub inspected_traces: u32,
    pub inspected_bytes: u64,
}

impl SearchMetrics {
    pub fn add(&mut self, other: &SearchMetrics) {
        self.inspected_traces += other.inspected_traces;
        self.inspected_bytes += other.inspected_bytes;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataMetrics {
    pub inspected_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub traces: Vec<TraceSearchMetadata>,
    pub metrics: SearchMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchTagsRequest {
    pub scope: String,
    pub query: String,
    pub max_tags_per_scope: u32,
    pub stale_values_threshold: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchTagsResponse {
    pub tag_names: Vec<String>,
    pub metrics: MetadataMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchTagsV2Scope {
    pub name: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchTagsV2Response {
    pub scopes: Vec<SearchTagsV2Scope>,
    pub metrics: MetadataMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchTagValuesRequest {
    pub tag_name: String,
    pub query: String,
    pub max_tag_values: u32,
    pub stale_value_threshold: u32,
}

impl SearchTagValuesRequest {
    pub fn new(tag_name: impl Into<String>, query: impl Into<String>) -> Self {
        SearchTagValuesRequest {
            tag_name: tag_name.into(),
            query: query.into(),
            ..SearchTagValuesRequest::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchTagValuesResponse {
    pub tag_values: Vec<String>,
    pub metrics: MetadataMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchTagValuesV2Response {
    pub tag_values: Vec<TagValue>,
    pub metrics: MetadataMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_hex() {
        let id = TraceId::from_u128(0xab);
        assert_eq!(id.to_hex(), "000000000000000000000000000000ab");
    }

    #[test]
    fn test_root_service_name() {
        let mut trace = Trace::new(TraceId::from_u128(1));
        trace.batches.push(ResourceSpans {
            resource: vec![KeyValue::new("service.name", "checkout")],
            scope_spans: vec![ScopeSpans {
                scope: InstrumentationScope::default(),
                spans: vec![
                    Span { span_id: 2, parent_span_id: 1, name: "child".into(), ..Span::default() },
                    Span { span_id: 1, parent_span_id: 0, name: "root".into(), ..Span::default() },
                ],
            }],
        });

        assert_eq!(trace.root_service_name(), "checkout");
        assert_eq!(trace.root_span_name(), "root");
        assert_eq!(trace.span_count(), 2);
    }
}
