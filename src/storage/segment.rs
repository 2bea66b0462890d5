use std::fmt;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use serde::{Deserialize, Serialize};
use crate::core::context::Context;
use crate::core::error::{Error, Result};
use crate::core::types::{SearchRequest, SearchResponse, TagValue, Trace};
use crate::query::ast::{Attribute, AttributeScope};

/// Unique segment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn new() -> Self {
        SegmentId(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        SegmentId::new()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle stage of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Head,
    Completing,
    Complete,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Head => "head",
            SegmentKind::Completing => "completing",
            SegmentKind::Complete => "complete",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub id: SegmentId,
    pub start_time: u32,      // unix seconds of the earliest span, 0 when empty
    pub end_time: u32,        // unix seconds of the latest span, rounded up
    pub total_objects: u64,   // number of traces
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl SegmentMeta {
    pub fn new(id: SegmentId) -> Self {
        SegmentMeta {
            id,
            start_time: 0,
            end_time: 0,
            total_objects: 0,
            size_bytes: 0,
            created_at: Utc::now(),
        }
    }

    /// Widen the time range to cover a trace spanning `[start_nanos, end_nanos]`
    pub fn extend(&mut self, start_nanos: u64, end_nanos: u64) {
        let start = seconds(start_nanos);
        let end = seconds(end_nanos.saturating_add(999_999_999));
        if self.total_objects == 0 || start < self.start_time {
            self.start_time = start;
        }
        if end > self.end_time {
            self.end_time = end;
        }
    }
}

fn seconds(nanos: u64) -> u32 {
    u32::try_from(nanos / 1_000_000_000).unwrap_or(u32::MAX)
}

/// Time range handed to a span fetch, in unix nanoseconds. 0 leaves a side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSpansRequest {
    pub start_unix_nanos: u64,
    pub end_unix_nanos: u64,
}

impl FetchSpansRequest {
    pub fn from_search(req: &SearchRequest) -> Self {
        FetchSpansRequest {
            start_unix_nanos: u64::from(req.start) * 1_000_000_000,
            end_unix_nanos: u64::from(req.end) * 1_000_000_000,
        }
    }

    pub fn overlaps(&self, start_nanos: u64, end_nanos: u64) -> bool {
        (self.end_unix_nanos == 0 || start_nanos <= self.end_unix_nanos)
            && (self.start_unix_nanos == 0 || end_nanos >= self.start_unix_nanos)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSpansResponse {
    pub inspected_traces: u32,
    pub inspected_bytes: u64,
}

/// Search capabilities of one segment.
///
/// Every method defaults to an `Unsupported` error, which the instance skips
/// silently. Callbacks return true to stop the segment scan early.
pub trait Searcher: Send + Sync {
    fn meta(&self) -> &SegmentMeta;

    /// Match-all trace listing
    fn search(&self, _ctx: &Context, _req: &SearchRequest) -> Result<SearchResponse> {
        Err(Error::unsupported("search"))
    }

    /// Stream the traces overlapping the requested range
    fn fetch(
        &self,
        _ctx: &Context,
        _req: &FetchSpansRequest,
        _cb: &mut dyn FnMut(&Trace) -> bool,
    ) -> Result<FetchSpansResponse> {
        Err(Error::unsupported("fetch"))
    }

    /// Attribute names in the buckets covered by `scope`
    fn search_tags(
        &self,
        _ctx: &Context,
        _scope: AttributeScope,
        _cb: &mut dyn FnMut(&str, AttributeScope) -> bool,
        _bytes: &mut dyn FnMut(u64),
    ) -> Result<()> {
        Err(Error::unsupported("search tags"))
    }

    /// Plain string values of a span, resource or instrumentation attribute
    fn search_tag_values(
        &self,
        _ctx: &Context,
        _tag_name: &str,
        _cb: &mut dyn FnMut(&str) -> bool,
        _bytes: &mut dyn FnMut(u64),
    ) -> Result<()> {
        Err(Error::unsupported("search tag values"))
    }

    fn search_tag_values_v2(
        &self,
        _ctx: &Context,
        _attr: &Attribute,
        _cb: &mut dyn FnMut(TagValue) -> bool,
        _bytes: &mut dyn FnMut(u64),
    ) -> Result<()> {
        Err(Error::unsupported("search tag values v2"))
    }
}
