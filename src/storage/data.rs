use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use crate::core::context::Context;
use crate::core::error::Result;
use crate::core::types::{SearchRequest, SearchResponse, TagValue, Trace, TraceId};
use crate::query::ast::{Attribute, AttributeScope, Query};
use crate::query::engine;
use crate::query::matcher::SpanContext;
use crate::storage::segment::{FetchSpansRequest, FetchSpansResponse, SegmentId, SegmentMeta, Searcher};

/// Scopes the v1 tag-value search looks into
const V1_TAG_VALUE_SCOPES: [AttributeScope; 3] = [
    AttributeScope::Span,
    AttributeScope::Resource,
    AttributeScope::Instrumentation,
];

struct StoredTrace {
    trace: Trace,
    size: u64, // encoded size, charged as inspected bytes
}

/// In-memory trace store backing every segment variant.
///
/// Traces are kept in trace id order, so scans are deterministic.
pub struct SegmentData {
    meta: SegmentMeta,
    traces: BTreeMap<TraceId, StoredTrace>,
}

impl SegmentData {
    pub fn new(id: SegmentId) -> Self {
        SegmentData {
            meta: SegmentMeta::new(id),
            traces: BTreeMap::new(),
        }
    }

    /// Add a trace; batches of an already present trace id are appended to it
    pub fn append(&mut self, trace: Trace) {
        self.meta.extend(trace.start_unix_nanos(), trace.end_unix_nanos());

        match self.traces.entry(trace.trace_id) {
            Entry::Occupied(mut entry) => {
                let stored = entry.get_mut();
                stored.trace.batches.extend(trace.batches);
                let size = encoded_size(&stored.trace);
                self.meta.size_bytes = self.meta.size_bytes - stored.size + size;
                stored.size = size;
            }
            Entry::Vacant(entry) => {
                let size = encoded_size(&trace);
                self.meta.size_bytes += size;
                self.meta.total_objects += 1;
                entry.insert(StoredTrace { trace, size });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    fn scan(
        &self,
        ctx: &Context,
        range: &FetchSpansRequest,
        cb: &mut dyn FnMut(&Trace) -> bool,
    ) -> Result<FetchSpansResponse> {
        let mut resp = FetchSpansResponse::default();
        for stored in self.traces.values() {
            ctx.check()?;

            let trace = &stored.trace;
            if !range.overlaps(trace.start_unix_nanos(), trace.end_unix_nanos()) {
                continue;
            }
            resp.inspected_traces += 1;
            resp.inspected_bytes += stored.size;
            if cb(trace) {
                break;
            }
        }
        Ok(resp)
    }
}

fn encoded_size(trace: &Trace) -> u64 {
    bincode::serialized_size(trace).unwrap_or_default()
}

impl Searcher for SegmentData {
    fn meta(&self) -> &SegmentMeta {
        &self.meta
    }

    fn search(&self, ctx: &Context, req: &SearchRequest) -> Result<SearchResponse> {
        engine::execute_search(ctx, req, &Query::match_all(), req.limit as usize, self)
    }

    fn fetch(
        &self,
        ctx: &Context,
        req: &FetchSpansRequest,
        cb: &mut dyn FnMut(&Trace) -> bool,
    ) -> Result<FetchSpansResponse> {
        self.scan(ctx, req, cb)
    }

    fn search_tags(
        &self,
        ctx: &Context,
        scope: AttributeScope,
        cb: &mut dyn FnMut(&str, AttributeScope) -> bool,
        bytes: &mut dyn FnMut(u64),
    ) -> Result<()> {
        let inspected = engine::execute_tag_names(ctx, scope, &Query::match_all(), self, cb)?;
        bytes(inspected);
        Ok(())
    }

    fn search_tag_values(
        &self,
        ctx: &Context,
        tag_name: &str,
        cb: &mut dyn FnMut(&str) -> bool,
        bytes: &mut dyn FnMut(u64),
    ) -> Result<()> {
        let resp = self.scan(ctx, &FetchSpansRequest::default(), &mut |trace| {
            SpanContext::for_each(trace, |span| {
                for scope in V1_TAG_VALUE_SCOPES {
                    for kv in span.attributes(scope).flat_map(|attrs| attrs.iter()) {
                        if kv.key == tag_name && cb(&kv.value.to_string()) {
                            return true;
                        }
                    }
                }
                false
            })
        })?;
        bytes(resp.inspected_bytes);
        Ok(())
    }

    fn search_tag_values_v2(
        &self,
        ctx: &Context,
        attr: &Attribute,
        cb: &mut dyn FnMut(TagValue) -> bool,
        bytes: &mut dyn FnMut(u64),
    ) -> Result<()> {
        let inspected = engine::execute_tag_values(ctx, attr, &Query::match_all(), self, cb)?;
        bytes(inspected);
        Ok(())
    }
}
