use crate::core::context::Context;
use crate::core::error::Result;
use crate::core::types::{SearchMetrics, SearchRequest, SearchResponse, TagValue, Trace, TraceSearchMetadata};
use crate::query::ast::{Attribute, AttributeScope, Query};
use crate::query::matcher::{SpanContext, SpanMatcher, tag_values_of};
use crate::search::combiner::MetadataCombiner;
use crate::search::merge::StreamingMerge;
use crate::storage::segment::{FetchSpansRequest, Searcher};

/// Summary row for a trace with `matched_spans` matching spans
pub fn trace_metadata(trace: &Trace, matched_spans: usize) -> TraceSearchMetadata {
    let start = trace.start_unix_nanos();
    let duration_ms = trace.end_unix_nanos().saturating_sub(start) / 1_000_000;
    TraceSearchMetadata {
        trace_id: trace.trace_id.to_hex(),
        root_service_name: trace.root_service_name(),
        root_trace_name: trace.root_span_name(),
        start_time_unix_nano: start,
        duration_ms: u32::try_from(duration_ms).unwrap_or(u32::MAX),
        matched_spans: u32::try_from(matched_spans).unwrap_or(u32::MAX),
    }
}

/// Run a trace search over one segment's span fetch.
///
/// Stops pulling traces as soon as the local result set is complete.
pub fn execute_search<S: Searcher + ?Sized>(
    ctx: &Context,
    req: &SearchRequest,
    query: &Query,
    limit: usize,
    fetcher: &S,
) -> Result<SearchResponse> {
    let matcher = SpanMatcher::new(query)?;
    let mut combiner = MetadataCombiner::new(limit, query.most_recent());

    let fetched = fetcher.fetch(ctx, &FetchSpansRequest::from_search(req), &mut |trace| {
        let matched = matcher.count_matches(trace);
        if matched > 0 {
            combiner.add_metadata(trace_metadata(trace, matched));
        }
        combiner.should_quit()
    })?;

    Ok(SearchResponse {
        traces: combiner.finalize(),
        metrics: SearchMetrics {
            inspected_traces: fetched.inspected_traces,
            inspected_bytes: fetched.inspected_bytes,
        },
    })
}

/// Attribute names of matching spans, per scope bucket. Returns inspected bytes.
pub fn execute_tag_names<S: Searcher + ?Sized>(
    ctx: &Context,
    scope: AttributeScope,
    query: &Query,
    fetcher: &S,
    cb: &mut dyn FnMut(&str, AttributeScope) -> bool,
) -> Result<u64> {
    let matcher = SpanMatcher::new(query)?;

    let fetched = fetcher.fetch(ctx, &FetchSpansRequest::default(), &mut |trace| {
        SpanContext::for_each(trace, |span| {
            if !matcher.matches(&span) {
                return false;
            }
            for bucket in AttributeScope::BUCKETS {
                if !scope.covers(bucket) {
                    continue;
                }
                for kv in span.attributes(bucket).flat_map(|attrs| attrs.iter()) {
                    if cb(&kv.key, bucket) {
                        return true;
                    }
                }
            }
            false
        })
    })?;

    Ok(fetched.inspected_bytes)
}

/// Typed values of `attr` on matching spans. Returns inspected bytes.
pub fn execute_tag_values<S: Searcher + ?Sized>(
    ctx: &Context,
    attr: &Attribute,
    query: &Query,
    fetcher: &S,
    cb: &mut dyn FnMut(TagValue) -> bool,
) -> Result<u64> {
    let matcher = SpanMatcher::new(query)?;

    let fetched = fetcher.fetch(ctx, &FetchSpansRequest::default(), &mut |trace| {
        SpanContext::for_each(trace, |span| {
            if !matcher.matches(&span) {
                return false;
            }
            tag_values_of(&span, attr).into_iter().any(|v| cb(v))
        })
    })?;

    Ok(fetched.inspected_bytes)
}
