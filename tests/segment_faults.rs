mod common;

use std::sync::Arc;
use common::{complete_segment_of, foo_trace, new_instance};
use tracefold::cache::disk::DiskCache;
use tracefold::core::context::Context;
use tracefold::core::types::{SearchRequest, SearchResponse, SearchTagValuesRequest, SearchTagsRequest, Trace};
use tracefold::query::ast::AttributeScope;
use tracefold::storage::segment::{FetchSpansRequest, FetchSpansResponse, SegmentId, SegmentMeta, Searcher};
use tracefold::storage::CompleteSegment;
use tracefold::{Error, ErrorKind, Result, StaticLimits};

fn meta() -> SegmentMeta {
    let mut meta = SegmentMeta::new(SegmentId::new());
    meta.start_time = 1_000;
    meta.end_time = 1_001;
    meta.total_objects = 1;
    meta
}

/// A segment whose storage is broken
struct FailingSearcher {
    meta: SegmentMeta,
}

fn broken() -> Error {
    Error::new(ErrorKind::Io, "block is corrupt".to_string())
}

impl Searcher for FailingSearcher {
    fn meta(&self) -> &SegmentMeta {
        &self.meta
    }

    fn search(&self, _ctx: &Context, _req: &SearchRequest) -> Result<SearchResponse> {
        Err(broken())
    }

    fn fetch(
        &self,
        _ctx: &Context,
        _req: &FetchSpansRequest,
        _cb: &mut dyn FnMut(&Trace) -> bool,
    ) -> Result<FetchSpansResponse> {
        Err(broken())
    }

    fn search_tags(
        &self,
        _ctx: &Context,
        _scope: AttributeScope,
        _cb: &mut dyn FnMut(&str, AttributeScope) -> bool,
        _bytes: &mut dyn FnMut(u64),
    ) -> Result<()> {
        Err(broken())
    }

    fn search_tag_values(
        &self,
        _ctx: &Context,
        _tag_name: &str,
        _cb: &mut dyn FnMut(&str) -> bool,
        _bytes: &mut dyn FnMut(u64),
    ) -> Result<()> {
        Err(broken())
    }
}

/// A segment format that implements no search at all
struct LegacySearcher {
    meta: SegmentMeta,
}

impl Searcher for LegacySearcher {
    fn meta(&self) -> &SegmentMeta {
        &self.meta
    }
}

fn add_searcher(instance: &tracefold::Instance, searcher: impl Searcher + 'static) {
    let id = searcher.meta().id;
    instance.add_complete_segment(CompleteSegment::new(Arc::new(searcher), DiskCache::open(instance.layout(), id)));
}

#[test]
fn test_segment_error_fails_search() {
    let (_dir, instance) = new_instance(StaticLimits::default());
    complete_segment_of(&instance, (0..10).map(foo_trace));
    add_searcher(&instance, FailingSearcher { meta: meta() });

    let err = instance.search(&SearchRequest::new("")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Segment);
    assert!(err.to_string().contains("complete"));

    let err = instance.search(&SearchRequest::new(r#"{ span.foo = "bar1" }"#)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Segment);
}

#[test]
fn test_segment_error_fails_tag_searches() {
    let (_dir, instance) = new_instance(StaticLimits::default());
    complete_segment_of(&instance, (0..10).map(foo_trace));
    add_searcher(&instance, FailingSearcher { meta: meta() });

    let err = instance.search_tags_v2(&SearchTagsRequest::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Segment);

    let err = instance.search_tag_values("foo", 0, 0).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Segment);

    // v2 tag values without a filter never reach the failing fetch, the
    // default search_tag_values_v2 is unsupported and skipped
    let resp = instance
        .search_tag_values_v2(&SearchTagValuesRequest::new("span.foo", ""))
        .unwrap();
    assert_eq!(resp.tag_values.len(), 10);

    let err = instance
        .search_tag_values_v2(&SearchTagValuesRequest::new("span.foo", r#"{ name != "x" }"#))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Segment);
}

#[test]
fn test_out_of_range_failing_segment_is_not_touched() {
    let (_dir, instance) = new_instance(StaticLimits::default());
    complete_segment_of(&instance, (0..10).map(foo_trace));
    add_searcher(&instance, FailingSearcher { meta: meta() });

    let resp = instance.search(&SearchRequest::new("").with_range(2_000, 3_000)).unwrap();
    assert!(resp.traces.is_empty());
}

#[test]
fn test_unsupported_segments_are_skipped() {
    let (_dir, instance) = new_instance(StaticLimits::default());
    complete_segment_of(&instance, (0..10).map(foo_trace));
    add_searcher(&instance, LegacySearcher { meta: meta() });

    assert_eq!(instance.search(&SearchRequest::new("")).unwrap().traces.len(), 10);
    assert_eq!(
        instance.search(&SearchRequest::new(r#"{ span.foo = "bar1" }"#)).unwrap().traces.len(),
        1
    );
    assert_eq!(instance.search_tags("").unwrap().tag_names.len(), 5);
    assert_eq!(instance.search_tag_values("foo", 0, 0).unwrap().tag_values.len(), 10);

    let resp = instance
        .search_tag_values_v2(&SearchTagValuesRequest::new("span.foo", ""))
        .unwrap();
    assert_eq!(resp.tag_values.len(), 10);
}

#[test]
fn test_unsupported_results_are_not_cached() {
    let (dir, instance) = new_instance(StaticLimits::default());
    let legacy = LegacySearcher { meta: meta() };
    let id = legacy.meta.id;
    add_searcher(&instance, legacy);

    let resp = instance
        .search_tag_values_v2(&SearchTagValuesRequest::new("span.foo", ""))
        .unwrap();
    assert!(resp.tag_values.is_empty());
    assert!(!dir.path().join("segments").join(id.to_string()).join("cache").exists());
}
