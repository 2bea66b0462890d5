use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use crate::cache::disk::DiskCache;
use crate::cache::key::tag_values_cache_key;
use crate::collector::{DistinctString, DistinctValue, MetricsCollector};
use crate::core::context::Context;
use crate::core::error::{Error, Result};
use crate::core::types::{
    MetadataMetrics, SearchTagValuesRequest, SearchTagValuesResponse, SearchTagValuesV2Response, TagValue,
};
use crate::instance::{Instance, absorb, record_error};
use crate::query::ast::{Attribute, Query};
use crate::query::engine;
use crate::storage::complete::CompleteSegment;
use crate::storage::completing::CompletingSegment;
use crate::storage::head::HeadSegment;
use crate::storage::segment::{SegmentKind, Searcher};

impl Instance {
    /// Distinct string values of a tag.
    ///
    /// Segments are searched one at a time. Besides the value budget, at most
    /// `max_blocks_per_tag_values_query` non-empty segments are inspected.
    pub fn search_tag_values(
        &self,
        tag_name: &str,
        limit: u32,
        stale_value_threshold: u32,
    ) -> Result<SearchTagValuesResponse> {
        let span = tracing::debug_span!("instance.search_tag_values", tenant = %self.tenant_id, tag = tag_name);
        let _enter = span.enter();

        let max_bytes = self.limits.max_bytes_per_tag_values_query(&self.tenant_id);
        let max_segments = self.limits.max_blocks_per_tag_values_query(&self.tenant_id);
        let collector = DistinctString::new(max_bytes, limit as usize, stale_value_threshold as usize);
        let metrics = MetricsCollector::new();
        let ctx = Context::new();
        let mut inspected = 0usize;

        let mut search = |kind: SegmentKind, searcher: &dyn Searcher| -> Result<()> {
            if searcher.meta().total_objects == 0 {
                return Ok(());
            }
            if collector.exceeded() {
                return Ok(());
            }
            if max_segments > 0 && inspected >= max_segments {
                tracing::debug!(segment_id = %searcher.meta().id, max_segments, "skipping segment, segment budget reached");
                return Ok(());
            }
            inspected += 1;

            let result = searcher.search_tag_values(
                &ctx,
                tag_name,
                &mut |value| collector.collect(value),
                &mut |bytes| metrics.add(bytes),
            );
            absorb(kind, searcher, result)
        };

        {
            let head = self.head.read();
            search(HeadSegment::KIND, head.searcher())?;
        }

        {
            let segments = self.segments.read();
            for seg in &segments.completing {
                search(CompletingSegment::KIND, seg.searcher())?;
            }
            for seg in &segments.complete {
                search(CompleteSegment::KIND, seg.searcher())?;
            }
        }

        if collector.exceeded() {
            tracing::warn!(
                tenant = %self.tenant_id,
                tag = tag_name,
                stop_reason = %collector.stop_reason(),
                max_bytes,
                size = collector.size(),
                "size of tag values exceeded limit, reduce cardinality or size of tags"
            );
        }

        Ok(SearchTagValuesResponse {
            tag_values: collector.strings(),
            metrics: MetadataMetrics {
                inspected_bytes: metrics.total_value(),
            },
        })
    }

    /// Distinct typed values of a tag, optionally restricted by a filter.
    ///
    /// Completing and complete segments are searched concurrently on the
    /// instance's tag-value pool. Results of complete segments are memoized in
    /// their disk cache.
    pub fn search_tag_values_v2(&self, req: &SearchTagValuesRequest) -> Result<SearchTagValuesV2Response> {
        let span = tracing::debug_span!("instance.search_tag_values_v2", tenant = %self.tenant_id, tag = %req.tag_name);
        let _enter = span.enter();

        let attr = self.parser.parse_identifier(&req.tag_name)?;
        if let Attribute::Intrinsic(intrinsic) = &attr {
            if intrinsic.is_id() {
                return Ok(SearchTagValuesV2Response::default());
            }
        }
        let query = self.parser.parse_or_match_all(&req.query);

        let max_bytes = self.limits.max_bytes_per_tag_values_query(&self.tenant_id);
        let max_segments = self.limits.max_blocks_per_tag_values_query(&self.tenant_id);

        // keyed by the parsed identifier so equivalent spellings share entries
        let cache_key = tag_values_cache_key(&self.config.tag_values_cache_prefix, &attr.to_string(), &req.query, max_bytes);

        let job = TagValuesJob {
            ctx: Context::new(),
            attr,
            query,
            cache_key,
            max_bytes,
            max_segments,
            collector: DistinctValue::new(
                max_bytes,
                req.max_tag_values as usize,
                req.stale_value_threshold as usize,
                TagValue::size,
            ),
            metrics: MetricsCollector::new(),
            inspected: AtomicUsize::new(0),
            first_err: Mutex::new(None),
        };

        {
            let head = self.head.read();
            job.search_segment(HeadSegment::KIND, head.searcher(), None);
        }
        if let Some(err) = job.first_err.lock().take() {
            return Err(err);
        }

        {
            let segments = self.segments.read();
            let completing: &[Arc<CompletingSegment>] = &segments.completing;
            let complete: &[Arc<CompleteSegment>] = &segments.complete;
            let job = &job;

            self.tag_values_pool.scope(|s| {
                for seg in completing {
                    s.spawn(move |_| job.search_segment(CompletingSegment::KIND, seg.searcher(), None));
                }
                for seg in complete {
                    s.spawn(move |_| job.search_segment(CompleteSegment::KIND, seg.searcher(), Some(seg.cache())));
                }
            });
        }

        if let Some(err) = job.first_err.lock().take() {
            return Err(err);
        }

        if job.collector.exceeded() {
            tracing::warn!(
                tenant = %self.tenant_id,
                tag = %req.tag_name,
                stop_reason = %job.collector.stop_reason(),
                max_bytes,
                size = job.collector.size(),
                "size of tag values exceeded limit, reduce cardinality or size of tags"
            );
        }

        Ok(SearchTagValuesV2Response {
            tag_values: job.collector.values(),
            metrics: MetadataMetrics {
                inspected_bytes: job.metrics.total_value(),
            },
        })
    }
}

/// State shared by the segment tasks of one v2 tag-value search
struct TagValuesJob {
    ctx: Context,
    attr: Attribute,
    query: Query,
    cache_key: String,
    max_bytes: usize,
    max_segments: usize,
    collector: DistinctValue<TagValue>,
    metrics: MetricsCollector,
    inspected: AtomicUsize,
    first_err: Mutex<Option<Error>>,
}

impl TagValuesJob {
    // The counter is bumped on every check, so under concurrency one segment
    // past the budget may still start.
    fn exit_early(&self) -> bool {
        if self.first_err.lock().is_some() {
            return true;
        }
        self.max_segments > 0 && self.inspected.fetch_add(1, Ordering::SeqCst) + 1 > self.max_segments
    }

    fn search_segment(&self, kind: SegmentKind, searcher: &dyn Searcher, cache: Option<&DiskCache>) {
        let meta = searcher.meta();
        if meta.total_objects == 0 || self.exit_early() || self.collector.exceeded() {
            return;
        }
        let span = tracing::debug_span!("search_segment", segment_id = %meta.id, kind = %kind);
        let _enter = span.enter();

        if let Some(hit) = cache.and_then(|c| c.fetch_tag_values(&self.cache_key)) {
            self.metrics.add(hit.blob_len as u64);
            for value in hit.values {
                if self.collector.collect(value) {
                    break;
                }
            }
            return;
        }

        // The cached list must only depend on the cache key, so the local
        // collector is bounded by bytes alone.
        let local = DistinctValue::new(self.max_bytes, 0, 0, TagValue::size);
        let result = if self.query.is_empty() {
            searcher.search_tag_values_v2(
                &self.ctx,
                &self.attr,
                &mut |value| local.collect(value),
                &mut |bytes| self.metrics.add(bytes),
            )
        } else {
            engine::execute_tag_values(&self.ctx, &self.attr, &self.query, searcher, &mut |value| local.collect(value))
                .map(|bytes| self.metrics.add(bytes))
        };

        // unsupported and canceled searches must not reach the cache either
        if let Err(err) = result {
            if let Err(err) = absorb(kind, searcher, Err(err)) {
                record_error(&self.first_err, err);
            }
            return;
        }

        let values = local.values();
        if let Some(cache) = cache {
            cache.store_tag_values(&self.cache_key, &values);
        }
        for value in values {
            if self.collector.collect(value) {
                break;
            }
        }
    }
}
