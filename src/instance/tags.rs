use crate::collector::{DistinctString, MetricsCollector, ScopedDistinctString};
use crate::core::context::Context;
use crate::core::error::{Error, Result};
use crate::core::types::{MetadataMetrics, SearchTagsRequest, SearchTagsResponse, SearchTagsV2Response, SearchTagsV2Scope};
use crate::instance::{Instance, absorb};
use crate::query::ast::AttributeScope;
use crate::query::engine;
use crate::storage::complete::CompleteSegment;
use crate::storage::completing::CompletingSegment;
use crate::storage::head::HeadSegment;
use crate::storage::segment::{SegmentKind, Searcher};

impl Instance {
    /// Distinct tag names over all scopes, flattened
    pub fn search_tags(&self, scope: &str) -> Result<SearchTagsResponse> {
        let resp = self.search_tags_v2(&SearchTagsRequest {
            scope: scope.to_string(),
            ..SearchTagsRequest::default()
        })?;

        let distinct = DistinctString::new(0, 0, 0);
        for scope in &resp.scopes {
            for tag in &scope.tags {
                distinct.collect(tag.as_str());
            }
        }

        Ok(SearchTagsResponse {
            tag_names: distinct.strings(),
            metrics: resp.metrics,
        })
    }

    /// Distinct tag names grouped by scope.
    ///
    /// Segments are searched one at a time; once the collector is exceeded the
    /// remaining segments are skipped.
    pub fn search_tags_v2(&self, req: &SearchTagsRequest) -> Result<SearchTagsV2Response> {
        let span = tracing::debug_span!("instance.search_tags_v2", tenant = %self.tenant_id, scope = %req.scope);
        let _enter = span.enter();

        let scope = match AttributeScope::parse(&req.scope) {
            // intrinsic names are not stored in segments
            AttributeScope::Intrinsic => return Ok(SearchTagsV2Response::default()),
            AttributeScope::Unknown => {
                return Err(Error::invalid_argument(format!("unknown scope: {}", req.scope)));
            }
            scope => scope,
        };

        let max_bytes = self.limits.max_bytes_per_tag_values_query(&self.tenant_id);
        let collector = ScopedDistinctString::new(
            max_bytes,
            req.max_tags_per_scope as usize,
            req.stale_values_threshold as usize,
        );
        let metrics = MetricsCollector::new();
        let query = self.parser.parse_or_match_all(&req.query);
        let ctx = Context::new();

        let search = |kind: SegmentKind, searcher: &dyn Searcher| -> Result<()> {
            if collector.exceeded() {
                tracing::debug!(segment_id = %searcher.meta().id, "skipping segment, tag limit reached");
                return Ok(());
            }

            let mut cb = |name: &str, bucket: AttributeScope| collector.collect(bucket.as_str(), name);
            let result = if query.is_empty() {
                searcher.search_tags(&ctx, scope, &mut cb, &mut |bytes| metrics.add(bytes))
            } else {
                engine::execute_tag_names(&ctx, scope, &query, searcher, &mut cb).map(|bytes| metrics.add(bytes))
            };
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
                stop_reason = %collector.stop_reason(),
                max_bytes,
                size = collector.size(),
                "search tags exceeded limit, reduce cardinality or size of tags"
            );
        }

        let scopes = collector
            .strings()
            .into_iter()
            .map(|(name, tags)| SearchTagsV2Scope { name, tags })
            .collect();

        Ok(SearchTagsV2Response {
            scopes,
            metrics: MetadataMetrics {
                inspected_bytes: metrics.total_value(),
            },
        })
    }
}
