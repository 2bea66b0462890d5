use std::sync::Arc;
use parking_lot::Mutex;
use crate::core::context::Context;
use crate::core::error::{Error, Result};
use crate::core::types::{SearchMetrics, SearchRequest, SearchResponse};
use crate::instance::{Instance, include_segment, record_error};
use crate::query::ast::Query;
use crate::query::engine;
use crate::search::combiner::MetadataCombiner;
use crate::search::merge::SharedMerge;
use crate::storage::complete::CompleteSegment;
use crate::storage::completing::CompletingSegment;
use crate::storage::head::HeadSegment;
use crate::storage::segment::{SegmentKind, Searcher};

/// State shared by the segment tasks of one trace search
struct SearchJob<'a> {
    ctx: Context,
    req: SearchRequest, // limit already resolved
    query: &'a Query,
    combiner: SharedMerge<MetadataCombiner>,
    metrics: Mutex<SearchMetrics>,
    first_err: Mutex<Option<Error>>,
}

impl SearchJob<'_> {
    fn search_segment(&self, kind: SegmentKind, searcher: &dyn Searcher) {
        let meta = searcher.meta();
        if !include_segment(meta, self.req.start, self.req.end) {
            return;
        }
        let span = tracing::debug_span!("search_segment", segment_id = %meta.id, kind = %kind);
        let _enter = span.enter();

        if self.combiner.is_complete_for(meta.end_time) {
            tracing::debug!("skipping segment, results already complete");
            return;
        }

        let result = if self.query.is_empty() && self.query.hints.is_empty() {
            searcher.search(&self.ctx, &self.req)
        } else {
            engine::execute_search(&self.ctx, &self.req, self.query, self.req.limit as usize, searcher)
        };

        let resp = match result {
            Ok(resp) => resp,
            Err(err) if err.is_unsupported() => {
                tracing::warn!(%err, "segment does not support search");
                return;
            }
            Err(err) if err.is_canceled() => return,
            Err(err) => {
                record_error(&self.first_err, Error::segment(kind.as_str(), meta.id, &err));
                return;
            }
        };

        for trace in resp.traces {
            match self.combiner.add(trace) {
                Ok(false) => {}
                Ok(true) => {
                    // results are final, stop sibling searches
                    self.ctx.cancel();
                    break;
                }
                Err(err) => {
                    record_error(&self.first_err, Error::segment(kind.as_str(), meta.id, &err));
                    return;
                }
            }
        }

        self.metrics.lock().add(&resp.metrics);
    }

    fn take_error(&self) -> Option<Error> {
        self.first_err.lock().take()
    }
}

impl Instance {
    /// Find traces matching `req` across every segment of the instance.
    ///
    /// The head segment is searched first and on its own; completing and
    /// complete segments are then searched concurrently while
    /// `segments_lock` is held for read.
    pub fn search(&self, req: &SearchRequest) -> Result<SearchResponse> {
        let span = tracing::debug_span!("instance.search", tenant = %self.tenant_id);
        let _enter = span.enter();

        let query = if req.query.trim().is_empty() {
            Query::match_all()
        } else {
            self.parser.parse(&req.query)?
        };
        let job = self.search_job(req, &query);

        self.run_search(job, |job| {
            let head = self.head.read();
            job.search_segment(HeadSegment::KIND, head.searcher());
        })
    }

    fn search_job<'q>(&self, req: &SearchRequest, query: &'q Query) -> SearchJob<'q> {
        let limit = if req.limit == 0 {
            self.config.default_search_limit
        } else {
            req.limit as usize
        };
        let mut resolved = req.clone();
        resolved.limit = u32::try_from(limit).unwrap_or(u32::MAX);

        SearchJob {
            ctx: Context::new(),
            req: resolved,
            query,
            combiner: SharedMerge::new(MetadataCombiner::new(limit, query.most_recent())),
            metrics: Mutex::new(SearchMetrics::default()),
            first_err: Mutex::new(None),
        }
    }

    // `search_head` runs to completion, and releases `head_lock`, before
    // `segments_lock` is taken.
    fn run_search(&self, job: SearchJob<'_>, search_head: impl FnOnce(&SearchJob<'_>)) -> Result<SearchResponse> {
        search_head(&job);
        if let Some(err) = job.take_error() {
            return Err(err);
        }

        {
            let segments = self.segments.read();
            let completing: &[Arc<CompletingSegment>] = &segments.completing;
            let complete: &[Arc<CompleteSegment>] = &segments.complete;
            let job = &job;

            rayon::scope(|s| {
                for seg in completing {
                    s.spawn(move |_| job.search_segment(CompletingSegment::KIND, seg.searcher()));
                }
                for seg in complete {
                    s.spawn(move |_| job.search_segment(CompleteSegment::KIND, seg.searcher()));
                }
            });
        }

        if let Some(err) = job.take_error() {
            return Err(err);
        }

        Ok(SearchResponse {
            traces: job.combiner.finalize(),
            metrics: job.metrics.into_inner(),
        })
    }
}
