use std::sync::Arc;
use crate::cache::disk::DiskCache;
use crate::storage::segment::{SegmentId, SegmentKind, SegmentMeta, Searcher};

/// A sealed segment. Its contents never change, so tag-value results may be
/// memoized in the segment's disk cache.
pub struct CompleteSegment {
    searcher: Arc<dyn Searcher>,
    cache: DiskCache,
}

impl CompleteSegment {
    pub const KIND: SegmentKind = SegmentKind::Complete;

    pub fn new(searcher: Arc<dyn Searcher>, cache: DiskCache) -> Self {
        CompleteSegment { searcher, cache }
    }

    pub fn id(&self) -> SegmentId {
        self.searcher.meta().id
    }

    pub fn meta(&self) -> &SegmentMeta {
        self.searcher.meta()
    }

    pub fn searcher(&self) -> &dyn Searcher {
        self.searcher.as_ref()
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }
}
