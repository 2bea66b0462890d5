use std::sync::Arc;
use crate::storage::data::SegmentData;
use crate::storage::segment::{SegmentId, SegmentKind, Searcher};

/// A former head segment, immutable, waiting to be completed
pub struct CompletingSegment {
    data: Arc<SegmentData>,
}

impl CompletingSegment {
    pub const KIND: SegmentKind = SegmentKind::Completing;

    pub fn new(data: SegmentData) -> Self {
        CompletingSegment { data: Arc::new(data) }
    }

    pub fn id(&self) -> SegmentId {
        self.data.meta().id
    }

    pub fn searcher(&self) -> &dyn Searcher {
        self.data.as_ref()
    }

    /// Shared handle on the contents, used to build the complete segment
    pub fn data(&self) -> Arc<SegmentData> {
        Arc::clone(&self.data)
    }
}
