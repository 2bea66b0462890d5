use crate::core::types::Trace;
use crate::storage::data::SegmentData;
use crate::storage::segment::{SegmentId, SegmentKind, Searcher};

/// The single mutable segment receiving pushes
pub struct HeadSegment {
    data: SegmentData,
}

impl HeadSegment {
    pub const KIND: SegmentKind = SegmentKind::Head;

    pub fn new() -> Self {
        HeadSegment {
            data: SegmentData::new(SegmentId::new()),
        }
    }

    pub fn append(&mut self, trace: Trace) {
        self.data.append(trace);
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn searcher(&self) -> &dyn Searcher {
        &self.data
    }

    /// Stop accepting data; the contents move on as-is.
    pub fn seal(self) -> SegmentData {
        self.data
    }
}

impl Default for HeadSegment {
    fn default() -> Self {
        HeadSegment::new()
    }
}
