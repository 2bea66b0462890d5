pub mod layout;
pub mod segment;
pub mod data;
pub mod head;
pub mod completing;
pub mod complete;

pub use complete::CompleteSegment;
pub use completing::CompletingSegment;
pub use data::SegmentData;
pub use head::HeadSegment;
pub use segment::{FetchSpansRequest, FetchSpansResponse, SegmentId, SegmentKind, SegmentMeta, Searcher};
