pub mod merge;
pub mod combiner;
pub mod shard;

pub use combiner::MetadataCombiner;
pub use merge::{StreamingMerge, SharedMerge, TIMESTAMP_NEVER, merge_all};
pub use shard::{SearchResponseCombiner, TagValuesResponseCombiner};
