pub mod core;
pub mod collector;
pub mod query;
pub mod storage;
pub mod cache;
pub mod search;
pub mod instance;

pub use crate::core::config::Config;
pub use crate::core::context::Context;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::limits::{Limits, ReadLimits, StaticLimits};
pub use crate::instance::{Instance, include_segment};

/*
┌────────────────────────────────────────────────────────────────────────────────────┐
│                           TRACEFOLD STRUCT ARCHITECTURE                            │
└────────────────────────────────────────────────────────────────────────────────────┘

┌───────────────────────────────── INSTANCE LAYER ───────────────────────────────────┐
│                                                                                    │
│  ┌──────────────────────────────────────────────────────────────────────────────┐  │
│  │                               struct Instance                                │  │
│  │  ┌────────────────────────────────────────────────────────────────────────┐  │  │
│  │  │ tenant_id: String                                                      │  │  │
│  │  │ config: Config                     // limits, cache prefix, paths      │  │  │
│  │  │ layout: StorageLayout              // <storage>/segments/<id>/cache    │  │  │
│  │  │ limits: Arc<dyn Limits>            // per-tenant read budgets          │  │  │
│  │  │ parser: QueryParser                                                    │  │  │
│  │  │ head: RwLock<HeadSegment>          // head_lock, always taken first    │  │  │
│  │  │ segments: RwLock<Segments>         // segments_lock                    │  │  │
│  │  │   • completing: Vec<Arc<CompletingSegment>>                            │  │  │
│  │  │   • complete:   Vec<Arc<CompleteSegment>>                              │  │  │
│  │  │ tag_values_pool: rayon::ThreadPool // v2 tag-value fan-out             │  │  │
│  │  └────────────────────────────────────────────────────────────────────────┘  │  │
│  └──────────────────────────────────────────────────────────────────────────────┘  │
│                                                                                    │
│  search()              head (sync) ──► rayon::scope over completing + complete     │
│  search_tags(_v2)()    head ──► completing ──► complete, sequential                │
│  search_tag_values()   sequential, segment budget                                  │
│  search_tag_values_v2() head (sync) ──► pool.scope, DiskCache for complete         │
└────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────── MERGE LAYER ────────────────────────────────────┐
│                                                                                    │
│  trait StreamingMerge            struct SharedMerge<M>      struct MetadataCombiner │
│  • add(item)                     • Mutex<M>                 • limit, most_recent    │
│  • is_complete_for(boundary)                                • dedup by trace id     │
│  • should_quit()                 SearchResponseCombiner     • newest first          │
│  • finalize() / diff()           TagValuesResponseCombiner                          │
│                                                                                    │
│  DistinctValue<T> / DistinctString / ScopedDistinctString                          │
│  • byte budget ──► cardinality cap ──► staleness threshold ──► StopReason          │
└────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── SEGMENT LAYER ───────────────────────────────────┐
│                                                                                    │
│  trait Searcher (every method defaults to Unsupported)                             │
│  • meta()  • search()  • fetch()  • search_tags()  • search_tag_values(_v2)()      │
│                                                                                    │
│  HeadSegment ──seal──► CompletingSegment ──complete──► CompleteSegment             │
│        └───────────── SegmentData (BTreeMap<TraceId, Trace>) ─────┘   + DiskCache  │
│                                                                                    │
│  DiskCache: <prefix>_<xxh3(tag, canonical query, limit)>.buf                       │
│             [ crc32 ][ bincode(Vec<TagValue>) ], errors logged, never returned     │
└────────────────────────────────────────────────────────────────────────────────────┘
*/
