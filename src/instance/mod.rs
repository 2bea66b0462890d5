pub mod search;
pub mod tags;
pub mod tag_values;

use std::fs;
use std::mem;
use std::sync::Arc;
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use crate::cache::disk::DiskCache;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::limits::Limits;
use crate::core::types::Trace;
use crate::query::parser::QueryParser;
use crate::storage::complete::CompleteSegment;
use crate::storage::completing::CompletingSegment;
use crate::storage::head::HeadSegment;
use crate::storage::layout::StorageLayout;
use crate::storage::segment::{SegmentId, SegmentKind, SegmentMeta, Searcher};

/// Segments behind `segments_lock`
#[derive(Default)]
pub struct Segments {
    pub completing: Vec<Arc<CompletingSegment>>,
    pub complete: Vec<Arc<CompleteSegment>>,
}

/// All segments of one tenant on this node.
///
/// Two locks guard two partitions of the segment set:
/// - `head`: the single mutable segment
/// - `segments`: completing and complete segments
///
/// Lock order is always `head` then `segments`. Searches take them one after
/// the other and never nest them; mutations that need both go through
/// `lock_both_for_write`.
pub struct Instance {
    tenant_id: String,
    config: Config,
    layout: StorageLayout,
    limits: Arc<dyn Limits>,
    parser: QueryParser,

    head: RwLock<HeadSegment>,  // head_lock
    segments: RwLock<Segments>, // segments_lock

    tag_values_pool: rayon::ThreadPool, // bounds concurrent v2 tag-value segment searches
}

impl Instance {
    pub fn new(tenant_id: impl Into<String>, config: Config, limits: Arc<dyn Limits>) -> Result<Self> {
        let layout = StorageLayout::new(config.storage_path.clone())?;

        let tag_values_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_concurrent_tag_value_searches.max(1))
            .thread_name(|i| format!("tag-values-{}", i))
            .build()
            .map_err(|e| Error::new(ErrorKind::Internal, format!("building tag values pool: {}", e)))?;

        Ok(Instance {
            tenant_id: tenant_id.into(),
            config,
            layout,
            limits,
            parser: QueryParser::new(),
            head: RwLock::new(HeadSegment::new()),
            segments: RwLock::new(Segments::default()),
            tag_values_pool,
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    // The only place both locks are held at once.
    fn lock_both_for_write(&self) -> (RwLockWriteGuard<'_, HeadSegment>, RwLockWriteGuard<'_, Segments>) {
        let head = self.head.write();
        let segments = self.segments.write();
        (head, segments)
    }

    /// Append a trace to the head segment
    pub fn push(&self, trace: Trace) {
        self.head.write().append(trace);
    }

    /// Seal the head segment into a completing one and start a new head.
    /// Returns `None` when the head is empty.
    pub fn cut_head(&self) -> Option<SegmentId> {
        let (mut head, mut segments) = self.lock_both_for_write();
        if head.is_empty() {
            return None;
        }

        let data = mem::take(&mut *head).seal();
        let id = data.meta().id;
        segments.completing.push(Arc::new(CompletingSegment::new(data)));
        tracing::debug!(tenant = %self.tenant_id, segment_id = %id, "cut head segment");
        Some(id)
    }

    /// Turn a completing segment into a complete one
    pub fn complete_segment(&self, id: SegmentId) -> Result<()> {
        let completing = self
            .segments
            .read()
            .completing
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("completing segment {}", id)))?;

        // built without holding any lock
        fs::create_dir_all(self.layout.segment_dir(&id))?;
        let cache = DiskCache::open(&self.layout, id);
        let complete = CompleteSegment::new(completing.data(), cache);

        let mut segments = self.segments.write();
        let before = segments.completing.len();
        segments.completing.retain(|s| s.id() != id);
        if segments.completing.len() == before {
            // completed or cleared by someone else since the lookup
            return Err(Error::new(ErrorKind::NotFound, format!("completing segment {}", id)));
        }
        segments.complete.push(Arc::new(complete));
        tracing::debug!(tenant = %self.tenant_id, segment_id = %id, "completed segment");
        Ok(())
    }

    /// Add an already built complete segment
    pub fn add_complete_segment(&self, segment: CompleteSegment) {
        self.segments.write().complete.push(Arc::new(segment));
    }

    /// Drop a completing segment. Returns false if it was not found.
    pub fn clear_completing(&self, id: SegmentId) -> bool {
        let mut segments = self.segments.write();
        let before = segments.completing.len();
        segments.completing.retain(|s| s.id() != id);
        segments.completing.len() != before
    }

    /// Drop a complete segment together with its on-disk cache
    pub fn clear_complete(&self, id: SegmentId) -> bool {
        let removed = {
            let mut segments = self.segments.write();
            let before = segments.complete.len();
            segments.complete.retain(|s| s.id() != id);
            segments.complete.len() != before
        };

        let dir = self.layout.segment_dir(&id);
        if removed && dir.exists() {
            if let Err(err) = fs::remove_dir_all(&dir) {
                tracing::warn!(tenant = %self.tenant_id, segment_id = %id, %err, "error removing segment directory");
            }
        }
        removed
    }

    pub fn completing_count(&self) -> usize {
        self.segments.read().completing.len()
    }

    pub fn complete_count(&self) -> usize {
        self.segments.read().complete.len()
    }
}

/// Whether a segment overlaps the requested range in unix seconds.
/// A request with either bound 0 includes every segment; the segment's fetch
/// still applies the bound that is set.
pub fn include_segment(meta: &SegmentMeta, start: u32, end: u32) -> bool {
    if start == 0 || end == 0 {
        return true;
    }
    meta.start_time <= end && meta.end_time >= start
}

/// First error wins, later ones are only logged
pub(crate) fn record_error(slot: &Mutex<Option<Error>>, err: Error) {
    let mut slot = slot.lock();
    if slot.is_none() {
        tracing::error!(%err, "segment search failed");
        *slot = Some(err);
    } else {
        tracing::debug!(%err, "discarding error, another segment failed first");
    }
}

/// Outcome of one segment search once absorbed errors are filtered out
pub(crate) fn absorb(kind: SegmentKind, searcher: &dyn Searcher, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.is_unsupported() => {
            tracing::warn!(segment_id = %searcher.meta().id, kind = %kind, %err, "segment does not support this search");
            Ok(())
        }
        Err(err) if err.is_canceled() => Ok(()),
        Err(err) => Err(Error::segment(kind.as_str(), searcher.meta().id, &err)),
    }
}
