use std::collections::{HashMap, HashSet};
use crate::core::error::Result;
use crate::core::types::TraceSearchMetadata;
use crate::search::merge::{StreamingMerge, TIMESTAMP_NEVER};

/// Accumulates trace summaries from many segments, deduplicated by trace id.
///
/// Keeps at most `limit` traces (0 keeps everything). In most-recent mode a
/// full combiner still swaps its oldest trace for a newer one.
///
/// Eviction and completeness use the newest start seen for each kept trace.
/// Combining can only raise it, so the oldest key never moves backwards even
/// when a later segment reports an earlier start for the same trace.
pub struct MetadataCombiner {
    limit: usize,
    most_recent: bool,
    traces: HashMap<String, Kept>,
    changed: HashSet<String>, // trace ids touched since the last diff
}

struct Kept {
    meta: TraceSearchMetadata,
    newest_start: u64, // eviction key, never lowered
}

impl MetadataCombiner {
    pub fn new(limit: usize, most_recent: bool) -> Self {
        MetadataCombiner {
            limit,
            most_recent,
            traces: HashMap::new(),
            changed: HashSet::new(),
        }
    }

    pub fn add_metadata(&mut self, meta: TraceSearchMetadata) {
        if let Some(existing) = self.traces.get_mut(&meta.trace_id) {
            existing.newest_start = existing.newest_start.max(meta.start_time_unix_nano);
            combine(&mut existing.meta, &meta);
            self.changed.insert(meta.trace_id);
            return;
        }

        if !self.is_full() {
            self.insert(meta);
            return;
        }
        if !self.most_recent {
            return;
        }

        let oldest = self
            .traces
            .values()
            .min_by(|a, b| {
                a.newest_start
                    .cmp(&b.newest_start)
                    .then_with(|| b.meta.trace_id.cmp(&a.meta.trace_id))
            })
            .map(|k| (k.meta.trace_id.clone(), k.newest_start));

        if let Some((oldest_id, oldest_start)) = oldest {
            if meta.start_time_unix_nano > oldest_start {
                self.traces.remove(&oldest_id);
                self.changed.remove(&oldest_id);
                self.insert(meta);
            }
        }
    }

    fn insert(&mut self, meta: TraceSearchMetadata) {
        self.changed.insert(meta.trace_id.clone());
        let newest_start = meta.start_time_unix_nano;
        self.traces.insert(meta.trace_id.clone(), Kept { meta, newest_start });
    }

    fn is_full(&self) -> bool {
        self.limit > 0 && self.traces.len() >= self.limit
    }

    pub fn count(&self) -> usize {
        self.traces.len()
    }

    /// Smallest eviction key among kept traces
    pub fn oldest_start_nanos(&self) -> Option<u64> {
        self.traces.values().map(|k| k.newest_start).min()
    }

    /// Kept traces, newest first
    pub fn metadata(&self) -> Vec<TraceSearchMetadata> {
        sorted(self.traces.values().map(|k| k.meta.clone()).collect())
    }
}

fn sorted(mut traces: Vec<TraceSearchMetadata>) -> Vec<TraceSearchMetadata> {
    traces.sort_by(|a, b| {
        b.start_time_unix_nano
            .cmp(&a.start_time_unix_nano)
            .then_with(|| a.trace_id.cmp(&b.trace_id))
    });
    traces
}

/// Merge two summaries of the same trace found in different segments
fn combine(existing: &mut TraceSearchMetadata, other: &TraceSearchMetadata) {
    let end_ms = |m: &TraceSearchMetadata| m.start_time_unix_nano / 1_000_000 + u64::from(m.duration_ms);
    let end = end_ms(existing).max(end_ms(other));

    existing.start_time_unix_nano = existing.start_time_unix_nano.min(other.start_time_unix_nano);
    let duration = end.saturating_sub(existing.start_time_unix_nano / 1_000_000);
    existing.duration_ms = u32::try_from(duration).unwrap_or(u32::MAX);
    existing.matched_spans = existing.matched_spans.saturating_add(other.matched_spans);

    if existing.root_service_name.is_empty() {
        existing.root_service_name = other.root_service_name.clone();
    }
    if existing.root_trace_name.is_empty() {
        existing.root_trace_name = other.root_trace_name.clone();
    }
}

impl StreamingMerge for MetadataCombiner {
    type Item = TraceSearchMetadata;
    type Output = Vec<TraceSearchMetadata>;

    fn add(&mut self, item: TraceSearchMetadata) -> Result<()> {
        self.add_metadata(item);
        Ok(())
    }

    fn is_complete_for(&self, boundary: u32) -> bool {
        if !self.is_full() {
            return false;
        }
        if !self.most_recent {
            return true;
        }
        // a newer trace could always replace the oldest one
        if boundary == TIMESTAMP_NEVER {
            return false;
        }
        self.oldest_start_nanos()
            .is_some_and(|oldest| oldest > u64::from(boundary) * 1_000_000_000)
    }

    fn finalize(&self) -> Vec<TraceSearchMetadata> {
        self.metadata()
    }

    fn diff(&mut self) -> Vec<TraceSearchMetadata> {
        let changed: Vec<TraceSearchMetadata> = self
            .changed
            .drain()
            .filter_map(|id| self.traces.get(&id).map(|k| k.meta.clone()))
            .collect();
        sorted(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str, start_secs: u64) -> TraceSearchMetadata {
        TraceSearchMetadata {
            trace_id: id.to_string(),
            root_service_name: String::new(),
            root_trace_name: String::new(),
            start_time_unix_nano: start_secs * 1_000_000_000,
            duration_ms: 1000,
            matched_spans: 1,
        }
    }

    #[test]
    fn test_limit_without_most_recent() {
        let mut c = MetadataCombiner::new(2, false);
        c.add_metadata(meta("a", 10));
        assert!(!c.is_complete_for(TIMESTAMP_NEVER));
        c.add_metadata(meta("b", 20));
        c.add_metadata(meta("c", 30));

        assert!(c.is_complete_for(TIMESTAMP_NEVER));
        assert!(c.should_quit());
        let ids: Vec<String> = c.finalize().into_iter().map(|m| m.trace_id).collect();
        assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_most_recent_replaces_oldest() {
        let mut c = MetadataCombiner::new(2, true);
        c.add_metadata(meta("a", 10));
        c.add_metadata(meta("b", 20));
        c.add_metadata(meta("c", 30));
        c.add_metadata(meta("d", 5));

        let ids: Vec<String> = c.finalize().into_iter().map(|m| m.trace_id).collect();
        assert_eq!(ids, vec!["c".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_most_recent_completeness_boundary() {
        let mut c = MetadataCombiner::new(2, true);
        c.add_metadata(meta("a", 100));
        assert!(!c.is_complete_for(50));
        c.add_metadata(meta("b", 200));

        // nothing ending before second 100 can beat the oldest kept trace
        assert!(c.is_complete_for(50));
        assert!(c.is_complete_for(99));
        assert!(!c.is_complete_for(100));
        assert!(!c.is_complete_for(TIMESTAMP_NEVER));
        assert!(!c.should_quit());

        // the oldest only moves forward, so completeness is never lost
        c.add_metadata(meta("c", 300));
        assert!(c.is_complete_for(99));
        assert!(c.is_complete_for(150));
    }

    #[test]
    fn test_earlier_duplicate_keeps_completeness() {
        let mut c = MetadataCombiner::new(2, true);
        c.add_metadata(meta("a", 100));
        c.add_metadata(meta("b", 200));
        assert!(c.is_complete_for(99));

        // same trace found in another segment with an earlier span
        c.add_metadata(meta("a", 50));
        assert!(c.is_complete_for(99));
        assert_eq!(c.oldest_start_nanos(), Some(100_000_000_000));

        // a trace older than every eviction key is still rejected
        c.add_metadata(meta("c", 90));
        let got = c.finalize();
        let ids: Vec<&str> = got.iter().map(|m| m.trace_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(got[1].start_time_unix_nano, 50_000_000_000);
    }

    #[test]
    fn test_same_trace_is_combined() {
        let mut c = MetadataCombiner::new(10, false);
        let mut first = meta("a", 10);
        first.root_service_name = "svc".into();
        c.add_metadata(first);
        c.add_metadata(meta("a", 12));

        let got = c.finalize();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].matched_spans, 2);
        assert_eq!(got[0].start_time_unix_nano, 10_000_000_000);
        assert_eq!(got[0].duration_ms, 3000);
        assert_eq!(got[0].root_service_name, "svc");
    }

    #[test]
    fn test_diff_reports_changes_once() {
        let mut c = MetadataCombiner::new(0, false);
        c.add_metadata(meta("a", 1));
        assert_eq!(c.diff().len(), 1);
        assert!(c.diff().is_empty());
        c.add_metadata(meta("a", 1));
        c.add_metadata(meta("b", 2));
        assert_eq!(c.diff().len(), 2);
        assert!(!c.is_complete_for(TIMESTAMP_NEVER));
    }
}
