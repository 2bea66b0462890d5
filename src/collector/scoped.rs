use std::collections::{BTreeMap, HashSet};
use parking_lot::Mutex;
use crate::collector::distinct_value::StopReason;

#[derive(Default)]
struct ScopeBucket {
    seen: HashSet<String>,
    values: Vec<String>,
    full: bool,
}

struct ScopedState {
    buckets: BTreeMap<String, ScopeBucket>,
    size: usize,
    stale_count: usize,
    stop_reason: StopReason,
}

/// Distinct tag names grouped by scope.
///
/// The byte budget and staleness threshold are shared by all scopes, the
/// cardinality cap applies per scope. The collector counts as exceeded when the
/// shared budget ran out or when every known scope is full.
pub struct ScopedDistinctString {
    state: Mutex<ScopedState>,
    max_bytes: usize,
    max_per_scope: usize,
    max_stale_values: usize,
}

impl ScopedDistinctString {
    pub fn new(max_bytes: usize, max_per_scope: usize, max_stale_values: usize) -> Self {
        ScopedDistinctString {
            state: Mutex::new(ScopedState {
                buckets: BTreeMap::new(),
                size: 0,
                stale_count: 0,
                stop_reason: StopReason::None,
            }),
            max_bytes,
            max_per_scope,
            max_stale_values,
        }
    }

    /// Returns true once the whole collector stopped.
    pub fn collect(&self, scope: &str, value: &str) -> bool {
        let mut state = self.state.lock();
        if state.stop_reason != StopReason::None {
            return true;
        }

        let duplicate = state
            .buckets
            .get(scope)
            .is_some_and(|b| b.seen.contains(value));
        if duplicate {
            state.stale_count += 1;
            if self.max_stale_values > 0 && state.stale_count > self.max_stale_values {
                state.stop_reason = StopReason::StalenessExceeded;
                return true;
            }
            return false;
        }

        if self.max_bytes > 0 && state.size + value.len() > self.max_bytes {
            state.stop_reason = StopReason::SizeExceeded;
            return true;
        }

        let max_per_scope = self.max_per_scope;
        let bucket = state.buckets.entry(scope.to_string()).or_default();
        if max_per_scope > 0 && bucket.values.len() >= max_per_scope {
            bucket.full = true;
            let all_full = state.buckets.values().all(|b| b.full);
            if all_full {
                state.stop_reason = StopReason::CountExceeded;
            }
            return all_full;
        }

        bucket.seen.insert(value.to_string());
        bucket.values.push(value.to_string());
        state.size += value.len();
        state.stale_count = 0;
        false
    }

    pub fn exceeded(&self) -> bool {
        self.state.lock().stop_reason != StopReason::None
    }

    pub fn stop_reason(&self) -> StopReason {
        self.state.lock().stop_reason
    }

    /// Collected names per scope, scopes in name order
    pub fn strings(&self) -> BTreeMap<String, Vec<String>> {
        self.state
            .lock()
            .buckets
            .iter()
            .filter(|(_, b)| !b.values.is_empty())
            .map(|(scope, b)| (scope.clone(), b.values.clone()))
            .collect()
    }

    pub fn size(&self) -> usize {
        self.state.lock().size
    }
}
