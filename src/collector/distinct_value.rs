use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use parking_lot::Mutex;

/// Why a collector stopped accepting values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    #[default]
    None,
    SizeExceeded,
    CountExceeded,
    StalenessExceeded,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            StopReason::None => "none",
            StopReason::SizeExceeded => "max size exceeded",
            StopReason::CountExceeded => "max values exceeded",
            StopReason::StalenessExceeded => "max stale values exceeded",
        };
        f.write_str(s)
    }
}

pub type SizeFn<T> = Box<dyn Fn(&T) -> usize + Send + Sync>;

struct DistinctState<T> {
    seen: HashSet<T>,
    values: Vec<T>,       // discovery order
    diff_cursor: usize,   // values[..diff_cursor] already handed out by diff()
    size: usize,
    stale_count: usize,
    stop_reason: StopReason,
}

/// Bounded set of distinct values with a byte budget, a cardinality cap and a
/// staleness threshold. Limits of 0 are unlimited.
///
/// Safe to share between threads; every call takes a short internal lock.
pub struct DistinctValue<T> {
    state: Mutex<DistinctState<T>>,
    max_bytes: usize,
    max_values: usize,
    max_stale_values: usize,
    size_fn: SizeFn<T>,
}

impl<T: Clone + Eq + Hash> DistinctValue<T> {
    pub fn new(
        max_bytes: usize,
        max_values: usize,
        max_stale_values: usize,
        size_fn: impl Fn(&T) -> usize + Send + Sync + 'static,
    ) -> Self {
        DistinctValue {
            state: Mutex::new(DistinctState {
                seen: HashSet::new(),
                values: Vec::new(),
                diff_cursor: 0,
                size: 0,
                stale_count: 0,
                stop_reason: StopReason::None,
            }),
            max_bytes,
            max_values,
            max_stale_values,
            size_fn: Box::new(size_fn),
        }
    }

    /// Adds a value. Returns true once the collector stopped and the caller
    /// should stop feeding it.
    pub fn collect(&self, value: T) -> bool {
        let mut state = self.state.lock();
        if state.stop_reason != StopReason::None {
            return true;
        }

        if state.seen.contains(&value) {
            state.stale_count += 1;
            if self.max_stale_values > 0 && state.stale_count > self.max_stale_values {
                state.stop_reason = StopReason::StalenessExceeded;
                return true;
            }
            return false;
        }

        let len = (self.size_fn)(&value);
        if self.max_bytes > 0 && state.size + len > self.max_bytes {
            state.stop_reason = StopReason::SizeExceeded;
            return true;
        }
        if self.max_values > 0 && state.values.len() >= self.max_values {
            state.stop_reason = StopReason::CountExceeded;
            return true;
        }

        state.stale_count = 0;
        state.size += len;
        state.seen.insert(value.clone());
        state.values.push(value);
        false
    }

    pub fn exceeded(&self) -> bool {
        self.state.lock().stop_reason != StopReason::None
    }

    pub fn stop_reason(&self) -> StopReason {
        self.state.lock().stop_reason
    }

    /// Collected values in discovery order
    pub fn values(&self) -> Vec<T> {
        self.state.lock().values.clone()
    }

    /// Values collected since the previous call
    pub fn diff(&self) -> Vec<T> {
        let mut state = self.state.lock();
        let fresh = state.values[state.diff_cursor..].to_vec();
        state.diff_cursor = state.values.len();
        fresh
    }

    pub fn size(&self) -> usize {
        self.state.lock().size
    }

    pub fn len(&self) -> usize {
        self.state.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Distinct strings weighted by their byte length
pub struct DistinctString {
    inner: DistinctValue<String>,
}

impl DistinctString {
    pub fn new(max_bytes: usize, max_values: usize, max_stale_values: usize) -> Self {
        DistinctString {
            inner: DistinctValue::new(max_bytes, max_values, max_stale_values, |s: &String| s.len()),
        }
    }

    pub fn collect(&self, value: impl Into<String>) -> bool {
        self.inner.collect(value.into())
    }

    pub fn exceeded(&self) -> bool {
        self.inner.exceeded()
    }

    pub fn stop_reason(&self) -> StopReason {
        self.inner.stop_reason()
    }

    pub fn strings(&self) -> Vec<String> {
        self.inner.values()
    }

    pub fn diff(&self) -> Vec<String> {
        self.inner.diff()
    }

    pub fn size(&self) -> usize {
        self.inner.size()
    }
}
