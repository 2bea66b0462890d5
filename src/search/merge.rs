use parking_lot::Mutex;
use crate::core::error::Result;

/// Boundary that no segment can reach; "complete for" it means complete for good.
pub const TIMESTAMP_NEVER: u32 = u32::MAX;

/// Bounded merge of partial results arriving in any order.
///
/// Used both for per-segment results inside an instance and for whole
/// responses from independent shards. `add` must be order-insensitive.
pub trait StreamingMerge {
    type Item;
    type Output;

    fn add(&mut self, item: Self::Item) -> Result<()>;

    /// True once nothing ending at or before `boundary` (unix seconds) can
    /// change the outcome. Stays true as more items are added.
    fn is_complete_for(&self, boundary: u32) -> bool;

    /// No further input can change the outcome
    fn should_quit(&self) -> bool {
        self.is_complete_for(TIMESTAMP_NEVER)
    }

    fn finalize(&self) -> Self::Output;

    /// Results that changed since the previous diff
    fn diff(&mut self) -> Self::Output;
}

/// A merge shared between concurrent tasks
pub struct SharedMerge<M> {
    inner: Mutex<M>,
}

impl<M: StreamingMerge> SharedMerge<M> {
    pub fn new(merge: M) -> Self {
        SharedMerge { inner: Mutex::new(merge) }
    }

    /// Add one item; returns whether the merge should quit afterwards.
    pub fn add(&self, item: M::Item) -> Result<bool> {
        let mut merge = self.inner.lock();
        merge.add(item)?;
        Ok(merge.should_quit())
    }

    pub fn is_complete_for(&self, boundary: u32) -> bool {
        self.inner.lock().is_complete_for(boundary)
    }

    pub fn should_quit(&self) -> bool {
        self.inner.lock().should_quit()
    }

    pub fn finalize(&self) -> M::Output {
        self.inner.lock().finalize()
    }

    pub fn diff(&self) -> M::Output {
        self.inner.lock().diff()
    }

    pub fn into_inner(self) -> M {
        self.inner.into_inner()
    }
}

/// Feed partial results until the merge quits. Items left in `items` are
/// never pulled, so a lazy source can stop outstanding work.
pub fn merge_all<M, I>(merge: &mut M, items: I) -> Result<M::Output>
where
    M: StreamingMerge,
    I: IntoIterator<Item = M::Item>,
{
    for item in items {
        merge.add(item)?;
        if merge.should_quit() {
            break;
        }
    }
    Ok(merge.finalize())
}
