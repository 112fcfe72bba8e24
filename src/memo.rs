//! Caller-owned memo cells.
//!
//! The engine itself is stateless. A host that re-renders often keeps a
//! [`Memo`] per derived value and hands it the same `Arc`s while the inputs
//! are unchanged, so a rebuild only happens when an input is actually new.

use crate::config::{ChartType, TrendlineKind};
use std::sync::Arc;

/// Identity test for memo keys: reference identity for shared data, plain
/// equality for small copy values.
pub trait SameKey {
    fn same_key(&self, other: &Self) -> bool;
}

impl<T: ?Sized> SameKey for Arc<T> {
    fn same_key(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl SameKey for TrendlineKind {
    fn same_key(&self, other: &Self) -> bool {
        self == other
    }
}

impl SameKey for ChartType {
    fn same_key(&self, other: &Self) -> bool {
        self == other
    }
}

impl<A: SameKey, B: SameKey> SameKey for (A, B) {
    fn same_key(&self, other: &Self) -> bool {
        self.0.same_key(&other.0) && self.1.same_key(&other.1)
    }
}

impl<A: SameKey, B: SameKey, C: SameKey> SameKey for (A, B, C) {
    fn same_key(&self, other: &Self) -> bool {
        self.0.same_key(&other.0) && self.1.same_key(&other.1) && self.2.same_key(&other.2)
    }
}

/// Single-entry cache keyed by [`SameKey`].
#[derive(Debug)]
pub struct Memo<K, V> {
    entry: Option<(K, Arc<V>)>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self { entry: None }
    }
}

impl<K: SameKey, V> Memo<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `key`, computing and storing it on a miss.
    pub fn get_or_compute(&mut self, key: K, compute: impl FnOnce() -> V) -> Arc<V> {
        if let Some((cached_key, value)) = &self.entry {
            if cached_key.same_key(&key) {
                return Arc::clone(value);
            }
        }
        tracing::trace!("memo miss; recomputing");
        let value = Arc::new(compute());
        self.entry = Some((key, Arc::clone(&value)));
        value
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }

    pub fn is_cached(&self) -> bool {
        self.entry.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_same_arc_hits() {
        let rows = Arc::new(vec![1, 2, 3]);
        let calls = Cell::new(0);
        let mut memo: Memo<Arc<Vec<i32>>, i32> = Memo::new();

        let compute = || {
            calls.set(calls.get() + 1);
            rows.iter().sum::<i32>()
        };
        let first = memo.get_or_compute(Arc::clone(&rows), compute);
        let second = memo.get_or_compute(Arc::clone(&rows), || unreachable!());
        assert_eq!(*first, 6);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_equal_but_distinct_arc_misses() {
        let mut memo: Memo<Arc<Vec<i32>>, usize> = Memo::new();
        memo.get_or_compute(Arc::new(vec![1]), || 1);
        let value = memo.get_or_compute(Arc::new(vec![1]), || 2);
        assert_eq!(*value, 2);
    }

    #[test]
    fn test_tuple_keys() {
        let rows = Arc::new(String::from("rows"));
        let mut memo = Memo::new();
        memo.get_or_compute((Arc::clone(&rows), TrendlineKind::Linear), || 1);
        assert_eq!(*memo.get_or_compute((Arc::clone(&rows), TrendlineKind::Linear), || 2), 1);
        assert_eq!(*memo.get_or_compute((Arc::clone(&rows), TrendlineKind::Max), || 3), 3);

        memo.clear();
        assert!(!memo.is_cached());
    }
}
