//! Array-backed sorted map used for every tick-indexed series.
//!
//! Decoders fill a [`FlatMap`] in a single forward pass, so the common insertion is
//! [`FlatMap::get_or_add_back`], an amortised O(1) append. Lookups are binary searches
//! over the backing vector.

use std::ops::{Index, IndexMut};

/// Initial capacity reserved on the first insertion.
pub const DEFAULT_CAPACITY: usize = 16;

/// An ordered sequence of `(key, value)` pairs, sorted ascending by key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlatMap<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> Default for FlatMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FlatMap<K, V> {
    /// Creates an empty map without allocating.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Creates an empty map with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current capacity of the backing storage.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Releases unused capacity.
    pub fn shrink_to_fit(&mut self) {
        self.entries.shrink_to_fit();
    }

    /// Removes every entry, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The entry at `index`.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<(&K, &V)> {
        self.entries.get(index).map(|(key, value)| (key, value))
    }

    /// The entry at `index`, with a mutable value.
    pub fn at_mut(&mut self, index: usize) -> Option<(&K, &mut V)> {
        self.entries.get_mut(index).map(|(key, value)| (&*key, value))
    }

    /// The first entry.
    #[must_use]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.at(0)
    }

    /// The last entry.
    #[must_use]
    pub fn last(&self) -> Option<(&K, &V)> {
        self.entries.last().map(|(key, value)| (key, value))
    }

    /// The last entry, with a mutable value.
    pub fn last_mut(&mut self) -> Option<(&K, &mut V)> {
        self.entries.last_mut().map(|(key, value)| (&*key, value))
    }

    /// Removes and returns the last entry.
    pub fn pop(&mut self) -> Option<(K, V)> {
        self.entries.pop()
    }

    /// Iterates in key order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &V)> + ExactSizeIterator {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    /// Iterates in key order with mutable values.
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = (&K, &mut V)> + ExactSizeIterator {
        self.entries.iter_mut().map(|(key, value)| (&*key, value))
    }

    /// Iterates over keys.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator {
        self.entries.iter().map(|(key, _)| key)
    }

    /// Iterates over values.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator {
        self.entries.iter().map(|(_, value)| value)
    }

    /// Iterates over values mutably.
    pub fn values_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut V> + ExactSizeIterator {
        self.entries.iter_mut().map(|(_, value)| value)
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &mut V) -> bool) {
        self.entries.retain_mut(|(key, value)| keep(key, value));
    }

    /// The entries as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[(K, V)] {
        &self.entries
    }

    fn reserve_for_push(&mut self) {
        if self.entries.capacity() == 0 {
            self.entries.reserve_exact(DEFAULT_CAPACITY);
        } else if self.entries.len() == self.entries.capacity() {
            self.entries.reserve_exact(self.entries.capacity());
        }
    }
}

impl<K: Ord, V> FlatMap<K, V> {
    /// Binary-searches `key` within `[from, len)`.
    ///
    /// Returns `Ok(index)` when found, or `Err(index)` with the position where `key` would
    /// be inserted to keep the map sorted.
    pub fn find(&self, from: usize, key: &K) -> Result<usize, usize> {
        let from = from.min(self.entries.len());
        self.entries
            .get(from..)
            .unwrap_or_default()
            .binary_search_by(|(candidate, _)| candidate.cmp(key))
            .map(|index| index + from)
            .map_err(|index| index + from)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(0, key).is_ok()
    }

    /// The value stored at `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        let index = self.find(0, key).ok()?;
        self.entries.get(index).map(|(_, value)| value)
    }

    /// The value stored at `key`, mutably.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.find(0, key).ok()?;
        self.entries.get_mut(index).map(|(_, value)| value)
    }

    /// Inserts or replaces the value at `key`, keeping the map sorted. Returns its index.
    pub fn insert(&mut self, key: K, value: V) -> usize {
        match self.find(0, &key) {
            Ok(index) => {
                if let Some(entry) = self.entries.get_mut(index) {
                    entry.1 = value;
                }
                index
            }
            Err(index) => {
                self.reserve_for_push();
                self.entries.insert(index, (key, value));
                index
            }
        }
    }

    /// Returns the value at `key`, inserting `make()` at the sorted position if absent.
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        let index = match self.find(0, &key) {
            Ok(index) => index,
            Err(index) => {
                self.reserve_for_push();
                self.entries.insert(index, (key, make()));
                index
            }
        };
        &mut self.entries[index].1
    }

    /// Appends `key` if it is greater than the last key, otherwise returns the last entry.
    ///
    /// Callers must feed non-decreasing keys. A key equal to the last one coalesces into
    /// that entry: repeated events at one tick share a single slot.
    pub fn get_or_add_back(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        let append = self.entries.last().is_none_or(|(last, _)| *last < key);
        if append {
            self.reserve_for_push();
            self.entries.push((key, make()));
        }
        let last = self.entries.len() - 1;
        &mut self.entries[last].1
    }

    /// Appends an entry without checking order.
    ///
    /// The caller guarantees `key` is strictly greater than the current last key.
    pub fn push_back(&mut self, key: K, value: V) {
        debug_assert!(self.entries.last().is_none_or(|(last, _)| *last < key));
        self.reserve_for_push();
        self.entries.push((key, value));
    }

    /// Scans backwards from the end for the last entry whose key is `<= key`.
    pub fn traverse_backwards_until(&self, key: &K) -> Option<usize> {
        self.entries.iter().rposition(|(candidate, _)| candidate <= key)
    }

    /// Index of the last entry whose key is `<= key`, found by binary search.
    pub fn lower_bound(&self, key: &K) -> Option<usize> {
        match self.find(0, key) {
            Ok(index) => Some(index),
            Err(0) => None,
            Err(index) => Some(index - 1),
        }
    }

    /// Removes the entry at `key`.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.find(0, key).ok()?;
        Some(self.entries.remove(index).1)
    }
}

impl<K, V> Index<usize> for FlatMap<K, V> {
    type Output = V;

    fn index(&self, index: usize) -> &Self::Output {
        &self.entries[index].1
    }
}

impl<K, V> IndexMut<usize> for FlatMap<K, V> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.entries[index].1
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for FlatMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut entries: Vec<(K, V)> = iter.into_iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries.dedup_by(|(later, _), (earlier, _)| later == earlier);
        Self { entries }
    }
}

impl<K, V> IntoIterator for FlatMap<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn find_reports_insertion_point() {
        let map: FlatMap<u64, char> = [(10, 'a'), (20, 'b'), (30, 'c')].into_iter().collect();
        assert_eq!(map.find(0, &20), Ok(1));
        assert_eq!(map.find(0, &25), Err(2));
        assert_eq!(map.find(0, &5), Err(0));
        assert_eq!(map.find(2, &10), Err(2));
        assert_eq!(map.find(5, &40), Err(3));
    }

    #[test]
    fn add_back_coalesces_same_key() {
        let mut map = FlatMap::new();
        *map.get_or_add_back(0u64, || 1) += 10;
        *map.get_or_add_back(0, || 100) += 10;
        *map.get_or_add_back(5, || 2) += 0;
        assert_eq!(map.as_slice(), &[(0, 21), (5, 2)]);
        assert_eq!(map.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn capacity_doubles() {
        let mut map = FlatMap::new();
        for key in 0..=DEFAULT_CAPACITY as u32 {
            map.push_back(key, ());
        }
        assert_eq!(map.capacity(), DEFAULT_CAPACITY * 2);
        map.shrink_to_fit();
        assert!(map.capacity() < DEFAULT_CAPACITY * 2);
    }

    #[test]
    fn backwards_traversal() {
        let map: FlatMap<u64, ()> = [(0, ()), (480, ()), (960, ())].into_iter().collect();
        assert_eq!(map.traverse_backwards_until(&700), Some(1));
        assert_eq!(map.traverse_backwards_until(&960), Some(2));
        assert_eq!(map.lower_bound(&700), Some(1));
        assert_eq!(map.lower_bound(&0), Some(0));
        let empty: FlatMap<u64, ()> = FlatMap::new();
        assert_eq!(empty.traverse_backwards_until(&0), None);
    }

    #[test]
    fn insert_keeps_order() {
        let mut map = FlatMap::new();
        map.insert(30u32, 'c');
        map.insert(10, 'a');
        map.insert(20, 'b');
        map.insert(10, 'z');
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![10, 20, 30]);
        assert_eq!(map.get(&10), Some(&'z'));
        assert_eq!(map.remove(&20), Some('b'));
        assert_eq!(map.len(), 2);
    }
}
