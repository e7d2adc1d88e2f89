//! Ordered integer map: a hash mapping kept in lockstep with a vEB index.
//!
//! [`VebMap`] pairs a persistent hash map of entries with a [`VebTree`] over
//! the key set. Point lookups go to the hash side in expected constant time;
//! min/max, predecessor/successor and ordered iteration go to the index in
//! $O(\log \log u)$. The coupling invariant (the index's key set equals the
//! entry map's key set) is re-established by every operation here.
//!
//! Like the index, the map is persistent: mutators take `&self` and return a
//! new map that shares unchanged substructure with the input, so snapshots
//! are free and values can be handed across threads without locks.

use std::fmt;
use std::iter::FusedIterator;
use std::ops::Index;

use imbl::HashMap;

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::veb::{Keys, Universe, VebTree, DEFAULT_LOG_U};

/// Outcome of a [`VebMap::get_and_update`] callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update<V> {
    /// Store this value under the key.
    Put(V),
    /// Remove the key.
    Remove,
}

/// A persistent map from `u64` keys to values, ordered by a vEB index.
#[derive(Clone, PartialEq, Eq)]
pub struct VebMap<V> {
    index: VebTree,
    entries: HashMap<u64, V>,
}

impl<V> VebMap<V> {
    /// Create an empty map over the given universe.
    pub fn new(universe: Universe) -> Result<Self> {
        Ok(VebMap {
            index: VebTree::new(universe)?,
            entries: HashMap::new(),
        })
    }

    fn with_index(index: VebTree) -> Self {
        VebMap {
            index,
            entries: HashMap::new(),
        }
    }

    /// Number of entries. O(1).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return true if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The universe size $2^{\log u}$; keys must be strictly below it.
    pub fn capacity(&self) -> u64 {
        self.index.capacity()
    }

    /// The universe exponent.
    pub fn log_u(&self) -> u32 {
        self.index.log_u()
    }

    /// The vEB index over the key set.
    pub fn veb(&self) -> &VebTree {
        &self.index
    }

    /// Look up a key. Expected O(1); never consults the index.
    pub fn get(&self, key: u64) -> Option<&V> {
        self.entries.get(&key)
    }

    /// Look up a key, failing with [`Error::MissingKey`] when absent.
    pub fn try_get(&self, key: u64) -> Result<&V> {
        self.entries.get(&key).ok_or(Error::MissingKey(key))
    }

    /// Return true if `key` has an entry. Expected O(1).
    pub fn contains_key(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }

    /// The smallest key, if any. O(1).
    pub fn min_key(&self) -> Option<u64> {
        self.index.min()
    }

    /// The largest key, if any. O(1).
    pub fn max_key(&self) -> Option<u64> {
        self.index.max()
    }

    /// The smallest key strictly greater than `key`, ignoring values.
    pub fn successor_key(&self, key: u64) -> Option<u64> {
        self.index.successor(key)
    }

    /// The largest key strictly less than `key`, ignoring values.
    pub fn predecessor_key(&self, key: u64) -> Option<u64> {
        self.index.predecessor(key)
    }

    /// Ascending iterator over the keys.
    pub fn keys(&self) -> Keys<'_> {
        self.index.iter()
    }

    /// Ascending iterator over `(key, &value)` entries.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            map: self,
            next: self.index.min(),
        }
    }

    /// Iterator over the values in ascending key order.
    pub fn values(&self) -> Values<'_, V> {
        Values(self.iter())
    }
}

impl<V: Clone> VebMap<V> {
    /// Build a map by successive insertion. Later pairs win on duplicate
    /// keys; a key at or beyond the resolved capacity fails with
    /// [`Error::OutOfRange`].
    ///
    /// With [`Universe::Auto`] the universe is sized to the largest input key.
    pub fn from_entries<I>(pairs: I, universe: Universe) -> Result<Self>
    where
        I: IntoIterator<Item = (u64, V)>,
    {
        let pairs: Vec<(u64, V)> = pairs.into_iter().collect();
        let universe = match universe {
            Universe::Auto => match pairs.iter().map(|&(key, _)| key).max() {
                Some(m) => Universe::MaxKey(m),
                None => Universe::LogU(DEFAULT_LOG_U),
            },
            u => u,
        };
        let mut map = Self::new(universe)?;
        for (key, value) in pairs {
            map = map.insert(key, value)?;
        }
        Ok(map)
    }

    /// Return a map with `key` bound to `value`. The receiver is unchanged.
    ///
    /// Rebinding an existing key replaces its value; the index sees an
    /// idempotent insert. Fails with [`Error::OutOfRange`] when
    /// `key >= capacity` — the universe never grows implicitly (see
    /// [`VebMap::upgrade_capacity`]).
    #[must_use = "insert returns a new map; the receiver is unchanged"]
    pub fn insert(&self, key: u64, value: V) -> Result<Self> {
        let index = self.index.insert(key)?;
        let mut entries = self.entries.clone();
        entries.insert(key, value);
        Ok(VebMap { index, entries })
    }

    /// Insert every pair in turn, surfacing the first [`Error::OutOfRange`].
    pub fn insert_all<I>(&self, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u64, V)>,
    {
        let mut map = self.clone();
        for (key, value) in pairs {
            map = map.insert(key, value)?;
        }
        Ok(map)
    }

    /// Return a map without `key`. Removing an absent key returns an equal
    /// map; no error is raised. Capacity is preserved.
    #[must_use = "remove returns a new map; the receiver is unchanged"]
    pub fn remove(&self, key: u64) -> Self {
        if !self.entries.contains_key(&key) {
            return self.clone();
        }
        let mut entries = self.entries.clone();
        entries.remove(&key);
        VebMap {
            index: self.index.remove(key),
            entries,
        }
    }

    /// Fold [`VebMap::remove`] over `keys`.
    pub fn remove_all<I>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        keys.into_iter().fold(self.clone(), |map, key| map.remove(key))
    }

    /// Take the value under `key` out of the map: the value (if any) plus a
    /// map without the key.
    pub fn pop(&self, key: u64) -> (Option<V>, Self) {
        match self.entries.get(&key) {
            Some(value) => (Some(value.clone()), self.remove(key)),
            None => (None, self.clone()),
        }
    }

    /// Rebind an existing key; a map with an absent key is returned unchanged.
    pub fn replace(&self, key: u64, value: V) -> Self {
        if !self.entries.contains_key(&key) {
            return self.clone();
        }
        let mut entries = self.entries.clone();
        entries.insert(key, value);
        VebMap {
            index: self.index.clone(),
            entries,
        }
    }

    /// Rebind an existing key, failing with [`Error::MissingKey`] when absent.
    pub fn try_replace(&self, key: u64, value: V) -> Result<Self> {
        if !self.entries.contains_key(&key) {
            return Err(Error::MissingKey(key));
        }
        Ok(self.replace(key, value))
    }

    /// Apply `f` to the current value under `key`, or insert `default` when
    /// the key is absent (which may fail with [`Error::OutOfRange`]).
    pub fn update<F>(&self, key: u64, default: V, f: F) -> Result<Self>
    where
        F: FnOnce(&V) -> V,
    {
        match self.entries.get(&key) {
            Some(value) => Ok(self.replace(key, f(value))),
            None => self.insert(key, default),
        }
    }

    /// Apply `f` to the value under `key`, failing with
    /// [`Error::MissingKey`] when absent.
    pub fn try_update<F>(&self, key: u64, f: F) -> Result<Self>
    where
        F: FnOnce(&V) -> V,
    {
        let value = self.entries.get(&key).ok_or(Error::MissingKey(key))?;
        Ok(self.replace(key, f(value)))
    }

    /// Read the current value under `key` and decide its fate in one step.
    ///
    /// Returns the previous value (if any) and the updated map.
    /// [`Update::Put`] on a fresh key can fail with [`Error::OutOfRange`];
    /// [`Update::Remove`] on an absent key is a no-op.
    pub fn get_and_update<F>(&self, key: u64, f: F) -> Result<(Option<V>, Self)>
    where
        F: FnOnce(Option<&V>) -> Update<V>,
    {
        let previous = self.entries.get(&key).cloned();
        let next = match f(self.entries.get(&key)) {
            Update::Put(value) => self.insert(key, value)?,
            Update::Remove => self.remove(key),
        };
        Ok((previous, next))
    }

    /// Union of two maps; `other`'s values win on conflicting keys.
    ///
    /// The result's universe is the larger of the two: the index starts from
    /// the wider side and absorbs the other's keys.
    pub fn merge(&self, other: &Self) -> Self {
        self.merge_with(other, |_key, _ours, theirs| theirs.clone())
    }

    /// Union of two maps with a caller-supplied conflict resolver, called as
    /// `resolve(key, &self_value, &other_value)` for keys present in both.
    pub fn merge_with<F>(&self, other: &Self, mut resolve: F) -> Self
    where
        F: FnMut(u64, &V, &V) -> V,
    {
        let (mut index, absorbed) = if other.log_u() > self.log_u() {
            (other.index.clone(), &self.index)
        } else {
            (self.index.clone(), &other.index)
        };
        for key in absorbed.iter() {
            // The absorbed side's universe is no larger, so the key fits.
            index = index.insert_in_range(key);
        }
        let mut entries = self.entries.clone();
        for (key, theirs) in other.entries.iter() {
            let merged = match entries.get(key) {
                Some(ours) => resolve(*key, ours, theirs),
                None => theirs.clone(),
            };
            entries.insert(*key, merged);
        }
        VebMap { index, entries }
    }

    /// Entries of this map whose keys appear in `keys`. The result keeps the
    /// parent's universe.
    pub fn take<I>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        let mut taken = Self::with_index(VebTree::empty(self.log_u()));
        for key in keys {
            if let Some(value) = self.entries.get(&key) {
                taken.index = taken.index.insert_in_range(key);
                taken.entries.insert(key, value.clone());
            }
        }
        taken
    }

    /// Partition into (entries whose keys appear in `keys`, the rest). Both
    /// halves keep the parent's universe.
    pub fn split<I>(&self, keys: I) -> (Self, Self)
    where
        I: IntoIterator<Item = u64>,
    {
        let keys: Vec<u64> = keys.into_iter().collect();
        let taken = self.take(keys.iter().copied());
        (taken, self.remove_all(keys))
    }

    /// Contiguous ordered sub-map: skip the first `start` keys in ascending
    /// order, keep up to `count`. The result keeps the parent's universe.
    pub fn slice(&self, start: usize, count: usize) -> Self {
        let mut sliced = Self::with_index(VebTree::empty(self.log_u()));
        for (key, value) in self.iter().skip(start).take(count) {
            sliced.index = sliced.index.insert_in_range(key);
            sliced.entries.insert(key, value.clone());
        }
        sliced
    }

    /// Rebuild the index over a universe sized for `new_limit` (the largest
    /// key it must admit). Entries are untouched; only the index grows.
    ///
    /// Fails with [`Error::CapacityShrink`] when the new universe would be
    /// smaller than the current one.
    pub fn upgrade_capacity(&self, new_limit: u64) -> Result<Self> {
        let log_u = Universe::MaxKey(new_limit).resolve()?;
        if log_u < self.log_u() {
            return Err(Error::CapacityShrink {
                current: self.capacity(),
                requested: 1u64 << log_u,
            });
        }
        let mut index = VebTree::empty(log_u);
        for key in self.index.iter() {
            index = index.insert_in_range(key);
        }
        Ok(VebMap {
            index,
            entries: self.entries.clone(),
        })
    }

    /// Owning cursor over the entries in ascending key order; see [`Cursor`].
    pub fn cursor(&self) -> Cursor<V> {
        Cursor::new(self.clone())
    }
}

impl<V> Default for VebMap<V> {
    fn default() -> Self {
        Self::with_index(VebTree::empty(DEFAULT_LOG_U))
    }
}

impl<V> fmt::Debug for VebMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VebMap")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

impl<V: fmt::Display> fmt::Display for VebMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vebmap[capacity={}, elements=[", self.capacity())?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({key}, {value})")?;
        }
        write!(f, "]]")
    }
}

impl<V> Index<u64> for VebMap<V> {
    type Output = V;

    /// Indexed access by key, following the `std::collections` convention:
    /// panics when the key is absent. [`VebMap::get`] is the total form.
    fn index(&self, key: u64) -> &V {
        self.entries.get(&key).expect("no entry found for key")
    }
}

impl<V: Clone> FromIterator<(u64, V)> for VebMap<V> {
    /// Collect pairs into a map over an automatically sized universe.
    ///
    /// # Panics
    ///
    /// Panics when a key is at or above $2^{63}$, the largest supported
    /// universe; use [`VebMap::from_entries`] to handle that as an error.
    fn from_iter<I: IntoIterator<Item = (u64, V)>>(iter: I) -> Self {
        Self::from_entries(iter, Universe::Auto)
            .expect("auto-sized universe admits every collected key")
    }
}

impl<'a, V> IntoIterator for &'a VebMap<V> {
    type Item = (u64, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Iter<'a, V> {
        self.iter()
    }
}

/// Ascending entry iterator over a [`VebMap`]; see [`VebMap::iter`].
///
/// The state is the map plus the next key to yield; each step is one
/// successor query, so the iterator can be paused and resumed freely.
pub struct Iter<'a, V> {
    map: &'a VebMap<V>,
    next: Option<u64>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (u64, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.next?;
        self.next = self.map.index.successor(key);
        let value = self
            .map
            .entries
            .get(&key)
            .expect("index and entries stay coupled");
        Some((key, value))
    }
}

impl<V> FusedIterator for Iter<'_, V> {}

/// Iterator over a [`VebMap`]'s values in ascending key order.
pub struct Values<'a, V>(Iter<'a, V>);

impl<'a, V> Iterator for Values<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.0.next().map(|(_, value)| value)
    }
}

impl<V> FusedIterator for Values<'_, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters() -> VebMap<char> {
        VebMap::from_entries([(5, 'a'), (1, 'b'), (9, 'c')], Universe::LogU(4)).unwrap()
    }

    #[test]
    fn test_basic_roundtrip() {
        let m = letters();
        assert_eq!(m.len(), 3);
        assert_eq!(m.capacity(), 16);
        assert_eq!(m.get(5), Some(&'a'));
        assert_eq!(m.get(2), None);
        assert!(m.contains_key(1));
        assert!(!m.contains_key(0));

        let m = m.remove(5);
        assert_eq!(m.len(), 2);
        assert_eq!(m.get(5), None);
        assert_eq!(m.capacity(), 16);
    }

    #[test]
    fn test_ordered_queries() {
        let m = letters();
        assert_eq!(m.min_key(), Some(1));
        assert_eq!(m.max_key(), Some(9));
        assert_eq!(m.predecessor_key(5), Some(1));
        assert_eq!(m.successor_key(5), Some(9));
        assert_eq!(m.successor_key(9), None);
        assert_eq!(m.predecessor_key(1), None);

        let entries: Vec<(u64, char)> = m.iter().map(|(k, v)| (k, *v)).collect();
        assert_eq!(entries, vec![(1, 'b'), (5, 'a'), (9, 'c')]);
        assert_eq!(m.keys().collect::<Vec<_>>(), vec![1, 5, 9]);
        assert_eq!(m.values().copied().collect::<Vec<_>>(), vec!['b', 'a', 'c']);
    }

    #[test]
    fn test_insert_out_of_range_leaves_map_usable() {
        let m = letters();
        let err = m.insert(16, 'z').unwrap_err();
        assert_eq!(
            err,
            Error::OutOfRange {
                key: 16,
                capacity: 16
            }
        );
        assert_eq!(m.len(), 3);
        assert_eq!(m.insert(15, 'z').unwrap().len(), 4);
    }

    #[test]
    fn test_rebind_updates_value_only() {
        let m = letters();
        let m2 = m.insert(5, 'z').unwrap();
        assert_eq!(m2.len(), 3);
        assert_eq!(m2.get(5), Some(&'z'));
        assert_eq!(m.get(5), Some(&'a'));
        assert_eq!(m2.keys().collect::<Vec<_>>(), vec![1, 5, 9]);
    }

    #[test]
    fn test_pop_and_remove_all() {
        let m = letters();
        let (value, rest) = m.pop(5);
        assert_eq!(value, Some('a'));
        assert!(!rest.contains_key(5));

        let (value, same) = m.pop(3);
        assert_eq!(value, None);
        assert_eq!(same, m);

        let rest = m.remove_all([1, 9, 12]);
        assert_eq!(rest.keys().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn test_replace_and_update() {
        let m = letters();
        assert_eq!(m.replace(5, 'z').get(5), Some(&'z'));
        assert_eq!(m.replace(3, 'z'), m);
        assert_eq!(m.try_replace(3, 'z').unwrap_err(), Error::MissingKey(3));

        let m2 = m.update(5, 'd', |v| v.to_ascii_uppercase()).unwrap();
        assert_eq!(m2.get(5), Some(&'A'));
        let m3 = m.update(3, 'd', |v| v.to_ascii_uppercase()).unwrap();
        assert_eq!(m3.get(3), Some(&'d'));
        assert_eq!(m.try_update(3, |v| *v).unwrap_err(), Error::MissingKey(3));
    }

    #[test]
    fn test_get_and_update() {
        let m = VebMap::from_entries([(2u64, 10u32)], Universe::LogU(4)).unwrap();

        let (prev, m2) = m
            .get_and_update(2, |v| Update::Put(v.copied().unwrap_or(0) + 1))
            .unwrap();
        assert_eq!(prev, Some(10));
        assert_eq!(m2.get(2), Some(&11));

        let (prev, m3) = m2.get_and_update(2, |_| Update::Remove).unwrap();
        assert_eq!(prev, Some(11));
        assert!(!m3.contains_key(2));

        let (prev, m4) = m3
            .get_and_update(7, |v| {
                assert!(v.is_none());
                Update::Put(1)
            })
            .unwrap();
        assert_eq!(prev, None);
        assert_eq!(m4.get(7), Some(&1));

        let err = m4.get_and_update(99, |_| Update::Put(5)).unwrap_err();
        assert_eq!(
            err,
            Error::OutOfRange {
                key: 99,
                capacity: 16
            }
        );
    }

    #[test]
    fn test_merge_prefers_other_side() {
        let a = VebMap::from_entries([(1u64, "a1"), (3, "a3")], Universe::LogU(3)).unwrap();
        let b = VebMap::from_entries([(3u64, "b3"), (40, "b40")], Universe::LogU(6)).unwrap();

        let merged = a.merge(&b);
        assert_eq!(merged.capacity(), 64);
        assert_eq!(merged.get(1), Some(&"a1"));
        assert_eq!(merged.get(3), Some(&"b3"));
        assert_eq!(merged.get(40), Some(&"b40"));
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec![1, 3, 40]);

        // The wider map may also be on the left.
        let merged = b.merge(&a);
        assert_eq!(merged.capacity(), 64);
        assert_eq!(merged.get(3), Some(&"a3"));
    }

    #[test]
    fn test_merge_identities() {
        let m = letters();
        let empty = VebMap::new(Universe::LogU(4)).unwrap();
        assert_eq!(m.merge(&empty), m);
        assert_eq!(empty.merge(&m), m);
    }

    #[test]
    fn test_merge_with_resolver() {
        let a = VebMap::from_entries([(1u64, 10u32), (2, 20)], Universe::LogU(3)).unwrap();
        let b = VebMap::from_entries([(2u64, 5u32), (3, 30)], Universe::LogU(3)).unwrap();
        let merged = a.merge_with(&b, |_key, ours, theirs| ours + theirs);
        assert_eq!(merged.get(1), Some(&10));
        assert_eq!(merged.get(2), Some(&25));
        assert_eq!(merged.get(3), Some(&30));
    }

    #[test]
    fn test_split_and_take() {
        let m = letters();
        let (taken, rest) = m.split([1, 9, 13]);
        assert_eq!(taken.keys().collect::<Vec<_>>(), vec![1, 9]);
        assert_eq!(rest.keys().collect::<Vec<_>>(), vec![5]);
        assert_eq!(taken.capacity(), m.capacity());
        assert_eq!(rest.capacity(), m.capacity());

        let taken = m.take([5, 6]);
        assert_eq!(taken.keys().collect::<Vec<_>>(), vec![5]);
        assert_eq!(taken.get(5), Some(&'a'));
    }

    #[test]
    fn test_slice_is_an_ordered_window() {
        let m = VebMap::from_entries(
            [(2u64, 20u32), (4, 40), (6, 60), (8, 80)],
            Universe::LogU(4),
        )
        .unwrap();
        let window = m.slice(1, 2);
        assert_eq!(window.keys().collect::<Vec<_>>(), vec![4, 6]);
        assert_eq!(window.get(4), Some(&40));
        assert_eq!(window.capacity(), 16);

        assert!(m.slice(4, 10).is_empty());
        assert_eq!(m.slice(0, 0).len(), 0);
    }

    #[test]
    fn test_upgrade_capacity() {
        let m = VebMap::from_entries([(1u64, 'x')], Universe::LogU(3)).unwrap();
        assert!(m.insert(8, 'y').is_err());

        let up = m.upgrade_capacity(100).unwrap();
        assert_eq!(up.capacity(), 128);
        assert_eq!(up.get(1), Some(&'x'));
        assert!(up.insert(8, 'y').is_ok());

        let err = up.upgrade_capacity(3).unwrap_err();
        assert_eq!(
            err,
            Error::CapacityShrink {
                current: 128,
                requested: 4
            }
        );
        // Equal capacity is not a shrink.
        assert_eq!(up.upgrade_capacity(100).unwrap().capacity(), 128);
    }

    #[test]
    fn test_display_rendering() {
        let m = letters();
        assert_eq!(
            m.to_string(),
            "Vebmap[capacity=16, elements=[(1, b), (5, a), (9, c)]]"
        );
        let empty: VebMap<char> = VebMap::new(Universe::LogU(2)).unwrap();
        assert_eq!(empty.to_string(), "Vebmap[capacity=4, elements=[]]");
    }

    #[test]
    fn test_indexed_access() {
        let m = letters();
        assert_eq!(m[5], 'a');
    }

    #[test]
    #[should_panic(expected = "no entry found for key")]
    fn test_indexed_access_panics_on_absent_key() {
        let _ = letters()[2];
    }

    #[test]
    fn test_from_iterator_sizes_automatically() {
        let m: VebMap<u32> = [(300u64, 3u32), (7, 7)].into_iter().collect();
        assert_eq!(m.capacity(), 512);
        assert_eq!(m.keys().collect::<Vec<_>>(), vec![7, 300]);

        let empty: VebMap<u32> = std::iter::empty().collect();
        assert_eq!(empty.log_u(), DEFAULT_LOG_U);
    }

    #[test]
    fn test_equality_includes_capacity() {
        let a = VebMap::from_entries([(1u64, 'x')], Universe::LogU(3)).unwrap();
        let b = VebMap::from_entries([(1u64, 'x')], Universe::LogU(3)).unwrap();
        let wider = VebMap::from_entries([(1u64, 'x')], Universe::LogU(4)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, wider);
    }
}
