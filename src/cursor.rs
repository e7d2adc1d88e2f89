//! Suspendable enumeration over a [`VebMap`].
//!
//! A [`Cursor`] is the explicit-object rendering of a resumable reduction:
//! its whole state is a map value plus the next key to visit. Each
//! [`Cursor::advance`] yields one entry and steps the key forward via the
//! index's successor query (continue); holding the cursor suspends the walk
//! indefinitely (the map value is immutable, so resumption is deterministic
//! no matter what derived versions exist in the meantime); dropping it halts
//! the walk and releases the reference. No threads or generators involved.

use std::iter::FusedIterator;

use crate::map::VebMap;

/// An owning cursor over a [`VebMap`]'s entries in ascending key order.
///
/// Holds its own (cheap) handle to the map, so it has no borrow tying it to
/// the place it was created.
pub struct Cursor<V> {
    map: VebMap<V>,
    next: Option<u64>,
}

impl<V: Clone> Cursor<V> {
    pub(crate) fn new(map: VebMap<V>) -> Self {
        let next = map.min_key();
        Cursor { map, next }
    }

    /// Yield the next entry and move forward, or report exhaustion.
    pub fn advance(&mut self) -> Option<(u64, V)> {
        let key = self.next?;
        self.next = self.map.successor_key(key);
        let value = self
            .map
            .get(key)
            .cloned()
            .expect("index and entries stay coupled");
        Some((key, value))
    }

    /// The key the next [`Cursor::advance`] will yield, if any.
    pub fn peek_key(&self) -> Option<u64> {
        self.next
    }

    /// Return true if the walk is exhausted.
    pub fn is_done(&self) -> bool {
        self.next.is_none()
    }
}

impl<V: Clone> Iterator for Cursor<V> {
    type Item = (u64, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}

impl<V: Clone> FusedIterator for Cursor<V> {}

impl<V: Clone> IntoIterator for VebMap<V> {
    type Item = (u64, V);
    type IntoIter = Cursor<V>;

    fn into_iter(self) -> Cursor<V> {
        Cursor::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::veb::Universe;

    fn sample() -> VebMap<&'static str> {
        VebMap::from_entries(
            [(4, "four"), (1, "one"), (11, "eleven")],
            Universe::LogU(4),
        )
        .unwrap()
    }

    #[test]
    fn test_advance_walks_in_key_order() {
        let mut cursor = sample().cursor();
        assert_eq!(cursor.peek_key(), Some(1));
        assert_eq!(cursor.advance(), Some((1, "one")));
        assert_eq!(cursor.advance(), Some((4, "four")));
        assert_eq!(cursor.advance(), Some((11, "eleven")));
        assert!(cursor.is_done());
        assert_eq!(cursor.advance(), None);
        assert_eq!(cursor.advance(), None);
    }

    #[test]
    fn test_suspended_cursor_ignores_derived_versions() {
        let map = sample();
        let mut cursor = map.cursor();
        assert_eq!(cursor.advance(), Some((1, "one")));

        // Derive new versions mid-walk; the suspended cursor still sees the
        // snapshot it was created from.
        let _bigger = map.insert(7, "seven").unwrap();
        let _smaller = map.remove(4);
        assert_eq!(cursor.advance(), Some((4, "four")));
        assert_eq!(cursor.advance(), Some((11, "eleven")));
        assert_eq!(cursor.advance(), None);
    }

    #[test]
    fn test_into_iterator_consumes_by_value() {
        let collected: Vec<(u64, &str)> = sample().into_iter().collect();
        assert_eq!(collected, vec![(1, "one"), (4, "four"), (11, "eleven")]);
    }
}
