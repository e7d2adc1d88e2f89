//! Persistent van Emde Boas tree over a power-of-two integer universe.
//!
//! Maintains a set $S \subseteq [0, 2^{\log u})$ with insert, remove,
//! predecessor and successor in $O(\log \log u)$ time, and min/max in $O(1)$.
//!
//! # Shape
//!
//! A tree with exponent $\log u > 1$ splits every key into an upper half of
//! $\lceil \log u / 2 \rceil$ bits (the *cluster index*) and a lower half of
//! $\lfloor \log u / 2 \rfloor$ bits (the *offset*):
//!
//! ```text
//! x = (high << floor(log_u / 2)) | low
//! ```
//!
//! - `clusters` maps each occupied cluster index to a child tree over the
//!   lower-half universe. Empty clusters are never materialized.
//! - `summary` is a tree over the upper-half universe holding exactly the
//!   occupied cluster indices, so cross-cluster searches recurse once.
//! - The minimum is held only at top level, never inside a cluster. This is
//!   the invariant that keeps insertion at one non-trivial recursion per
//!   level: the first key entering a cluster lands in $O(1)$.
//! - The maximum is duplicated inside its cluster unless it equals the
//!   minimum.
//!
//! At $\log u \le 1$ the tree degenerates to the two-slot bitmap implicit in
//! `(min, max)`; no clusters, no summary.
//!
//! # Persistence
//!
//! Every mutator takes `&self` and returns a fresh tree. Children sit behind
//! `Arc` and the cluster map clones in $O(1)$, so a mutation copies only the
//! $O(\log \log u)$ nodes on its recursion path and shares the rest with the
//! input. The recursion is acyclic, so plain reference counting reclaims
//! everything.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use imbl::HashMap;

use crate::error::{Error, Result};

/// Largest supported universe exponent; keeps `capacity` representable in `u64`.
pub const MAX_LOG_U: u32 = 63;

/// Universe exponent chosen when [`Universe::Auto`] sizes an empty input.
pub const DEFAULT_LOG_U: u32 = 16;

/// How to size the key universe of a new tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Universe {
    /// The exponent itself: the universe is $[0, 2^n)$.
    LogU(u32),
    /// The total universe size, which must be a power of two.
    Size(u64),
    /// The largest key the universe must admit; the exponent is the smallest
    /// $n$ with $2^n >$ the given key, and at least 1.
    MaxKey(u64),
    /// Size from the largest key seen during construction, or
    /// [`DEFAULT_LOG_U`] when there are none.
    Auto,
}

impl Universe {
    /// Resolve to a concrete exponent. `Auto` resolves as if no keys were seen.
    pub(crate) fn resolve(self) -> Result<u32> {
        let log_u = match self {
            Universe::LogU(n) => n,
            Universe::Size(u) => {
                if !u.is_power_of_two() {
                    return Err(Error::InvalidUniverse(format!(
                        "universe size {u} is not a power of two"
                    )));
                }
                u.trailing_zeros()
            }
            Universe::MaxKey(m) => log_u_for_max(m),
            Universe::Auto => DEFAULT_LOG_U,
        };
        if log_u > MAX_LOG_U {
            return Err(Error::InvalidUniverse(format!(
                "universe exponent {log_u} exceeds the supported maximum {MAX_LOG_U}"
            )));
        }
        Ok(log_u)
    }
}

/// Smallest exponent whose universe admits `max_key`, at least 1.
fn log_u_for_max(max_key: u64) -> u32 {
    (64 - max_key.leading_zeros()).max(1)
}

/// A persistent van Emde Boas tree: an ordered set of `u64` keys.
#[derive(Clone, PartialEq, Eq)]
pub struct VebTree {
    log_u: u32,
    min: Option<u64>,
    max: Option<u64>,
    /// Occupied upper-half indices; `None` while no cluster exists.
    summary: Option<Arc<VebTree>>,
    /// Sparse children, keyed by upper-half index. Never holds an empty tree.
    clusters: HashMap<u64, Arc<VebTree>>,
}

impl fmt::Debug for VebTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VebTree")
            .field("log_u", &self.log_u)
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}

impl Default for VebTree {
    fn default() -> Self {
        Self::empty(DEFAULT_LOG_U)
    }
}

impl VebTree {
    /// Create an empty tree over the given universe.
    ///
    /// Only the root is allocated; summaries and clusters appear as keys do.
    pub fn new(universe: Universe) -> Result<Self> {
        Ok(Self::empty(universe.resolve()?))
    }

    pub(crate) fn empty(log_u: u32) -> Self {
        VebTree {
            log_u,
            min: None,
            max: None,
            summary: None,
            clusters: HashMap::new(),
        }
    }

    fn singleton(log_u: u32, key: u64) -> Self {
        let mut tree = Self::empty(log_u);
        tree.min = Some(key);
        tree.max = Some(key);
        tree
    }

    /// Build a tree by repeated insertion. Duplicates are idempotent; a key
    /// at or beyond the resolved capacity fails with [`Error::OutOfRange`].
    ///
    /// With [`Universe::Auto`] the universe is sized to the largest input key.
    pub fn from_keys<I>(keys: I, universe: Universe) -> Result<Self>
    where
        I: IntoIterator<Item = u64>,
    {
        let keys: Vec<u64> = keys.into_iter().collect();
        let universe = match universe {
            Universe::Auto => match keys.iter().copied().max() {
                Some(m) => Universe::MaxKey(m),
                None => Universe::LogU(DEFAULT_LOG_U),
            },
            u => u,
        };
        let mut tree = Self::new(universe)?;
        for key in keys {
            tree = tree.insert(key)?;
        }
        Ok(tree)
    }

    /// The universe exponent.
    pub fn log_u(&self) -> u32 {
        self.log_u
    }

    /// The universe size $2^{\log u}$.
    pub fn capacity(&self) -> u64 {
        1u64 << self.log_u
    }

    /// The smallest key in the set. O(1).
    pub fn min(&self) -> Option<u64> {
        self.min
    }

    /// The largest key in the set. O(1).
    pub fn max(&self) -> Option<u64> {
        self.max
    }

    /// Return true if the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.min.is_none()
    }

    /// Bits in a cluster offset (the lower half, floor).
    fn lower_bits(&self) -> u32 {
        self.log_u / 2
    }

    /// Bits in a cluster index (the upper half, ceil).
    fn upper_bits(&self) -> u32 {
        self.log_u - self.log_u / 2
    }

    fn high(&self, x: u64) -> u64 {
        x >> self.lower_bits()
    }

    fn low(&self, x: u64) -> u64 {
        x & ((1u64 << self.lower_bits()) - 1)
    }

    fn join(&self, high: u64, low: u64) -> u64 {
        (high << self.lower_bits()) | low
    }

    /// Return true if `key` is in the set. O(log log u).
    pub fn contains(&self, key: u64) -> bool {
        let (Some(min), Some(max)) = (self.min, self.max) else {
            return false;
        };
        if key == min || key == max {
            return true;
        }
        if key < min || key > max || self.log_u <= 1 {
            return false;
        }
        match self.clusters.get(&self.high(key)) {
            Some(child) => child.contains(self.low(key)),
            None => false,
        }
    }

    /// Return a tree whose set is $S \cup \{key\}$. The receiver is unchanged.
    ///
    /// Fails with [`Error::OutOfRange`] when `key >= capacity`; the universe
    /// never grows implicitly.
    #[must_use = "insert returns a new tree; the receiver is unchanged"]
    pub fn insert(&self, key: u64) -> Result<Self> {
        if key >= self.capacity() {
            return Err(Error::OutOfRange {
                key,
                capacity: self.capacity(),
            });
        }
        Ok(self.insert_in_range(key))
    }

    /// Insert a key already validated against the universe.
    pub(crate) fn insert_in_range(&self, mut key: u64) -> Self {
        let mut node = self.clone();
        let Some(min) = node.min else {
            node.min = Some(key);
            node.max = Some(key);
            return node;
        };
        if key == min {
            return node;
        }
        if key < min {
            // The new key takes the top slot; the old minimum is pushed down.
            node.min = Some(key);
            key = min;
        }
        if node.log_u > 1 {
            let high = node.high(key);
            let low = node.low(key);
            match node.clusters.get(&high).cloned() {
                Some(child) => {
                    let child = child.insert_in_range(low);
                    node.clusters.insert(high, Arc::new(child));
                }
                None => {
                    // First key in this cluster: O(1) child plus the one real
                    // recursion, into the summary.
                    node.clusters
                        .insert(high, Arc::new(Self::singleton(node.lower_bits(), low)));
                    let summary = match node.summary.take() {
                        Some(s) => s.insert_in_range(high),
                        None => Self::singleton(node.upper_bits(), high),
                    };
                    node.summary = Some(Arc::new(summary));
                }
            }
        }
        if node.max < Some(key) {
            node.max = Some(key);
        }
        node
    }

    /// Return a tree whose set is $S \setminus \{key\}$. Removing an absent
    /// key returns an equal tree; no error is raised.
    #[must_use = "remove returns a new tree; the receiver is unchanged"]
    pub fn remove(&self, key: u64) -> Self {
        let (Some(min), Some(max)) = (self.min, self.max) else {
            return self.clone();
        };
        if key < min || key > max {
            return self.clone();
        }
        if min == max {
            return if key == min {
                Self::empty(self.log_u)
            } else {
                self.clone()
            };
        }
        if self.log_u <= 1 {
            // Both of {0, 1} are present; drop one end.
            let mut node = self.clone();
            if key == 0 {
                node.min = Some(1);
            } else {
                node.max = Some(0);
            }
            return node;
        }

        let mut node = self.clone();
        let mut key = key;
        if key == min {
            // Promote the smallest clustered key to the top slot, then delete
            // it from its cluster below.
            let summary = node
                .summary
                .as_deref()
                .expect("multi-key tree has clustered keys");
            let high = summary.min.expect("summary is non-empty");
            let child = node
                .clusters
                .get(&high)
                .expect("summary tracks live clusters");
            key = node.join(high, child.min.expect("clusters are never empty"));
            node.min = Some(key);
        }

        let high = node.high(key);
        let low = node.low(key);
        let Some(child) = node.clusters.get(&high).cloned() else {
            return self.clone();
        };
        if !child.contains(low) {
            return self.clone();
        }
        let child = child.remove(low);
        if child.is_empty() {
            node.clusters.remove(&high);
            let summary = node
                .summary
                .as_deref()
                .expect("cluster removal implies a summary")
                .remove(high);
            node.summary = if summary.is_empty() {
                None
            } else {
                Some(Arc::new(summary))
            };
        } else {
            node.clusters.insert(high, Arc::new(child));
        }

        if key == max {
            node.max = match node.summary.as_deref() {
                // No clusters left: the minimum is the whole set.
                None => node.min,
                Some(summary) => {
                    let high = summary.max.expect("summary is non-empty");
                    let child = node
                        .clusters
                        .get(&high)
                        .expect("summary tracks live clusters");
                    Some(node.join(high, child.max.expect("clusters are never empty")))
                }
            };
        }
        node
    }

    /// The smallest key strictly greater than `query`, if any.
    ///
    /// Total over all of `u64`: queries at or above the maximum have no
    /// successor, and a query below the minimum answers the minimum.
    pub fn successor(&self, query: u64) -> Option<u64> {
        let min = self.min?;
        if query < min {
            return Some(min);
        }
        let max = self.max?;
        if query >= max {
            return None;
        }
        if self.log_u <= 1 {
            // min <= query < max in a two-slot universe: the answer is max.
            return Some(max);
        }
        let high = self.high(query);
        let low = self.low(query);
        if let Some(child) = self.clusters.get(&high) {
            if child.max.is_some_and(|m| low < m) {
                let offset = child
                    .successor(low)
                    .expect("successor exists below the cluster max");
                return Some(self.join(high, offset));
            }
        }
        let summary = self.summary.as_deref()?;
        let next = summary.successor(high)?;
        let child = self
            .clusters
            .get(&next)
            .expect("summary tracks live clusters");
        Some(self.join(next, child.min.expect("clusters are never empty")))
    }

    /// The largest key strictly less than `query`, if any.
    ///
    /// Total over all of `u64`: queries at or below the minimum have no
    /// predecessor, and a query above the maximum answers the maximum.
    pub fn predecessor(&self, query: u64) -> Option<u64> {
        let max = self.max?;
        if query > max {
            return Some(max);
        }
        let min = self.min?;
        if query <= min {
            return None;
        }
        if self.log_u <= 1 {
            // min < query <= max in a two-slot universe: the answer is min.
            return Some(min);
        }
        let high = self.high(query);
        let low = self.low(query);
        if let Some(child) = self.clusters.get(&high) {
            if child.min.is_some_and(|m| low > m) {
                let offset = child
                    .predecessor(low)
                    .expect("predecessor exists above the cluster min");
                return Some(self.join(high, offset));
            }
        }
        if let Some(summary) = self.summary.as_deref() {
            if let Some(prev) = summary.predecessor(high) {
                let child = self
                    .clusters
                    .get(&prev)
                    .expect("summary tracks live clusters");
                return Some(self.join(prev, child.max.expect("clusters are never empty")));
            }
        }
        // The top-level minimum lives outside every cluster.
        Some(min)
    }

    /// Lazy ascending iterator over the keys, driven by [`VebTree::successor`].
    ///
    /// The iterator's whole state is the tree and the next key to yield, so it
    /// can be paused and resumed at any step. Full traversal costs
    /// $O(|S| \log \log u)$.
    pub fn iter(&self) -> Keys<'_> {
        Keys {
            tree: self,
            next: self.min,
        }
    }
}

impl<'a> IntoIterator for &'a VebTree {
    type Item = u64;
    type IntoIter = Keys<'a>;

    fn into_iter(self) -> Keys<'a> {
        self.iter()
    }
}

/// Ascending key iterator over a [`VebTree`]; see [`VebTree::iter`].
pub struct Keys<'a> {
    tree: &'a VebTree,
    next: Option<u64>,
}

impl Iterator for Keys<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let key = self.next?;
        self.next = self.tree.successor(key);
        Some(key)
    }
}

impl FusedIterator for Keys<'_> {}
