//! # vEB-Indexed Ordered Maps
//!
//! *Hash-map lookups with predecessor queries in O(log log u).*
//!
//! ## Intuition First
//!
//! Picture a hotel with $2^{16}$ numbered rooms, mostly vacant. The front
//! desk keeps a guest register (a hash map): "who is in room 4711?" is
//! answered instantly. But "which occupied room comes after 4711?" forces a
//! corridor walk.
//!
//! A van Emde Boas tree is a night porter who memorizes occupancy at every
//! scale, from whole wings down to single corridors. Each question ("anyone
//! past here on this floor?") halves the number of *digits* under
//! consideration, not the number of rooms. Sixteen-bit room numbers take at
//! most four hops.
//!
//! ## The Problem
//!
//! Ordered dictionaries face a trade-off:
//! - **Hashing**: $O(1)$ lookups, but no notion of order at all.
//! - **Comparison trees**: ordered, but $\Theta(\log n)$ per query, and that
//!   bound is tight for comparison-based structures.
//!
//! When keys are integers from a known universe $[0, u)$, the comparison
//! lower bound does not apply: order queries can ride on the *bits* of the
//! key instead.
//!
//! ## Historical Context
//!
//! ```text
//! 1975  van Emde Boas     O(log log u) priority queue, dense array layout
//! 1977  vEB-Kaas-Zijlstra Engineering of the stratified tree implementation
//! 1983  Willard           x-fast and y-fast tries: vEB bounds, hashed space
//! 1984  Fredman-Komlos-   FKS hashing: the missing piece for O(n)-space
//!       Szemeredi         integer dictionaries
//! 1999  Beame-Fich        Matching lower bound for the predecessor problem
//! 2000s CLRS (3rd ed.)    The recursive cluster/summary formulation used here
//! ```
//!
//! The classical trick that makes insertion cheap: the minimum of every
//! subtree is stored *outside* its clusters. Inserting into an empty cluster
//! is then $O(1)$, so each insert performs only one non-trivial recursion —
//! either into a cluster or into the summary, never meaningfully into both.
//!
//! ## Mathematical Formulation
//!
//! A tree over exponent $\log u$ splits keys into an upper half (cluster
//! index) and lower half (offset), recursing on universes of exponent
//! $\lceil \log u / 2 \rceil$ and $\lfloor \log u / 2 \rfloor$:
//!
//! $$T(\log u) = T(\log u / 2) + O(1) = O(\log \log u)$$
//!
//! Supported queries: `insert`, `remove`, `contains`, `successor`,
//! `predecessor` in $O(\log \log u)$; `min`/`max` in $O(1)$.
//!
//! ## Complexity Analysis
//!
//! - **Time**: $O(\log \log u)$ per order query — for a 64-bit universe that
//!   is at most 6 hops.
//! - **Space**: $O(n \log \log u)$ here, because only non-empty clusters are
//!   materialized (sparse children behind shared pointers). The textbook
//!   dense layout is $O(u)$, which is unusable for large universes.
//!
//! ## What Could Go Wrong
//!
//! 1. **Split direction**: for odd $\log u$ the *upper* half gets the extra
//!    bit. Using the opposite convention corrupts cluster arithmetic in ways
//!    that only show up on multi-level trees.
//! 2. **The min is not in a cluster**: forgetting this invariant during
//!    delete (the minimum must be *promoted* from the first cluster, then
//!    deleted from it) silently duplicates or drops keys.
//!
//! ## Implementation Notes
//!
//! This crate provides:
//! - **[`VebTree`]**: a persistent ordered set of `u64` keys — every mutator
//!   returns a new value sharing structure with the input.
//! - **[`VebMap`]**: a persistent ordered map pairing a hash mapping (point
//!   lookups) with a `VebTree` index (order queries), kept in lockstep.
//! - **[`Cursor`]**: a suspendable walk over a map in ascending key order.
//!
//! ## References
//!
//! - van Emde Boas, P. (1975). "Preserving order in a forest in less than
//!   logarithmic time."
//! - Willard, D. E. (1983). "Log-logarithmic worst-case range queries are
//!   possible in space Theta(N)."
//! - Cormen, T. H., et al. (2009). *Introduction to Algorithms*, ch. 20.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cursor;
pub mod error;
pub mod map;
pub mod veb;

pub use cursor::Cursor;
pub use error::Error;
pub use map::{Update, VebMap};
pub use veb::{Universe, VebTree};
