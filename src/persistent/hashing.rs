//! Hash function used by the CHAMP trie.
//!
//! The hasher is selected at compile time:
//!
//! - `fxhash` feature: `rustc_hash::FxHasher`
//! - `ahash` feature: `ahash::AHasher` with fixed keys
//! - otherwise: `std::collections::hash_map::DefaultHasher`
//!
//! Every choice is deterministic within a process. Two tries built from the
//! same entries therefore hash their keys identically, which map equality
//! and the order-independent map hash both rely on.

use std::hash::{BuildHasher, BuildHasherDefault, Hash};

#[cfg(feature = "fxhash")]
type SelectedHasher = rustc_hash::FxHasher;

#[cfg(all(feature = "ahash", not(feature = "fxhash")))]
type SelectedHasher = ahash::AHasher;

#[cfg(not(any(feature = "fxhash", feature = "ahash")))]
type SelectedHasher = std::collections::hash_map::DefaultHasher;

/// The `BuildHasher` all tries share.
pub type DefaultHashBuilder = BuildHasherDefault<SelectedHasher>;

/// Number of hash bits a trie path can consume.
pub(crate) const HASH_BITS: u32 = u64::BITS;

/// Computes the 64-bit trie hash of a value.
#[inline]
pub(crate) fn hash_of<Q: Hash + ?Sized>(value: &Q) -> u64 {
    DefaultHashBuilder::default().hash_one(value)
}
