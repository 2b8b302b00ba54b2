//! Persistent (immutable) data structures.
//!
//! This module provides immutable containers that use structural sharing to
//! minimize copying:
//!
//! - [`PersistentHashMap`]: Persistent hash map (CHAMP trie)
//! - [`PersistentHashSet`]: Persistent hash set (based on the CHAMP map)
//! - [`PersistentVector`]: Persistent vector (RRB tree)
//!
//! Each container has a transient counterpart ([`TransientHashMap`],
//! [`TransientHashSet`], [`TransientVector`]) for batches of edits. A
//! transient edits nodes it owns in place, and `build()` seals it back into a
//! persistent value.
//!
//! # Structural Sharing
//!
//! An update copies only the path from the root to the changed leaf. Every
//! other node is shared with the previous version.
//!
//! # Examples
//!
//! ## `PersistentHashMap`
//!
//! ```rust
//! use figura_collections::persistent::PersistentHashMap;
//!
//! let map = PersistentHashMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2);
//! assert_eq!(map.get("one"), Some(&1));
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));       // Original unchanged
//! assert_eq!(updated.get("one"), Some(&100)); // New version
//! ```
//!
//! ## `PersistentHashSet`
//!
//! ```rust
//! use figura_collections::persistent::PersistentHashSet;
//!
//! let set: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
//! let other: PersistentHashSet<i32> = [2, 3, 4].into_iter().collect();
//!
//! assert_eq!(set.union(&other).len(), 4);
//! assert_eq!(set.intersection(&other).len(), 2);
//! ```
//!
//! ## `PersistentVector`
//!
//! ```rust
//! use figura_collections::persistent::PersistentVector;
//!
//! let left: PersistentVector<i32> = (0..100).collect();
//! let right: PersistentVector<i32> = (100..250).collect();
//!
//! let joined = left.concat(&right);
//! assert_eq!(joined.len(), 250);
//! assert_eq!(joined.get(120), Some(&120));
//!
//! let middle = joined.slice(50, 150).unwrap();
//! assert_eq!(middle.first(), Some(&50));
//! assert_eq!(middle.len(), 100);
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled (the default), this is `std::sync::Arc`,
/// so persistent containers can be shared across threads.
///
/// When the `arc` feature is disabled, this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod hashing;
mod hashmap;
mod hashset;
mod owner;
mod rrb;
mod trie;
mod vector;

pub use hashing::DefaultHashBuilder;
pub use hashmap::PersistentHashMap;
pub use hashmap::PersistentHashMapIntoIterator;
pub use hashmap::PersistentHashMapIterator;
pub use hashmap::TransientHashMap;
pub use hashmap::TransientHashMapCursor;
pub use hashset::PersistentHashSet;
pub use hashset::PersistentHashSetIntoIterator;
pub use hashset::PersistentHashSetIterator;
pub use hashset::TransientHashSet;
pub use hashset::TransientHashSetCursor;
pub use rrb::{BITS_PER_LEVEL, BRANCHING_FACTOR, EXTRA_SEARCH_STEPS};
pub use vector::PersistentVector;
pub use vector::PersistentVectorIntoIterator;
pub use vector::PersistentVectorIterator;
pub use vector::TransientVector;
pub use vector::TransientVectorCursor;

// =============================================================================
// Tests
// =============================================================================
