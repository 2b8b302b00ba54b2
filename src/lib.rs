//! # figura-collections
//!
//! The collection engine of the figura drawing editor. Property bags, style
//! maps, undo history and graph adjacency lists are all built on the
//! containers in this crate.
//!
//! ## Overview
//!
//! - **Persistent maps and sets**: [`PersistentHashMap`] and [`PersistentHashSet`],
//!   backed by a CHAMP trie (compressed hash-array mapped prefix tree)
//! - **Persistent sequences**: [`PersistentVector`], backed by a relaxed radix
//!   balanced (RRB) tree with O(log n) concatenation and slicing
//! - **Transient builders**: exclusively owned mutation sessions over the
//!   persistent containers, sealed back with `build()`
//! - **Indexed array set**: [`IndexedArraySet`], a mutable set whose order is
//!   dictated by the caller, with strategy hooks for change notification
//! - **Fail-fast iteration**: cursors over mutable containers that detect
//!   modification behind their back
//!
//! ## Feature Flags
//!
//! - `persistent`: CHAMP and RRB containers (default)
//! - `mutable`: the indexed array set (default)
//! - `arc`: share nodes through `Arc` so persistent containers are `Send + Sync` (default)
//! - `serde`: serde support for persistent containers
//! - `fxhash` / `ahash`: hash function used by the CHAMP trie
//!
//! ## Example
//!
//! ```rust
//! use figura_collections::prelude::*;
//!
//! let style = PersistentHashMap::new()
//!     .insert("stroke", "black")
//!     .insert("fill", "none");
//! let highlighted = style.insert("stroke", "red");
//!
//! assert_eq!(style.get("stroke"), Some(&"black"));
//! assert_eq!(highlighted.get("stroke"), Some(&"red"));
//! ```
//!
//! [`PersistentHashMap`]: persistent::PersistentHashMap
//! [`PersistentHashSet`]: persistent::PersistentHashSet
//! [`PersistentVector`]: persistent::PersistentVector
//! [`IndexedArraySet`]: mutable::IndexedArraySet

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use figura_collections::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{CollectionError, ErrorKind};
    pub use crate::fail_fast::FailFast;

    #[cfg(feature = "persistent")]
    pub use crate::persistent::*;

    #[cfg(feature = "mutable")]
    pub use crate::mutable::*;
}

pub mod error;
pub mod fail_fast;
pub mod limits;

#[cfg(feature = "persistent")]
pub mod persistent;

#[cfg(feature = "mutable")]
pub mod mutable;

pub use error::{CollectionError, Result};
