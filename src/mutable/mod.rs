//! Mutable containers.
//!
//! - [`IndexedArraySet`]: an array-backed set whose order is chosen by the
//!   caller, with [`SetHooks`] observing every change
//!
//! Unlike the persistent containers, these are edited in place and carry a
//! modification count for fail-fast cursors (see [`crate::fail_fast`]).

mod indexed_array_set;

pub use indexed_array_set::{IndexedArraySet, IndexedArraySetCursor, NoHooks, SetHooks};
