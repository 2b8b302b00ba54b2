//! Persistent (immutable) hash set based on CHAMP.
//!
//! This module provides [`PersistentHashSet`], an immutable hash set
//! that uses structural sharing for efficient operations.
//!
//! # Overview
//!
//! `PersistentHashSet` is implemented as a thin wrapper around
//! [`PersistentHashMap<T, ()>`](super::PersistentHashMap), so it shares the
//! trie, its canonical shape, and its transient machinery.
//!
//! - O(log32 N) contains, insert, remove
//! - O(1) len and `is_empty`
//!
//! # Examples
//!
//! ```rust
//! use figura_collections::persistent::PersistentHashSet;
//!
//! let set = PersistentHashSet::new()
//!     .insert(1)
//!     .insert(2)
//!     .insert(3);
//!
//! assert!(set.contains(&1));
//! assert_eq!(set.len(), 3);
//!
//! // Structural sharing: the original set is preserved
//! let updated = set.insert(4);
//! assert_eq!(set.len(), 3);     // Original unchanged
//! assert_eq!(updated.len(), 4); // New version
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::hashmap::{
    PersistentHashMap, PersistentHashMapIntoIterator, PersistentHashMapIterator, TransientHashMap,
    TransientHashMapCursor,
};
use crate::error::Result;
use crate::fail_fast::FailFast;

// =============================================================================
// PersistentHashSet Definition
// =============================================================================

/// A persistent (immutable) hash set based on CHAMP.
///
/// # Time Complexity
///
/// | Operation      | Complexity        |
/// |----------------|-------------------|
/// | `new`          | O(1)              |
/// | `contains`     | O(log32 N)        |
/// | `insert`       | O(log32 N)        |
/// | `remove`       | O(log32 N)        |
/// | `len`          | O(1)              |
/// | `is_empty`     | O(1)              |
///
/// # Examples
///
/// ```rust
/// use figura_collections::persistent::PersistentHashSet;
///
/// let set = PersistentHashSet::singleton("stroke".to_string());
/// assert!(set.contains("stroke"));
/// ```
pub struct PersistentHashSet<T> {
    inner: PersistentHashMap<T, ()>,
}

impl<T> Clone for PersistentHashSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PersistentHashSet<T> {
    /// Creates a new empty set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentHashSet;
    ///
    /// let set: PersistentHashSet<i32> = PersistentHashSet::new();
    /// assert!(set.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: PersistentHashMap::new(),
        }
    }

    /// Returns the number of elements in the set.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over the elements, in trie order.
    #[must_use]
    pub fn iter(&self) -> PersistentHashSetIterator<'_, T> {
        PersistentHashSetIterator {
            inner: self.inner.iter(),
        }
    }
}

impl<T: Hash + Eq> PersistentHashSet<T> {
    /// Returns `true` if the set contains an element.
    ///
    /// The element may be any borrowed form of the set's element type.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    #[must_use]
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(element)
    }

    /// Returns `true` if every element of `self` is also in `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentHashSet;
    ///
    /// let subset: PersistentHashSet<i32> = [1, 2].into_iter().collect();
    /// let superset: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
    ///
    /// assert!(subset.is_subset(&superset));
    /// assert!(!superset.is_subset(&subset));
    /// ```
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().all(|element| other.contains(element))
    }

    /// Returns `true` if every element of `other` is also in `self`.
    #[must_use]
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Returns `true` if the two sets share no element.
    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        let (smaller, larger) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        !smaller.iter().any(|element| larger.contains(element))
    }
}

impl<T: Clone + Hash + Eq> PersistentHashSet<T> {
    /// Creates a set containing a single element.
    #[must_use]
    pub fn singleton(element: T) -> Self {
        Self::new().insert(element)
    }

    /// Inserts an element, returning a new set.
    ///
    /// # Panics
    ///
    /// Panics if the set is already at [`MAX_LENGTH`](crate::limits::MAX_LENGTH)
    /// and the element is new.
    #[must_use]
    pub fn insert(&self, element: T) -> Self {
        Self {
            inner: self.inner.insert(element, ()),
        }
    }

    /// Inserts an element, failing instead of growing past
    /// [`MAX_LENGTH`](crate::limits::MAX_LENGTH).
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::SizeLimitExceeded`](crate::CollectionError::SizeLimitExceeded)
    /// if the element is new and the set is already full.
    pub fn try_insert(&self, element: T) -> Result<Self> {
        Ok(Self {
            inner: self.inner.try_insert(element, ())?,
        })
    }

    /// Removes an element, returning a new set.
    #[must_use]
    pub fn remove<Q>(&self, element: &Q) -> Self
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Self {
            inner: self.inner.remove(element),
        }
    }

    /// Returns the union of two sets.
    ///
    /// # Complexity
    ///
    /// O(m log32 (n + m)), inserting the smaller set into the larger one
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentHashSet;
    ///
    /// let set_a: PersistentHashSet<i32> = [1, 2].into_iter().collect();
    /// let set_b: PersistentHashSet<i32> = [2, 3].into_iter().collect();
    ///
    /// let union = set_a.union(&set_b);
    ///
    /// assert_eq!(union.len(), 3);
    /// assert!(union.contains(&1));
    /// assert!(union.contains(&3));
    /// ```
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let (smaller, larger) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        Self {
            inner: larger.inner.merge(&smaller.inner),
        }
    }

    /// Returns the elements present in both sets.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentHashSet;
    ///
    /// let set_a: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
    /// let set_b: PersistentHashSet<i32> = [2, 3, 4].into_iter().collect();
    ///
    /// let intersection = set_a.intersection(&set_b);
    ///
    /// assert_eq!(intersection.len(), 2);
    /// assert!(intersection.contains(&2));
    /// assert!(intersection.contains(&3));
    /// ```
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        // Iterate over the smaller set
        let (smaller, larger) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        smaller
            .iter()
            .filter(|element| larger.contains(*element))
            .cloned()
            .collect()
    }

    /// Returns the elements of `self` that are not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        if other.len() < self.len() {
            let mut builder = self.clone().transient();
            for element in other {
                // Cannot fail: the builder is live and removal never grows it.
                let _ = builder.remove(element);
            }
            return builder.build().unwrap_or_else(|_| self.clone());
        }
        self.iter()
            .filter(|element| !other.contains(*element))
            .cloned()
            .collect()
    }

    /// Returns the elements in exactly one of the two sets.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentHashSet;
    ///
    /// let set_a: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
    /// let set_b: PersistentHashSet<i32> = [2, 3, 4].into_iter().collect();
    ///
    /// let symmetric = set_a.symmetric_difference(&set_b);
    ///
    /// assert_eq!(symmetric.len(), 2);
    /// assert!(symmetric.contains(&1));
    /// assert!(symmetric.contains(&4));
    /// ```
    #[must_use]
    pub fn symmetric_difference(&self, other: &Self) -> Self {
        self.difference(other).union(&other.difference(self))
    }

    /// Converts this set into a [`TransientHashSet`] for batch editing.
    #[must_use]
    pub fn transient(self) -> TransientHashSet<T> {
        TransientHashSet {
            inner: self.inner.transient(),
        }
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over the elements of a [`PersistentHashSet`].
pub struct PersistentHashSetIterator<'a, T> {
    inner: PersistentHashMapIterator<'a, T, ()>,
}

impl<'a, T> Iterator for PersistentHashSetIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for PersistentHashSetIterator<'_, T> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// An owning iterator over the elements of a [`PersistentHashSet`].
pub struct PersistentHashSetIntoIterator<T> {
    inner: PersistentHashMapIntoIterator<T, ()>,
}

impl<T: Clone> Iterator for PersistentHashSetIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T: Clone> ExactSizeIterator for PersistentHashSetIntoIterator<T> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

// =============================================================================
// TransientHashSet Definition
// =============================================================================

/// A single-owner, mutable builder for [`PersistentHashSet`].
///
/// Follows the same sealing rules as
/// [`TransientHashMap`](super::TransientHashMap).
///
/// # Examples
///
/// ```rust
/// use figura_collections::persistent::TransientHashSet;
///
/// let mut builder = TransientHashSet::new();
/// assert!(builder.insert(1).unwrap());
/// assert!(!builder.insert(1).unwrap());
///
/// let set = builder.build().unwrap();
/// assert_eq!(set.len(), 1);
/// ```
pub struct TransientHashSet<T> {
    inner: TransientHashMap<T, ()>,
}

static_assertions::assert_not_impl_any!(TransientHashSet<i32>: Send, Sync);

impl<T> TransientHashSet<T> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: TransientHashMap::new(),
        }
    }

    /// Returns the number of elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the builder holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns `true` once [`build`](Self::build) has sealed this builder.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.inner.is_sealed()
    }

    /// Seals the builder and returns the persistent set it built.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`](crate::CollectionError::BuilderSealed)
    /// if already sealed.
    pub fn build(&mut self) -> Result<PersistentHashSet<T>> {
        Ok(PersistentHashSet {
            inner: self.inner.build()?,
        })
    }
}

impl<T: Hash + Eq> TransientHashSet<T> {
    /// Returns `true` if the builder contains the element.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`](crate::CollectionError::BuilderSealed)
    /// if sealed.
    pub fn contains<Q>(&self, element: &Q) -> Result<bool>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(element)
    }
}

impl<T: Clone + Hash + Eq> TransientHashSet<T> {
    /// Adds an element, returning `true` if it was not already present.
    ///
    /// # Errors
    ///
    /// See [`TransientHashMap::insert`](super::TransientHashMap::insert).
    pub fn insert(&mut self, element: T) -> Result<bool> {
        Ok(self.inner.insert(element, ())?.is_none())
    }

    /// Removes an element, returning `true` if it was present.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`](crate::CollectionError::BuilderSealed)
    /// if sealed.
    pub fn remove<Q>(&mut self, element: &Q) -> Result<bool>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Ok(self.inner.remove(element)?.is_some())
    }

    /// Adds every element of `elements`.
    ///
    /// # Errors
    ///
    /// Stops at the first failing insert and returns its error.
    pub fn insert_all<I>(&mut self, elements: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        self.inner
            .insert_all(elements.into_iter().map(|element| (element, ())))
    }

    /// Opens a fail-fast cursor over the current elements.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`](crate::CollectionError::BuilderSealed)
    /// if sealed.
    pub fn cursor(&self) -> Result<TransientHashSetCursor<T>> {
        Ok(TransientHashSetCursor {
            inner: self.inner.cursor()?,
        })
    }
}

impl<T> FailFast for TransientHashSet<T> {
    fn modification_count(&self) -> u64 {
        self.inner.modification_count()
    }
}

impl<T> Default for TransientHashSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// # Panics
///
/// Panics where [`TransientHashSet::insert`] would return an error.
impl<T: Clone + Hash + Eq> Extend<T> for TransientHashSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        if let Err(error) = self.insert_all(iter) {
            panic!("{error}");
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for TransientHashSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TransientHashSet")
            .field("length", &self.len())
            .field("sealed", &self.is_sealed())
            .finish_non_exhaustive()
    }
}

/// A detached, fail-fast cursor over a [`TransientHashSet`].
pub struct TransientHashSetCursor<T> {
    inner: TransientHashMapCursor<T, ()>,
}

impl<T: Clone + Hash + Eq> TransientHashSetCursor<T> {
    /// Moves to the next element and returns it, or `None` at the end.
    ///
    /// # Errors
    ///
    /// See [`TransientHashMapCursor::advance`](super::TransientHashMapCursor::advance).
    pub fn advance(&mut self, set: &TransientHashSet<T>) -> Result<Option<T>> {
        Ok(self
            .inner
            .advance(&set.inner)?
            .map(|(element, ())| element))
    }

    /// Removes the element last returned by [`advance`](Self::advance).
    ///
    /// # Errors
    ///
    /// See [`TransientHashMapCursor::remove`](super::TransientHashMapCursor::remove).
    pub fn remove(&mut self, set: &mut TransientHashSet<T>) -> Result<()> {
        self.inner.remove(&mut set.inner)
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for PersistentHashSet<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Hash + Eq> FromIterator<T> for PersistentHashSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().map(|element| (element, ())).collect(),
        }
    }
}

impl<T: Clone> IntoIterator for PersistentHashSet<T> {
    type Item = T;
    type IntoIter = PersistentHashSetIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentHashSetIntoIterator {
            inner: self.inner.into_iter(),
        }
    }
}

impl<'a, T> IntoIterator for &'a PersistentHashSet<T> {
    type Item = &'a T;
    type IntoIter = PersistentHashSetIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Hash + Eq> PartialEq for PersistentHashSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T: Hash + Eq> Eq for PersistentHashSet<T> {}

impl<T: Hash + Eq> Hash for PersistentHashSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentHashSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for PersistentHashSet<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for PersistentHashSet<T>
where
    T: serde::Deserialize<'de> + Clone + Hash + Eq,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let elements: Vec<T> = serde::Deserialize::deserialize(deserializer)?;
        let mut builder = TransientHashSet::new();
        builder.insert_all(elements).map_err(D::Error::custom)?;
        builder.build().map_err(D::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================
