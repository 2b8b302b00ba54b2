//! Persistent (immutable) vector based on a Relaxed Radix Balanced tree.
//!
//! This module provides [`PersistentVector`], an immutable dynamic array
//! that uses structural sharing for efficient operations, and
//! [`TransientVector`], its single-owner builder.
//!
//! # Overview
//!
//! `PersistentVector` is a 32-way branching RRB tree. Balanced subtrees are
//! indexed by radix arithmetic like Clojure's `PersistentVector`; subtrees
//! produced by concatenation or slicing carry size tables instead. It
//! provides:
//!
//! - O(log32 N) random access (effectively O(1) for practical sizes)
//! - O(log32 N) `push_back` (amortized O(1) with tail optimization)
//! - O(log32 N) update
//! - O(log32 N) `concat`, `slice`, and `push_front`
//! - O(1) len and `is_empty`
//!
//! All operations return new vectors without modifying the original,
//! and structural sharing ensures memory efficiency.
//!
//! # Internal Structure
//!
//! The vector consists of:
//! - A root node (the RRB tree)
//! - A tail buffer (up to 32 elements) for efficient append
//!
//! # Examples
//!
//! ```rust
//! use figura_collections::persistent::PersistentVector;
//!
//! let vector = PersistentVector::new()
//!     .push_back(1)
//!     .push_back(2)
//!     .push_back(3);
//!
//! assert_eq!(vector.get(0), Some(&1));
//! assert_eq!(vector.get(1), Some(&2));
//! assert_eq!(vector.get(2), Some(&3));
//!
//! // Structural sharing: the original vector is preserved
//! let extended = vector.push_back(4);
//! assert_eq!(vector.len(), 3);     // Original unchanged
//! assert_eq!(extended.len(), 4);   // New vector
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem;
use std::rc::Rc;

use super::ReferenceCounter;
use super::owner::OwnerToken;
use super::rrb::{BRANCHING_FACTOR, Elements, Node};
use crate::error::{CollectionError, Result};
use crate::fail_fast::{FailFast, ModificationGuard};
use crate::limits::checked_length;

// =============================================================================
// PersistentVector Definition
// =============================================================================

/// A persistent (immutable) vector based on a Relaxed Radix Balanced tree.
///
/// # Time Complexity
///
/// | Operation    | Complexity                    |
/// |--------------|-------------------------------|
/// | `new`        | O(1)                          |
/// | `get`        | O(log32 N)                    |
/// | `push_back`  | O(log32 N) amortized O(1)     |
/// | `pop_back`   | O(log32 N)                    |
/// | `push_front` | O(log32 N)                    |
/// | `update`     | O(log32 N)                    |
/// | `concat`     | O(log32 N)                    |
/// | `slice`      | O(log32 N)                    |
/// | `len`        | O(1)                          |
/// | `is_empty`   | O(1)                          |
/// | `iter`       | O(1) to create, O(N) to iterate |
///
/// # Examples
///
/// ```rust
/// use figura_collections::persistent::PersistentVector;
///
/// let vector: PersistentVector<i32> = (0..100).collect();
/// assert_eq!(vector.len(), 100);
/// assert_eq!(vector.get(50), Some(&50));
/// ```
pub struct PersistentVector<T> {
    /// Total number of elements
    length: usize,
    /// Shift of the root node; 0 when the root is a leaf
    shift: usize,
    /// Root node of the tree
    root: ReferenceCounter<Node<T>>,
    /// Tail leaf; empty only when the vector is empty
    tail: ReferenceCounter<Node<T>>,
}

impl<T> Clone for PersistentVector<T> {
    fn clone(&self) -> Self {
        Self {
            length: self.length,
            shift: self.shift,
            root: self.root.clone(),
            tail: self.tail.clone(),
        }
    }
}

impl<T> PersistentVector<T> {
    /// Creates a new empty vector.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = PersistentVector::new();
    /// assert!(vector.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            length: 0,
            shift: 0,
            root: ReferenceCounter::new(Node::empty_leaf()),
            tail: ReferenceCounter::new(Node::empty_leaf()),
        }
    }

    /// Returns the number of elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the vector contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of elements stored in the tree rather than the tail.
    fn tree_len(&self) -> usize {
        self.length - self.tail.slot_count()
    }

    /// Returns the leaf holding `index` and the position of `index` in it.
    fn leaf_at(&self, index: usize) -> Option<(&[T], usize)> {
        let tree_len = self.tree_len();
        if index >= tree_len {
            let local = index - tree_len;
            let tail = self.tail.elements();
            (local < tail.len()).then_some((tail, local))
        } else {
            self.root.leaf_at(self.shift, index)
        }
    }

    /// Returns a reference to the element at `index`, or `None` if out of
    /// bounds.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..10).collect();
    /// assert_eq!(vector.get(5), Some(&5));
    /// assert_eq!(vector.get(10), None);
    /// ```
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.leaf_at(index)
            .map(|(elements, local)| &elements[local])
    }

    /// Returns the first element, or `None` if empty.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns the last element, or `None` if empty.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.tail.elements().last()
    }

    /// Returns a double-ended iterator over the elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=5).collect();
    /// let reversed: Vec<i32> = vector.iter().rev().copied().collect();
    /// assert_eq!(reversed, vec![5, 4, 3, 2, 1]);
    /// ```
    #[must_use]
    pub fn iter(&self) -> PersistentVectorIterator<'_, T> {
        PersistentVectorIterator {
            vector: self,
            front: 0,
            back: self.length,
            front_leaf: &[],
            front_leaf_start: 0,
            back_leaf: &[],
            back_leaf_start: 0,
        }
    }
}

impl<T: Clone> PersistentVector<T> {
    /// Creates a vector containing a single element.
    #[must_use]
    pub fn singleton(element: T) -> Self {
        let mut tail = Elements::new();
        tail.push(element);
        Self {
            length: 1,
            shift: 0,
            root: ReferenceCounter::new(Node::empty_leaf()),
            tail: ReferenceCounter::new(Node::leaf(tail, None)),
        }
    }

    /// Splits a tree into a vector, moving its last leaf into the tail.
    fn from_tree(root: ReferenceCounter<Node<T>>, shift: usize, owner: OwnerToken) -> Self {
        let mut root = root;
        let mut shift = shift;
        let tail = Node::pop_last_leaf(&mut root, &mut shift, owner).unwrap_or_default();
        Self {
            length: root.len(shift) + tail.len(),
            shift,
            root,
            tail: ReferenceCounter::new(Node::leaf(tail, None)),
        }
    }

    /// Returns a vector with the element at `index` replaced.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::IndexOutOfBounds`] if `index >= len`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..5).collect();
    /// let updated = vector.update(2, 100).unwrap();
    ///
    /// assert_eq!(updated.get(2), Some(&100));
    /// assert_eq!(vector.get(2), Some(&2)); // Original unchanged
    /// assert!(vector.update(5, 0).is_err());
    /// ```
    pub fn update(&self, index: usize, element: T) -> Result<Self> {
        if index >= self.length {
            return Err(CollectionError::IndexOutOfBounds {
                index,
                length: self.length,
            });
        }

        let owner = OwnerToken::fresh();
        let tree_len = self.tree_len();
        let mut updated = self.clone();
        if index >= tree_len {
            Node::update(&mut updated.tail, owner, 0, index - tree_len, element);
        } else {
            Node::update(&mut updated.root, owner, self.shift, index, element);
        }
        Ok(updated)
    }

    /// Appends an element to the back of the vector.
    ///
    /// # Complexity
    ///
    /// O(log32 N) amortized O(1)
    ///
    /// # Panics
    ///
    /// Panics if the vector already holds
    /// [`MAX_LENGTH`](crate::limits::MAX_LENGTH) elements.
    #[must_use]
    pub fn push_back(&self, element: T) -> Self {
        self.try_push_back(element)
            .unwrap_or_else(|error| panic!("{error}"))
    }

    /// Appends an element, failing instead of growing past
    /// [`MAX_LENGTH`](crate::limits::MAX_LENGTH).
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::SizeLimitExceeded`] if the vector is full.
    pub fn try_push_back(&self, element: T) -> Result<Self> {
        let length = checked_length(self.length, 1)?;

        if self.tail.slot_count() < BRANCHING_FACTOR {
            let mut tail: Elements<T> = self.tail.elements().iter().cloned().collect();
            tail.push(element);
            return Ok(Self {
                length,
                shift: self.shift,
                root: self.root.clone(),
                tail: ReferenceCounter::new(Node::leaf(tail, None)),
            });
        }

        let mut root = self.root.clone();
        let mut shift = self.shift;
        Node::append_leaf(&mut root, &mut shift, self.tail.clone(), OwnerToken::fresh());

        let mut tail = Elements::new();
        tail.push(element);
        Ok(Self {
            length,
            shift,
            root,
            tail: ReferenceCounter::new(Node::leaf(tail, None)),
        })
    }

    /// Removes the last element.
    ///
    /// Returns `None` if the vector is empty, otherwise the new vector and
    /// the removed element.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=5).collect();
    /// let (remaining, element) = vector.pop_back().unwrap();
    ///
    /// assert_eq!(element, 5);
    /// assert_eq!(remaining.len(), 4);
    /// ```
    #[must_use]
    pub fn pop_back(&self) -> Option<(Self, T)> {
        let (last, init) = self.tail.elements().split_last()?;

        let remaining = if init.is_empty() {
            Self::from_tree(self.root.clone(), self.shift, OwnerToken::fresh())
        } else {
            Self {
                length: self.length - 1,
                shift: self.shift,
                root: self.root.clone(),
                tail: ReferenceCounter::new(Node::leaf(init.iter().cloned().collect(), None)),
            }
        };
        Some((remaining, last.clone()))
    }

    /// Prepends an element to the front of the vector.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Panics
    ///
    /// Panics if the vector already holds
    /// [`MAX_LENGTH`](crate::limits::MAX_LENGTH) elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (2..=4).collect();
    /// let prepended = vector.push_front(1);
    /// assert_eq!(prepended.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    /// ```
    #[must_use]
    pub fn push_front(&self, element: T) -> Self {
        self.try_push_front(element)
            .unwrap_or_else(|error| panic!("{error}"))
    }

    /// Prepends an element, failing instead of growing past
    /// [`MAX_LENGTH`](crate::limits::MAX_LENGTH).
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::SizeLimitExceeded`] if the vector is full.
    pub fn try_push_front(&self, element: T) -> Result<Self> {
        Self::singleton(element).try_concat(self)
    }

    /// Returns the concatenation of `self` and `other`.
    ///
    /// # Complexity
    ///
    /// O(log32 (N + M))
    ///
    /// # Panics
    ///
    /// Panics if the result would exceed
    /// [`MAX_LENGTH`](crate::limits::MAX_LENGTH) elements.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        self.try_concat(other)
            .unwrap_or_else(|error| panic!("{error}"))
    }

    /// Concatenates two vectors, failing instead of growing past
    /// [`MAX_LENGTH`](crate::limits::MAX_LENGTH).
    ///
    /// Neither input is modified; nodes away from the seam are shared.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::SizeLimitExceeded`] if the combined length
    /// is too large.
    pub fn try_concat(&self, other: &Self) -> Result<Self> {
        let length = checked_length(self.length, other.length)?;
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(other.clone());
        }

        let owner = OwnerToken::fresh();

        if other.root.is_empty() {
            // `other` is only a tail: move its elements across in place of pushes.
            let mut root = self.root.clone();
            let mut shift = self.shift;
            let mut tail: Elements<T> = self.tail.elements().iter().cloned().collect();
            for element in other.tail.elements() {
                if tail.is_full() {
                    let leaf = ReferenceCounter::new(Node::leaf(mem::take(&mut tail), None));
                    Node::append_leaf(&mut root, &mut shift, leaf, owner);
                }
                tail.push(element.clone());
            }
            return Ok(Self {
                length,
                shift,
                root,
                tail: ReferenceCounter::new(Node::leaf(tail, None)),
            });
        }

        let mut root = self.root.clone();
        let mut shift = self.shift;
        Node::append_leaf(&mut root, &mut shift, self.tail.clone(), owner);
        let (root, shift) =
            Node::concat_trees(root, shift, other.root.clone(), other.shift, owner);

        Ok(Self {
            length,
            shift,
            root,
            tail: other.tail.clone(),
        })
    }

    /// Returns the elements in `start..end` as a new vector.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::InvalidRange`] unless
    /// `start <= end <= len`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..100).collect();
    /// let middle = vector.slice(10, 20).unwrap();
    ///
    /// assert_eq!(middle.len(), 10);
    /// assert_eq!(middle.first(), Some(&10));
    /// assert!(vector.slice(20, 10).is_err());
    /// ```
    pub fn slice(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end > self.length {
            return Err(CollectionError::InvalidRange {
                start,
                end,
                length: self.length,
            });
        }
        Ok(self.slice_within(start, end))
    }

    /// Slices a range already known to be valid.
    fn slice_within(&self, start: usize, end: usize) -> Self {
        if start == end {
            return Self::new();
        }
        if start == 0 && end == self.length {
            return self.clone();
        }

        let tree_len = self.tree_len();
        let tail = self.tail.elements();

        if start >= tree_len {
            return Self {
                length: end - start,
                shift: 0,
                root: ReferenceCounter::new(Node::empty_leaf()),
                tail: ReferenceCounter::new(Node::leaf(
                    tail[start - tree_len..end - tree_len].iter().cloned().collect(),
                    None,
                )),
            };
        }

        let owner = OwnerToken::fresh();
        let mut root = self.root.clone();
        let mut shift = self.shift;
        let tree_end = end.min(tree_len);
        if tree_end < tree_len {
            Node::truncate(&mut root, owner, shift, tree_end);
        }
        if start > 0 {
            Node::drop_front(&mut root, owner, shift, start);
        }
        Node::collapse(&mut root, &mut shift);

        if end > tree_len {
            Self {
                length: end - start,
                shift,
                root,
                tail: ReferenceCounter::new(Node::leaf(
                    tail[..end - tree_len].iter().cloned().collect(),
                    None,
                )),
            }
        } else {
            Self::from_tree(root, shift, owner)
        }
    }

    /// Returns the first `count` elements (all of them if `count` exceeds the length).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=5).collect();
    /// assert_eq!(vector.take(3).len(), 3);
    /// assert_eq!(vector.take(10).len(), 5);
    /// ```
    #[must_use]
    pub fn take(&self, count: usize) -> Self {
        self.slice_within(0, count.min(self.length))
    }

    /// Returns the vector without its first `count` elements.
    #[must_use]
    pub fn drop_first(&self, count: usize) -> Self {
        self.slice_within(count.min(self.length), self.length)
    }

    /// Splits the vector at `index`.
    ///
    /// Equivalent to `(self.take(index), self.drop_first(index))`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=5).collect();
    /// let (left, right) = vector.split_at(2);
    /// assert_eq!(left.len(), 2);
    /// assert_eq!(right.first(), Some(&3));
    /// ```
    #[must_use]
    pub fn split_at(&self, index: usize) -> (Self, Self) {
        (self.take(index), self.drop_first(index))
    }

    /// Converts this vector into a [`TransientVector`] for batch editing.
    #[must_use]
    pub fn transient(self) -> TransientVector<T> {
        TransientVector {
            tail: self.tail.elements().iter().cloned().collect(),
            root: self.root,
            shift: self.shift,
            length: self.length,
            owner: Some(OwnerToken::fresh()),
            modification_count: 0,
            _marker: PhantomData,
        }
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// A double-ended iterator over the elements of a [`PersistentVector`].
///
/// Each end caches the leaf it is reading, so a full pass descends the tree
/// once per leaf rather than once per element.
pub struct PersistentVectorIterator<'a, T> {
    vector: &'a PersistentVector<T>,
    front: usize,
    back: usize,
    front_leaf: &'a [T],
    front_leaf_start: usize,
    back_leaf: &'a [T],
    back_leaf_start: usize,
}

impl<'a, T> Iterator for PersistentVectorIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let index = self.front;
        if index < self.front_leaf_start || index >= self.front_leaf_start + self.front_leaf.len()
        {
            let (leaf, local) = self.vector.leaf_at(index)?;
            self.front_leaf = leaf;
            self.front_leaf_start = index - local;
        }
        self.front += 1;
        self.front_leaf.get(index - self.front_leaf_start)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<T> DoubleEndedIterator for PersistentVectorIterator<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let index = self.back - 1;
        if index < self.back_leaf_start || index >= self.back_leaf_start + self.back_leaf.len() {
            let (leaf, local) = self.vector.leaf_at(index)?;
            self.back_leaf = leaf;
            self.back_leaf_start = index - local;
        }
        self.back = index;
        self.back_leaf.get(index - self.back_leaf_start)
    }
}

impl<T> ExactSizeIterator for PersistentVectorIterator<'_, T> {
    fn len(&self) -> usize {
        self.back - self.front
    }
}

/// An owning iterator over the elements of a [`PersistentVector`].
pub struct PersistentVectorIntoIterator<T> {
    vector: PersistentVector<T>,
    front: usize,
    back: usize,
}

impl<T: Clone> Iterator for PersistentVectorIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let element = self.vector.get(self.front).cloned();
        self.front += 1;
        element
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<T: Clone> DoubleEndedIterator for PersistentVectorIntoIterator<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.vector.get(self.back).cloned()
    }
}

impl<T: Clone> ExactSizeIterator for PersistentVectorIntoIterator<T> {
    fn len(&self) -> usize {
        self.back - self.front
    }
}

// =============================================================================
// TransientVector Definition
// =============================================================================

/// A single-owner, mutable builder for [`PersistentVector`].
///
/// Every operation returns a [`Result`]; once [`build`](Self::build) has been
/// called, all further operations fail with
/// [`CollectionError::BuilderSealed`].
///
/// # Examples
///
/// ```rust
/// use figura_collections::persistent::TransientVector;
///
/// let mut builder = TransientVector::new();
/// for value in 0..100 {
///     builder.push_back(value).unwrap();
/// }
/// builder.set(0, -1).unwrap();
///
/// let vector = builder.build().unwrap();
/// assert_eq!(vector.len(), 100);
/// assert_eq!(vector.first(), Some(&-1));
/// ```
pub struct TransientVector<T> {
    root: ReferenceCounter<Node<T>>,
    shift: usize,
    /// Owned tail buffer; may be empty while the tree is not.
    tail: Elements<T>,
    length: usize,
    /// `None` once sealed.
    owner: Option<OwnerToken>,
    modification_count: u64,
    _marker: PhantomData<Rc<()>>,
}

static_assertions::assert_not_impl_any!(TransientVector<i32>: Send, Sync);
#[cfg(feature = "arc")]
static_assertions::assert_impl_all!(PersistentVector<i32>: Send, Sync);

impl<T> TransientVector<T> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: ReferenceCounter::new(Node::empty_leaf()),
            shift: 0,
            tail: Elements::new(),
            length: 0,
            owner: Some(OwnerToken::fresh()),
            modification_count: 0,
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the builder holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns `true` once [`build`](Self::build) has sealed this builder.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.owner.is_none()
    }

    fn session(&self) -> Result<OwnerToken> {
        self.owner.ok_or_else(|| {
            tracing::debug!("operation rejected on sealed transient vector");
            CollectionError::BuilderSealed
        })
    }

    /// Returns a reference to the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`] if sealed.
    pub fn get(&self, index: usize) -> Result<Option<&T>> {
        self.session()?;
        let tree_len = self.length - self.tail.len();
        Ok(if index >= tree_len {
            self.tail.get(index - tree_len)
        } else {
            self.root.get(self.shift, index)
        })
    }

    /// Opens a fail-fast cursor positioned before the first element.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`] if sealed.
    pub fn cursor(&self) -> Result<TransientVectorCursor> {
        self.session()?;
        Ok(TransientVectorCursor {
            guard: ModificationGuard::capture(self),
            next_index: 0,
        })
    }
}

impl<T: Clone> TransientVector<T> {
    /// Appends an element in place.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`] if sealed, or
    /// [`CollectionError::SizeLimitExceeded`] if the builder is full.
    pub fn push_back(&mut self, element: T) -> Result<()> {
        let owner = self.session()?;
        let length = checked_length(self.length, 1)?;

        if self.tail.is_full() {
            let leaf = ReferenceCounter::new(Node::leaf(mem::take(&mut self.tail), Some(owner)));
            Node::append_leaf(&mut self.root, &mut self.shift, leaf, owner);
        }
        self.tail.push(element);
        self.length = length;
        self.modification_count += 1;
        Ok(())
    }

    /// Removes and returns the last element, or `None` if empty.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`] if sealed.
    pub fn pop_back(&mut self) -> Result<Option<T>> {
        let owner = self.session()?;
        if self.length == 0 {
            return Ok(None);
        }

        if self.tail.is_empty() {
            self.tail =
                Node::pop_last_leaf(&mut self.root, &mut self.shift, owner).unwrap_or_default();
        }
        let popped = self.tail.pop();
        if popped.is_some() {
            self.length -= 1;
            self.modification_count += 1;
        }
        Ok(popped)
    }

    /// Replaces the element at `index` in place, returning the previous one.
    ///
    /// Not a structural modification: open cursors stay valid.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`] if sealed, or
    /// [`CollectionError::IndexOutOfBounds`] if `index >= len`.
    pub fn set(&mut self, index: usize, element: T) -> Result<T> {
        let owner = self.session()?;
        let out_of_bounds = CollectionError::IndexOutOfBounds {
            index,
            length: self.length,
        };
        if index >= self.length {
            return Err(out_of_bounds);
        }

        let tree_len = self.length - self.tail.len();
        if index >= tree_len {
            let slot = self
                .tail
                .get_mut(index - tree_len)
                .ok_or(out_of_bounds)?;
            return Ok(mem::replace(slot, element));
        }
        Node::update(&mut self.root, owner, self.shift, index, element).ok_or(out_of_bounds)
    }

    /// Appends every element of `elements`.
    ///
    /// # Errors
    ///
    /// Stops at the first failing push and returns its error.
    pub fn push_back_all<I>(&mut self, elements: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        for element in elements {
            self.push_back(element)?;
        }
        Ok(())
    }

    /// Seals the builder and returns the persistent vector it built.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`] if already sealed.
    pub fn build(&mut self) -> Result<PersistentVector<T>> {
        let owner = self.session()?;
        self.owner = None;

        let root = mem::replace(&mut self.root, ReferenceCounter::new(Node::empty_leaf()));
        let shift = mem::take(&mut self.shift);
        let tail = mem::take(&mut self.tail);
        let length = mem::take(&mut self.length);
        tracing::debug!(length, "sealed transient vector");

        if tail.is_empty() {
            return Ok(PersistentVector::from_tree(root, shift, owner));
        }
        Ok(PersistentVector {
            length,
            shift,
            root,
            tail: ReferenceCounter::new(Node::leaf(tail, None)),
        })
    }
}

impl<T> FailFast for TransientVector<T> {
    fn modification_count(&self) -> u64 {
        self.modification_count
    }
}

impl<T> Default for TransientVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// # Panics
///
/// Panics where [`TransientVector::push_back`] would return an error.
impl<T: Clone> Extend<T> for TransientVector<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        if let Err(error) = self.push_back_all(iter) {
            panic!("{error}");
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for TransientVector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TransientVector")
            .field("length", &self.length)
            .field("sealed", &self.is_sealed())
            .finish_non_exhaustive()
    }
}

/// A detached, fail-fast cursor over a [`TransientVector`].
///
/// # Examples
///
/// ```rust
/// use figura_collections::persistent::TransientVector;
///
/// let mut builder = TransientVector::new();
/// builder.push_back_all(["a", "b", "c"]).unwrap();
///
/// let mut cursor = builder.cursor().unwrap();
/// assert_eq!(cursor.advance(&builder).unwrap(), Some(&"a"));
///
/// builder.push_back("d").unwrap();
/// assert!(cursor.advance(&builder).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct TransientVectorCursor {
    guard: ModificationGuard,
    next_index: usize,
}

impl TransientVectorCursor {
    /// Moves to the next element and returns it, or `None` at the end.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::ConcurrentModification`] if `vector` was
    /// structurally modified since the cursor was opened, and
    /// [`CollectionError::BuilderSealed`] if it is sealed.
    pub fn advance<'v, T>(&mut self, vector: &'v TransientVector<T>) -> Result<Option<&'v T>> {
        vector.session()?;
        self.guard.check(vector)?;
        let element = vector.get(self.next_index)?;
        if element.is_some() {
            self.next_index += 1;
        }
        Ok(element)
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for PersistentVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> FromIterator<T> for PersistentVector<T> {
    /// # Panics
    ///
    /// Panics if the iterator yields more than
    /// [`MAX_LENGTH`](crate::limits::MAX_LENGTH) elements.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut builder = TransientVector::new();
        builder.extend(iter);
        builder
            .build()
            .unwrap_or_else(|error| panic!("{error}"))
    }
}

impl<T: Clone> IntoIterator for PersistentVector<T> {
    type Item = T;
    type IntoIter = PersistentVectorIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentVectorIntoIterator {
            back: self.length,
            vector: self,
            front: 0,
        }
    }
}

impl<'a, T> IntoIterator for &'a PersistentVector<T> {
    type Item = &'a T;
    type IntoIter = PersistentVectorIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq> PartialEq for PersistentVector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for PersistentVector<T> {}

/// Hashes the length, then each element in order.
impl<T: Hash> Hash for PersistentVector<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for element in self {
            element.hash(state);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentVector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for PersistentVector<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut sequence = serializer.serialize_seq(Some(self.len()))?;
        for element in self {
            sequence.serialize_element(element)?;
        }
        sequence.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentVectorVisitor<T> {
    marker: PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for PersistentVectorVisitor<T>
where
    T: serde::Deserialize<'de> + Clone,
{
    type Value = PersistentVector<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        use serde::de::Error;

        let mut builder = TransientVector::new();
        while let Some(element) = access.next_element()? {
            builder.push_back(element).map_err(A::Error::custom)?;
        }
        builder.build().map_err(A::Error::custom)
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for PersistentVector<T>
where
    T: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentVectorVisitor {
            marker: PhantomData,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_round_trip_json() {
        let vector: PersistentVector<i32> = (1..=3).collect();
        let json = serde_json::to_string(&vector).unwrap();
        assert_eq!(json, "[1,2,3]");
        let decoded: PersistentVector<i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, vector);
    }
}
