//! Array-backed set with caller-chosen element positions.
//!
//! [`IndexedArraySet`] keeps its elements in a contiguous `Vec`, in exactly
//! the order the caller dictated. Each element appears at most once.
//! Inserting an element that is already present moves it.
//!
//! Behavior that would otherwise be specialized by subclassing is injected
//! as a [`SetHooks`] strategy object:
//!
//! | Hook           | Called                                | Default      |
//! |----------------|---------------------------------------|--------------|
//! | `may_be_added` | before a new element is added         | `true`       |
//! | `on_added`     | after an element is placed            | no-op        |
//! | `on_removed`   | after an element is taken out         | no-op        |
//! | `on_contains`  | on every membership test              | `None`       |
//!
//! # Examples
//!
//! ```rust
//! use figura_collections::mutable::IndexedArraySet;
//!
//! let mut layers = IndexedArraySet::new();
//! layers.push("background").unwrap();
//! layers.push("shapes").unwrap();
//! layers.insert(0, "grid").unwrap();
//!
//! assert_eq!(layers.as_slice(), &["grid", "background", "shapes"]);
//!
//! // Re-inserting moves the element.
//! layers.insert(3, "grid").unwrap();
//! assert_eq!(layers.as_slice(), &["background", "shapes", "grid"]);
//! ```

use std::fmt;

use crate::error::{CollectionError, Result};
use crate::fail_fast::{FailFast, ModificationGuard};
use crate::limits::checked_length;

// =============================================================================
// Hooks
// =============================================================================

/// Extension points of an [`IndexedArraySet`].
///
/// Every method has a default, so an implementation overrides only what it
/// needs.
///
/// # Examples
///
/// An observable set that keeps a change log:
///
/// ```rust
/// use figura_collections::mutable::{IndexedArraySet, SetHooks};
///
/// #[derive(Default)]
/// struct ChangeLog(Vec<String>);
///
/// impl SetHooks<&'static str> for ChangeLog {
///     fn on_added(&mut self, element: &&'static str) {
///         self.0.push(format!("+{element}"));
///     }
///
///     fn on_removed(&mut self, element: &&'static str) {
///         self.0.push(format!("-{element}"));
///     }
/// }
///
/// let mut set = IndexedArraySet::with_hooks(ChangeLog::default());
/// set.push("a").unwrap();
/// set.push("b").unwrap();
/// set.insert(0, "b").unwrap();
///
/// assert_eq!(set.hooks().0, vec!["+a", "+b", "-b", "+b"]);
/// ```
pub trait SetHooks<T> {
    /// Returns `false` to veto adding `element`.
    ///
    /// Only consulted for elements that are not already present; moving an
    /// existing element is never vetoed.
    fn may_be_added(&self, element: &T) -> bool {
        let _ = element;
        true
    }

    /// Called after `element` has been placed in the set.
    fn on_added(&mut self, element: &T) {
        let _ = element;
    }

    /// Called after `element` has been taken out of the set.
    fn on_removed(&mut self, element: &T) {
        let _ = element;
    }

    /// Answers a membership test without scanning.
    ///
    /// `None` means unknown and falls back to a linear scan.
    fn on_contains(&self, element: &T) -> Option<bool> {
        let _ = element;
        None
    }
}

/// Hooks that accept everything and observe nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoHooks;

impl<T> SetHooks<T> for NoHooks {}

// =============================================================================
// IndexedArraySet
// =============================================================================

/// A mutable set that stores its elements in caller-dictated order.
///
/// # Time Complexity
///
/// | Operation   | Complexity                               |
/// |-------------|------------------------------------------|
/// | `contains`  | O(n), or O(1) with an `on_contains` hook |
/// | `insert`    | O(n)                                     |
/// | `remove`    | O(n)                                     |
/// | `get`       | O(1)                                     |
/// | `len`       | O(1)                                     |
pub struct IndexedArraySet<T, H = NoHooks> {
    elements: Vec<T>,
    hooks: H,
    modification_count: u64,
}

impl<T> IndexedArraySet<T, NoHooks> {
    /// Creates an empty set without hooks.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_hooks(NoHooks)
    }
}

impl<T, H> IndexedArraySet<T, H> {
    /// Creates an empty set that reports to `hooks`.
    #[must_use]
    pub const fn with_hooks(hooks: H) -> Self {
        Self {
            elements: Vec::new(),
            hooks,
            modification_count: 0,
        }
    }

    /// Returns the number of elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the set contains no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.elements.get(index)
    }

    /// Returns the first element.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.elements.first()
    }

    /// Returns the last element.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.elements.last()
    }

    /// Returns an iterator in set order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    /// Returns the elements in set order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }

    /// Consumes the set and returns its elements in order.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.elements
    }

    /// Returns the hooks.
    #[must_use]
    pub const fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Returns the hooks mutably.
    pub const fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// Opens a fail-fast cursor positioned before the first element.
    #[must_use]
    pub fn cursor(&self) -> IndexedArraySetCursor {
        IndexedArraySetCursor {
            guard: ModificationGuard::capture(self),
            next_index: 0,
            current: None,
        }
    }
}

impl<T: PartialEq, H: SetHooks<T>> IndexedArraySet<T, H> {
    /// Returns the position of `element`.
    #[must_use]
    pub fn index_of(&self, element: &T) -> Option<usize> {
        if self.hooks.on_contains(element) == Some(false) {
            return None;
        }
        self.elements.iter().position(|candidate| candidate == element)
    }

    /// Returns `true` if the set contains `element`.
    ///
    /// Asks [`SetHooks::on_contains`] first and scans only if it has no
    /// answer.
    #[must_use]
    pub fn contains(&self, element: &T) -> bool {
        self.hooks
            .on_contains(element)
            .unwrap_or_else(|| self.elements.contains(element))
    }

    /// Inserts `element` before position `index`.
    ///
    /// If `element` is already present it is moved; `index` refers to the
    /// order before the move. Returns `Ok(false)` when the set is left
    /// unchanged: the element was already at that position, or the hooks
    /// vetoed it.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::IndexOutOfBounds`] if `index > len`, or
    /// [`CollectionError::SizeLimitExceeded`] if a new element would not fit.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::mutable::IndexedArraySet;
    ///
    /// let mut set: IndexedArraySet<_> = ["a", "b", "c"].into_iter().collect();
    ///
    /// assert_eq!(set.insert(1, "a"), Ok(false));
    /// assert_eq!(set.insert(0, "c"), Ok(true));
    /// assert_eq!(set.as_slice(), &["c", "a", "b"]);
    /// ```
    pub fn insert(&mut self, index: usize, element: T) -> Result<bool> {
        let length = self.elements.len();
        if index > length {
            return Err(CollectionError::IndexOutOfBounds { index, length });
        }

        if let Some(existing) = self.index_of(&element) {
            if index == existing || index == existing + 1 {
                return Ok(false);
            }
            let moved = self.elements.remove(existing);
            self.hooks.on_removed(&moved);
            let target = if index > existing { index - 1 } else { index };
            self.elements.insert(target, moved);
            self.hooks.on_added(&self.elements[target]);
            self.modification_count += 1;
            return Ok(true);
        }

        if !self.hooks.may_be_added(&element) {
            return Ok(false);
        }
        checked_length(length, 1)?;
        self.elements.insert(index, element);
        self.hooks.on_added(&self.elements[index]);
        self.modification_count += 1;
        Ok(true)
    }

    /// Appends `element` if it is absent. An existing element stays put.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::SizeLimitExceeded`] if the set is full.
    pub fn push(&mut self, element: T) -> Result<bool> {
        if self.contains(&element) || !self.hooks.may_be_added(&element) {
            return Ok(false);
        }
        checked_length(self.elements.len(), 1)?;
        self.elements.push(element);
        if let Some(added) = self.elements.last() {
            self.hooks.on_added(added);
        }
        self.modification_count += 1;
        Ok(true)
    }

    /// Removes `element`, returning `true` if it was present.
    pub fn remove(&mut self, element: &T) -> bool {
        self.index_of(element)
            .is_some_and(|index| self.remove_at(index).is_ok())
    }

    /// Removes and returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::IndexOutOfBounds`] if `index >= len`.
    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        let length = self.elements.len();
        if index >= length {
            return Err(CollectionError::IndexOutOfBounds { index, length });
        }
        let removed = self.elements.remove(index);
        self.hooks.on_removed(&removed);
        self.modification_count += 1;
        Ok(removed)
    }

    /// Removes every element, notifying the hooks for each.
    pub fn clear(&mut self) {
        if self.elements.is_empty() {
            return;
        }
        for removed in std::mem::take(&mut self.elements) {
            self.hooks.on_removed(&removed);
        }
        self.modification_count += 1;
    }
}

impl<T, H> FailFast for IndexedArraySet<T, H> {
    fn modification_count(&self) -> u64 {
        self.modification_count
    }
}

impl<T, H: Default> Default for IndexedArraySet<T, H> {
    fn default() -> Self {
        Self::with_hooks(H::default())
    }
}

impl<T: Clone, H: Clone> Clone for IndexedArraySet<T, H> {
    fn clone(&self) -> Self {
        Self {
            elements: self.elements.clone(),
            hooks: self.hooks.clone(),
            modification_count: 0,
        }
    }
}

/// # Panics
///
/// Panics where [`IndexedArraySet::push`] would return an error.
impl<T: PartialEq, H: SetHooks<T>> Extend<T> for IndexedArraySet<T, H> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for element in iter {
            if let Err(error) = self.push(element) {
                panic!("{error}");
            }
        }
    }
}

impl<T: PartialEq, H: SetHooks<T> + Default> FromIterator<T> for IndexedArraySet<T, H> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl<T, H> IntoIterator for IndexedArraySet<T, H> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a, T, H> IntoIterator for &'a IndexedArraySet<T, H> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

/// Two sets are equal when they hold equal elements in the same order.
impl<T: PartialEq, H> PartialEq for IndexedArraySet<T, H> {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl<T: Eq, H> Eq for IndexedArraySet<T, H> {}

impl<T: fmt::Debug, H> fmt::Debug for IndexedArraySet<T, H> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(&self.elements).finish()
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// A detached, fail-fast cursor over an [`IndexedArraySet`].
///
/// # Examples
///
/// ```rust
/// use figura_collections::mutable::IndexedArraySet;
///
/// let mut set: IndexedArraySet<_> = [1, 2, 3, 4].into_iter().collect();
/// let mut cursor = set.cursor();
///
/// while let Some(&value) = cursor.advance(&set).unwrap() {
///     if value % 2 == 0 {
///         cursor.remove(&mut set).unwrap();
///     }
/// }
/// assert_eq!(set.as_slice(), &[1, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct IndexedArraySetCursor {
    guard: ModificationGuard,
    next_index: usize,
    /// Index of the element last returned, until it is removed.
    current: Option<usize>,
}

impl IndexedArraySetCursor {
    /// Moves to the next element and returns it, or `None` at the end.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::ConcurrentModification`] if `set` was
    /// structurally modified other than through this cursor.
    pub fn advance<'s, T, H>(&mut self, set: &'s IndexedArraySet<T, H>) -> Result<Option<&'s T>> {
        self.guard.check(set)?;
        let element = set.get(self.next_index);
        if element.is_some() {
            self.current = Some(self.next_index);
            self.next_index += 1;
        } else {
            self.current = None;
        }
        Ok(element)
    }

    /// Removes the element last returned by [`advance`](Self::advance).
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::NoCurrentElement`] if there is no such
    /// element, and [`CollectionError::ConcurrentModification`] if `set`
    /// was modified behind the cursor.
    pub fn remove<T: PartialEq, H: SetHooks<T>>(
        &mut self,
        set: &mut IndexedArraySet<T, H>,
    ) -> Result<T> {
        self.guard.check(set)?;
        let index = self.current.take().ok_or(CollectionError::NoCurrentElement)?;
        let removed = set.remove_at(index)?;
        self.next_index = index;
        self.guard.resync(set);
        Ok(removed)
    }
}
