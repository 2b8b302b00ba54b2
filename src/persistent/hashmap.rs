//! Persistent (immutable) hash map based on CHAMP.
//!
//! This module provides [`PersistentHashMap`], an immutable hash map
//! that uses structural sharing for efficient operations, and
//! [`TransientHashMap`], its single-owner builder.
//!
//! # Overview
//!
//! `PersistentHashMap` is a Compressed Hash-Array Mapped Prefix-tree (CHAMP).
//! Each trie level is indexed by 5 bits of the key's 64-bit hash, and every
//! node keeps its inline entries and its child nodes in two separate compact
//! arrays. The trie is canonical: equal maps always have the same shape.
//!
//! - O(log32 N) get (effectively O(1) for practical sizes)
//! - O(log32 N) insert
//! - O(log32 N) remove
//! - O(1) len and `is_empty`
//!
//! All operations return new maps without modifying the original,
//! and structural sharing ensures memory efficiency.
//!
//! # Examples
//!
//! ```rust
//! use figura_collections::persistent::PersistentHashMap;
//!
//! let map = PersistentHashMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2)
//!     .insert("three".to_string(), 3);
//!
//! assert_eq!(map.get("one"), Some(&1));
//! assert_eq!(map.get("two"), Some(&2));
//! assert_eq!(map.get("three"), Some(&3));
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));       // Original unchanged
//! assert_eq!(updated.get("one"), Some(&100)); // New version
//! ```
//!
//! # Transient Editing
//!
//! ```rust
//! use figura_collections::persistent::PersistentHashMap;
//!
//! let mut builder = PersistentHashMap::new().transient();
//! for index in 0..100 {
//!     builder.insert(index, index * 2).unwrap();
//! }
//! let map = builder.build().unwrap();
//! assert_eq!(map.len(), 100);
//! assert!(builder.insert(1, 1).is_err()); // Sealed
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::rc::Rc;

use smallvec::{SmallVec, smallvec};

use super::ReferenceCounter;
use super::hashing::hash_of;
use super::owner::OwnerToken;
use super::trie::{Entry, Node};
use crate::error::{CollectionError, Result};
use crate::fail_fast::{FailFast, ModificationGuard};
use crate::limits::{MAX_LENGTH, checked_length};

// =============================================================================
// PersistentHashMap Definition
// =============================================================================

/// A persistent (immutable) hash map based on CHAMP.
///
/// `PersistentHashMap` is an immutable data structure that uses structural
/// sharing: an update copies only the nodes on the path to the changed slot.
///
/// # Time Complexity
///
/// | Operation      | Complexity        |
/// |----------------|-------------------|
/// | `new`          | O(1)              |
/// | `get`          | O(log32 N)        |
/// | `insert`       | O(log32 N)        |
/// | `remove`       | O(log32 N)        |
/// | `contains_key` | O(log32 N)        |
/// | `len`          | O(1)              |
/// | `is_empty`     | O(1)              |
///
/// # Iteration Order
///
/// Iteration follows the trie structure and is unspecified, but it is
/// deterministic for a given set of keys.
///
/// # Examples
///
/// ```rust
/// use figura_collections::persistent::PersistentHashMap;
///
/// let map = PersistentHashMap::singleton("key".to_string(), 42);
/// assert_eq!(map.get("key"), Some(&42));
/// ```
pub struct PersistentHashMap<K, V> {
    /// Root node of the trie
    root: ReferenceCounter<Node<K, V>>,
    /// Number of entries
    length: usize,
}

impl<K, V> Clone for PersistentHashMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            length: self.length,
        }
    }
}

impl<K, V> PersistentHashMap<K, V> {
    /// Creates a new empty map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentHashMap;
    ///
    /// let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: ReferenceCounter::new(Node::empty()),
            length: 0,
        }
    }

    /// Returns the number of entries in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map contains no entries.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns an iterator over key-value pairs.
    ///
    /// The iterator walks the trie without collecting it first, and calling
    /// `iter()` again restarts from the beginning.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    ///
    /// let total: i32 = map.iter().map(|(_, value)| value).sum();
    /// assert_eq!(total, 3);
    /// ```
    #[must_use]
    pub fn iter(&self) -> PersistentHashMapIterator<'_, K, V> {
        PersistentHashMapIterator::new(&self.root, self.length)
    }

    /// Returns an iterator over keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    ///
    /// let sum: i32 = map.values().sum();
    /// assert_eq!(sum, 3);
    /// ```
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }
}

impl<K: Hash + Eq, V> PersistentHashMap<K, V> {
    /// Returns a reference to the value for a key.
    ///
    /// The key may be any borrowed form of the map's key type, but
    /// `Hash` and `Eq` on the borrowed form must match those for the key type.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().insert("hello".to_string(), 42);
    ///
    /// // Can use &str to look up String keys
    /// assert_eq!(map.get("hello"), Some(&42));
    /// assert_eq!(map.get("world"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.root
            .find(hash_of(key), key)
            .map(|entry| &entry.value)
    }

    /// Returns `true` if the map contains the key.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.root.find(hash_of(key), key).is_some()
    }

    /// Returns `true` if any entry holds a value equal to `value`.
    ///
    /// # Complexity
    ///
    /// O(N)
    #[must_use]
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values().any(|candidate| candidate == value)
    }
}

impl<K: Clone + Hash + Eq, V: Clone> PersistentHashMap<K, V> {
    /// Creates a map containing a single entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::singleton("key".to_string(), 42);
    /// assert_eq!(map.len(), 1);
    /// assert_eq!(map.get("key"), Some(&42));
    /// ```
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        Self::new().insert(key, value)
    }

    /// Inserts a key-value pair into the map, replacing the value of an
    /// existing key.
    ///
    /// Returns a new map; the original is unchanged.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Panics
    ///
    /// Panics if the map already holds [`MAX_LENGTH`] entries and the key is
    /// new. Use [`try_insert`](Self::try_insert) to handle that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentHashMap;
    ///
    /// let map1 = PersistentHashMap::new().insert("key".to_string(), 1);
    /// let map2 = map1.insert("key".to_string(), 2);
    ///
    /// assert_eq!(map1.get("key"), Some(&1)); // Original unchanged
    /// assert_eq!(map2.get("key"), Some(&2)); // New version
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        self.try_insert(key, value)
            .unwrap_or_else(|error| panic!("{error}"))
    }

    /// Inserts a key-value pair, failing instead of growing past [`MAX_LENGTH`].
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::SizeLimitExceeded`] if the key is new and the
    /// map is already full.
    pub fn try_insert(&self, key: K, value: V) -> Result<Self> {
        let hash = hash_of(&key);
        let mut root = self.root.clone();
        let replaced = Node::insert(&mut root, OwnerToken::fresh(), Entry { hash, key, value }, 0);
        let length = if replaced.is_some() {
            self.length
        } else {
            checked_length(self.length, 1)?
        };
        Ok(Self { root, length })
    }

    /// Removes a key from the map.
    ///
    /// Returns the map unchanged (sharing its root) if the key is absent.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// let removed = map.remove("a");
    ///
    /// assert_eq!(map.len(), 2);     // Original unchanged
    /// assert_eq!(removed.len(), 1); // New version
    /// assert_eq!(removed.get("a"), None);
    /// ```
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_of(key);
        if self.root.find(hash, key).is_none() {
            return self.clone();
        }

        let mut root = self.root.clone();
        Node::remove(&mut root, OwnerToken::fresh(), hash, key, 0);
        Self {
            root,
            length: self.length - 1,
        }
    }

    /// Inserts every pair of `entries`, later pairs winning on equal keys.
    ///
    /// The batch runs through one transient session, so shared nodes are
    /// copied at most once.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::SizeLimitExceeded`] if the result would
    /// exceed [`MAX_LENGTH`] entries.
    pub fn insert_all<I>(&self, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut transient = self.clone().transient();
        transient.insert_all(entries)?;
        transient.build()
    }

    /// Updates or removes a value for a key using an updater function.
    ///
    /// The updater function receives `Some(&V)` if the key exists, or `None` if it doesn't.
    /// If the updater returns `Some(V)`, the value is inserted or updated.
    /// If the updater returns `None`, the key is removed (if it exists).
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().insert("count".to_string(), 10);
    ///
    /// let updated = map.update_with("count", |maybe_value| {
    ///     maybe_value.map(|value| value + 1)
    /// });
    /// assert_eq!(updated.get("count"), Some(&11));
    ///
    /// let removed = map.update_with("count", |_| None);
    /// assert_eq!(removed.get("count"), None);
    /// ```
    #[must_use]
    pub fn update_with<Q, F>(&self, key: &Q, updater: F) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let hash = hash_of(key);
        let current = self.root.find(hash, key);
        let replacement = updater(current.map(|entry| &entry.value));

        match (current, replacement) {
            (Some(entry), Some(value)) => self.insert(entry.key.clone(), value),
            (Some(_), None) => self.remove(key),
            (None, Some(value)) => self.insert(key.to_owned(), value),
            (None, None) => self.clone(),
        }
    }

    /// Merges two maps, with values from `other` taking precedence on key conflicts.
    ///
    /// # Complexity
    ///
    /// O(m log32 (n + m)) where m is the size of `other`
    ///
    /// # Panics
    ///
    /// Panics if the merged map would exceed [`MAX_LENGTH`] entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::persistent::PersistentHashMap;
    ///
    /// let map1 = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// let map2 = PersistentHashMap::new()
    ///     .insert("b".to_string(), 20)
    ///     .insert("c".to_string(), 3);
    ///
    /// let merged = map1.merge(&map2);
    ///
    /// assert_eq!(merged.get("a"), Some(&1));
    /// assert_eq!(merged.get("b"), Some(&20)); // From map2
    /// assert_eq!(merged.get("c"), Some(&3));
    /// ```
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        self.insert_all(
            other
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        )
        .unwrap_or_else(|error| panic!("{error}"))
    }

    /// Converts this map into a [`TransientHashMap`] for batch editing.
    ///
    /// The transient starts by sharing every node with `self`; it copies a
    /// node the first time it edits it and then edits that copy in place.
    #[must_use]
    pub fn transient(self) -> TransientHashMap<K, V> {
        TransientHashMap::from_parts(self.root, self.length)
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over key-value pairs of a [`PersistentHashMap`].
pub struct PersistentHashMapIterator<'a, K, V> {
    entries: std::slice::Iter<'a, Entry<K, V>>,
    stack: SmallVec<[std::slice::Iter<'a, ReferenceCounter<Node<K, V>>>; 8]>,
    remaining: usize,
}

impl<'a, K, V> PersistentHashMapIterator<'a, K, V> {
    fn new(root: &'a Node<K, V>, length: usize) -> Self {
        Self {
            entries: root.entries().iter(),
            stack: smallvec![root.children().iter()],
            remaining: length,
        }
    }
}

impl<'a, K, V> Iterator for PersistentHashMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.entries.next() {
                self.remaining = self.remaining.saturating_sub(1);
                return Some((&entry.key, &entry.value));
            }
            match self.stack.last_mut()?.next() {
                Some(child) => {
                    self.entries = child.entries().iter();
                    self.stack.push(child.children().iter());
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for PersistentHashMapIterator<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

/// One node being walked by [`PersistentHashMapIntoIterator`].
struct SnapshotFrame<K, V> {
    node: ReferenceCounter<Node<K, V>>,
    next_entry: usize,
    next_child: usize,
}

/// An owning iterator over key-value pairs of a [`PersistentHashMap`].
///
/// Holds references to the trie nodes, so it stays valid however the
/// original map (or a transient sharing its nodes) is edited later.
pub struct PersistentHashMapIntoIterator<K, V> {
    stack: Vec<SnapshotFrame<K, V>>,
    remaining: usize,
}

impl<K, V> PersistentHashMapIntoIterator<K, V> {
    pub(crate) fn new(root: ReferenceCounter<Node<K, V>>, length: usize) -> Self {
        Self {
            stack: vec![SnapshotFrame {
                node: root,
                next_entry: 0,
                next_child: 0,
            }],
            remaining: length,
        }
    }
}

impl<K: Clone, V: Clone> Iterator for PersistentHashMapIntoIterator<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;

            if let Some(entry) = frame.node.entries().get(frame.next_entry) {
                frame.next_entry += 1;
                self.remaining = self.remaining.saturating_sub(1);
                return Some((entry.key.clone(), entry.value.clone()));
            }

            if let Some(child) = frame.node.children().get(frame.next_child).cloned() {
                frame.next_child += 1;
                self.stack.push(SnapshotFrame {
                    node: child,
                    next_entry: 0,
                    next_child: 0,
                });
            } else {
                self.stack.pop();
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Clone, V: Clone> ExactSizeIterator for PersistentHashMapIntoIterator<K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

// =============================================================================
// TransientHashMap Definition
// =============================================================================

/// A single-owner, mutable builder for [`PersistentHashMap`].
///
/// Every operation returns a [`Result`]: once [`build`](Self::build) has been
/// called the builder is sealed and all further operations fail with
/// [`CollectionError::BuilderSealed`]. A transient is neither `Send` nor
/// `Sync`.
///
/// # Examples
///
/// ```rust
/// use figura_collections::persistent::TransientHashMap;
///
/// let mut builder = TransientHashMap::new();
/// builder.insert("a", 1).unwrap();
/// builder.insert("b", 2).unwrap();
/// assert_eq!(builder.remove("a").unwrap(), Some(1));
///
/// let map = builder.build().unwrap();
/// assert_eq!(map.len(), 1);
/// ```
pub struct TransientHashMap<K, V> {
    root: ReferenceCounter<Node<K, V>>,
    length: usize,
    /// `None` once sealed.
    owner: Option<OwnerToken>,
    modification_count: u64,
    _marker: PhantomData<Rc<()>>,
}

static_assertions::assert_not_impl_any!(TransientHashMap<i32, i32>: Send, Sync);

impl<K, V> TransientHashMap<K, V> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(ReferenceCounter::new(Node::empty()), 0)
    }

    fn from_parts(root: ReferenceCounter<Node<K, V>>, length: usize) -> Self {
        Self {
            root,
            length,
            owner: Some(OwnerToken::fresh()),
            modification_count: 0,
            _marker: PhantomData,
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the builder holds no entries.
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
            tracing::debug!("operation rejected on sealed transient hash map");
            CollectionError::BuilderSealed
        })
    }

    /// Seals the builder and returns the persistent map it built.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`] if already sealed.
    pub fn build(&mut self) -> Result<PersistentHashMap<K, V>> {
        self.session()?;
        self.owner = None;
        let root = std::mem::replace(&mut self.root, ReferenceCounter::new(Node::empty()));
        let length = std::mem::take(&mut self.length);
        tracing::debug!(length, "sealed transient hash map");
        Ok(PersistentHashMap { root, length })
    }
}

impl<K: Hash + Eq, V> TransientHashMap<K, V> {
    /// Returns a reference to the value for a key.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`] if sealed.
    pub fn get<Q>(&self, key: &Q) -> Result<Option<&V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.session()?;
        Ok(self
            .root
            .find(hash_of(key), key)
            .map(|entry| &entry.value))
    }

    /// Returns `true` if the builder contains the key.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`] if sealed.
    pub fn contains_key<Q>(&self, key: &Q) -> Result<bool>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Ok(self.get(key)?.is_some())
    }
}

impl<K: Clone + Hash + Eq, V: Clone> TransientHashMap<K, V> {
    /// Inserts a key-value pair in place, returning the replaced value.
    ///
    /// Adding a new key counts as a structural modification; replacing the
    /// value of an existing key does not.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`] if sealed, or
    /// [`CollectionError::SizeLimitExceeded`] if the key is new and the
    /// builder already holds [`MAX_LENGTH`] entries.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        let owner = self.session()?;
        let hash = hash_of(&key);

        if self.length >= MAX_LENGTH && self.root.find(hash, &key).is_none() {
            checked_length(self.length, 1)?;
        }

        let replaced = Node::insert(&mut self.root, owner, Entry { hash, key, value }, 0);
        if replaced.is_none() {
            self.length += 1;
            self.modification_count += 1;
        }
        Ok(replaced)
    }

    /// Removes a key in place, returning its value.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`] if sealed.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let owner = self.session()?;
        let hash = hash_of(key);
        if self.root.find(hash, key).is_none() {
            return Ok(None);
        }

        let removed = Node::remove(&mut self.root, owner, hash, key, 0);
        self.length -= 1;
        self.modification_count += 1;
        Ok(removed.map(|entry| entry.value))
    }

    /// Inserts every pair of `entries`.
    ///
    /// # Errors
    ///
    /// Stops at the first failing insert and returns its error; pairs before
    /// it stay inserted.
    pub fn insert_all<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.insert(key, value)?;
        }
        Ok(())
    }

    /// Opens a fail-fast cursor over the current entries.
    ///
    /// The cursor walks a snapshot taken now. Its steps fail once the builder
    /// is modified other than through [`TransientHashMapCursor::remove`].
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::BuilderSealed`] if sealed.
    pub fn cursor(&self) -> Result<TransientHashMapCursor<K, V>> {
        self.session()?;
        Ok(TransientHashMapCursor {
            snapshot: PersistentHashMapIntoIterator::new(self.root.clone(), self.length),
            guard: ModificationGuard::capture(self),
            current: None,
        })
    }
}

impl<K, V> FailFast for TransientHashMap<K, V> {
    fn modification_count(&self) -> u64 {
        self.modification_count
    }
}

impl<K, V> Default for TransientHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// # Panics
///
/// Panics where [`TransientHashMap::insert`] would return an error.
impl<K: Clone + Hash + Eq, V: Clone> Extend<(K, V)> for TransientHashMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        if let Err(error) = self.insert_all(iter) {
            panic!("{error}");
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for TransientHashMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TransientHashMap")
            .field("length", &self.length)
            .field("sealed", &self.is_sealed())
            .finish_non_exhaustive()
    }
}

/// A detached, fail-fast cursor over a [`TransientHashMap`].
///
/// The cursor does not borrow the map; each step takes it as an argument.
///
/// # Examples
///
/// ```rust
/// use figura_collections::persistent::TransientHashMap;
///
/// let mut builder = TransientHashMap::new();
/// builder.insert_all([("a", 1), ("b", 2), ("c", 3)]).unwrap();
///
/// let mut cursor = builder.cursor().unwrap();
/// while let Some((_, value)) = cursor.advance(&builder).unwrap() {
///     if value % 2 == 1 {
///         cursor.remove(&mut builder).unwrap();
///     }
/// }
/// assert_eq!(builder.len(), 1);
/// ```
pub struct TransientHashMapCursor<K, V> {
    snapshot: PersistentHashMapIntoIterator<K, V>,
    guard: ModificationGuard,
    current: Option<K>,
}

impl<K: Clone + Hash + Eq, V: Clone> TransientHashMapCursor<K, V> {
    /// Moves to the next entry and returns it, or `None` at the end.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::ConcurrentModification`] if `map` was
    /// modified since the cursor was opened (or last removed through), and
    /// [`CollectionError::BuilderSealed`] if `map` is sealed.
    pub fn advance(&mut self, map: &TransientHashMap<K, V>) -> Result<Option<(K, V)>> {
        map.session()?;
        self.guard.check(map)?;
        let next = self.snapshot.next();
        self.current = next.as_ref().map(|(key, _)| key.clone());
        Ok(next)
    }

    /// Removes the entry last returned by [`advance`](Self::advance).
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::NoCurrentElement`] if there is no such
    /// entry (nothing returned yet, or it was already removed), and the
    /// errors of [`advance`](Self::advance) otherwise.
    pub fn remove(&mut self, map: &mut TransientHashMap<K, V>) -> Result<V> {
        map.session()?;
        self.guard.check(map)?;
        let key = self.current.take().ok_or(CollectionError::NoCurrentElement)?;
        let removed = map
            .remove(&key)?
            .ok_or(CollectionError::NoCurrentElement)?;
        self.guard.resync(map);
        Ok(removed)
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V> Default for PersistentHashMap<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Hash + Eq, V: Clone> FromIterator<(K, V)> for PersistentHashMap<K, V> {
    /// # Panics
    ///
    /// Panics if the iterator yields more than [`MAX_LENGTH`] distinct keys.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new()
            .insert_all(iter)
            .unwrap_or_else(|error| panic!("{error}"))
    }
}

impl<K: Clone, V: Clone> IntoIterator for PersistentHashMap<K, V> {
    type Item = (K, V);
    type IntoIter = PersistentHashMapIntoIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentHashMapIntoIterator::new(self.root, self.length)
    }
}

impl<'a, K, V> IntoIterator for &'a PersistentHashMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = PersistentHashMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Hash + Eq, V: PartialEq> PartialEq for PersistentHashMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        if self.length != other.length {
            return false;
        }
        if ReferenceCounter::ptr_eq(&self.root, &other.root) {
            return true;
        }

        self.iter()
            .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K: Hash + Eq, V: Eq> Eq for PersistentHashMap<K, V> {}

/// Order-independent: the length, then the wrapping sum of per-entry hashes.
impl<K: Hash + Eq, V: Hash> Hash for PersistentHashMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let combined = self
            .iter()
            .fold(0_u64, |accumulator, entry| accumulator.wrapping_add(hash_of(&entry)));
        self.length.hash(state);
        combined.hash(state);
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PersistentHashMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K, V> serde::Serialize for PersistentHashMap<K, V>
where
    K: serde::Serialize,
    V: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentHashMapVisitor<K, V> {
    marker: PhantomData<(K, V)>,
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for PersistentHashMapVisitor<K, V>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    type Value = PersistentHashMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        use serde::de::Error;

        let mut builder = TransientHashMap::new();
        while let Some((key, value)) = access.next_entry()? {
            builder.insert(key, value).map_err(A::Error::custom)?;
        }
        builder.build().map_err(A::Error::custom)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for PersistentHashMap<K, V>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentHashMapVisitor {
            marker: PhantomData,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// A key whose hash is chosen by the test.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct FixedHash {
        name: &'static str,
        hash: u64,
    }

    impl Hash for FixedHash {
        fn hash<H: Hasher>(&self, state: &mut H) {
            state.write_u64(self.hash);
        }
    }

    fn colliding(name: &'static str) -> FixedHash {
        FixedHash { name, hash: 7 }
    }

    #[rstest]
    fn test_new_creates_empty() {
        let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.iter().count(), 0);
    }

    #[rstest]
    fn test_insert_get_remove() {
        let map = PersistentHashMap::new()
            .insert("a".to_string(), 1)
            .insert("b".to_string(), 2);

        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.get("b"), Some(&2));

        let removed = map.remove("a");
        assert_eq!(removed.get("a"), None);
        assert_eq!(removed.len(), 1);
        assert_eq!(map.len(), 2);
    }

    #[rstest]
    fn test_remove_absent_shares_root() {
        let map = PersistentHashMap::new().insert(1, 1);
        let same = map.remove(&2);
        assert!(ReferenceCounter::ptr_eq(&map.root, &same.root));
    }

    #[rstest]
    fn test_colliding_keys_coexist() {
        let map = PersistentHashMap::new()
            .insert(colliding("a"), 1)
            .insert(colliding("b"), 2)
            .insert(colliding("c"), 3);

        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&colliding("b")), Some(&2));

        let removed = map.remove(&colliding("a")).remove(&colliding("c"));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed.get(&colliding("b")), Some(&2));
        assert_eq!(removed.root.depth(), 1);
    }

    #[rstest]
    fn test_contains_value() {
        let map = PersistentHashMap::new().insert("a", 1).insert("b", 2);
        assert!(map.contains_value(&2));
        assert!(!map.contains_value(&3));
    }

    #[rstest]
    fn test_iteration_is_restartable_and_exact() {
        let map: PersistentHashMap<i32, i32> = (0..200).map(|index| (index, index)).collect();
        let mut iterator = map.iter();
        assert_eq!(iterator.len(), 200);
        iterator.next();
        assert_eq!(iterator.len(), 199);

        let first: Vec<_> = map.iter().collect();
        let second: Vec<_> = map.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 200);
    }

    #[rstest]
    fn test_equal_maps_hash_equal_regardless_of_history() {
        let forward: PersistentHashMap<i32, i32> = (0..50).map(|index| (index, index)).collect();
        let backward: PersistentHashMap<i32, i32> =
            (0..50).rev().map(|index| (index, index)).collect();

        assert_eq!(forward, backward);
        assert_eq!(hash_of(&forward), hash_of(&backward));
    }

    #[rstest]
    fn test_transient_sealed_after_build() {
        let mut builder = TransientHashMap::new();
        builder.insert(1, "one").unwrap();
        let map = builder.build().unwrap();

        assert_eq!(map.get(&1), Some(&"one"));
        assert!(builder.is_sealed());
        assert_eq!(builder.insert(2, "two"), Err(CollectionError::BuilderSealed));
        assert_eq!(builder.get(&1), Err(CollectionError::BuilderSealed));
        assert!(matches!(builder.build(), Err(CollectionError::BuilderSealed)));
    }

    #[rstest]
    fn test_transient_does_not_disturb_source() {
        let original: PersistentHashMap<i32, i32> = (0..100).map(|index| (index, index)).collect();
        let mut builder = original.clone().transient();
        builder.insert(0, -1).unwrap();
        builder.remove(&1).unwrap();
        let edited = builder.build().unwrap();

        assert_eq!(original.get(&0), Some(&0));
        assert_eq!(original.get(&1), Some(&1));
        assert_eq!(edited.get(&0), Some(&-1));
        assert_eq!(edited.get(&1), None);
    }

    #[rstest]
    fn test_replacing_value_is_not_structural() {
        let mut builder = TransientHashMap::new();
        builder.insert("a", 1).unwrap();
        let before = builder.modification_count();
        builder.insert("a", 2).unwrap();
        assert_eq!(builder.modification_count(), before);
    }

    #[rstest]
    fn test_cursor_detects_outside_removal() {
        let mut builder = TransientHashMap::new();
        builder.insert_all([("a", 1), ("b", 2), ("c", 3)]).unwrap();

        let mut cursor = builder.cursor().unwrap();
        assert!(cursor.advance(&builder).unwrap().is_some());

        builder.remove("a").unwrap();

        assert!(matches!(
            cursor.advance(&builder),
            Err(CollectionError::ConcurrentModification { .. })
        ));
    }

    #[rstest]
    fn test_cursor_remove_requires_current() {
        let mut builder = TransientHashMap::new();
        builder.insert("a", 1).unwrap();
        let mut cursor = builder.cursor().unwrap();

        assert_eq!(cursor.remove(&mut builder), Err(CollectionError::NoCurrentElement));

        cursor.advance(&builder).unwrap();
        assert_eq!(cursor.remove(&mut builder), Ok(1));
        assert_eq!(cursor.remove(&mut builder), Err(CollectionError::NoCurrentElement));
        assert_eq!(cursor.advance(&builder), Ok(None));
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_serialize_single_entry() {
        let map = PersistentHashMap::singleton("key".to_string(), 42);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"key":42}"#);
    }

    #[rstest]
    fn test_deserialize_multiple_entries() {
        let json = r#"{"a":1,"b":2,"c":3}"#;
        let map: PersistentHashMap<String, i32> = serde_json::from_str(json).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("b"), Some(&2));
    }
}
