//! CHAMP trie nodes.
//!
//! A [`Node`] is either a bitmap node or a collision node.
//!
//! - **Bitmap node**: two disjoint 32-bit bitmaps index the 32 slots of one
//!   trie level. `data_map` marks slots holding an inline entry and
//!   `node_map` marks slots holding a child node. Payloads are stored
//!   compactly, in slot order, in `entries` and `children`.
//! - **Collision node**: two or more entries whose keys share the full 64-bit
//!   hash. Collision nodes only appear below the last bitmap level.
//!
//! Each level consumes 5 hash bits (the level at shift 60 consumes the last
//! 4). The trie is kept canonical: a non-root node never holds a lone inline
//! entry, because removal pulls such an entry up into the parent.
//!
//! All editing goes through [`make_editable`]. A node that does not belong to
//! the current owner is cloned before it is changed, so only the path from
//! the root to the edited slot is ever copied.

use std::borrow::Borrow;
use std::mem;

use smallvec::{SmallVec, smallvec};

use super::ReferenceCounter;
use super::hashing::HASH_BITS;
use super::owner::{OwnerToken, Stamped, make_editable};

// =============================================================================
// Constants and bitmap helpers
// =============================================================================

/// Bits of the hash consumed per trie level (2^5 = 32 slots).
pub(crate) const BITS_PER_LEVEL: u32 = 5;

/// Bit mask for extracting a fragment.
const FRAGMENT_MASK: u64 = (1 << BITS_PER_LEVEL) - 1;

/// Extracts the 5-bit hash fragment used at `shift`.
#[inline]
const fn fragment(hash: u64, shift: u32) -> u32 {
    ((hash >> shift) & FRAGMENT_MASK) as u32
}

/// Returns the bitmap bit of the slot `hash` selects at `shift`.
#[inline]
const fn slot_bit(hash: u64, shift: u32) -> u32 {
    1 << fragment(hash, shift)
}

/// Counts the populated slots below `bit`, i.e. the compact array index.
#[inline]
const fn compact_index(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

// =============================================================================
// Node Definition
// =============================================================================

/// A key-value pair with the cached hash of its key.
#[derive(Clone)]
pub(crate) struct Entry<K, V> {
    pub(crate) hash: u64,
    pub(crate) key: K,
    pub(crate) value: V,
}

/// Bitmap-indexed branch of the trie.
#[derive(Clone)]
pub(crate) struct BitmapNode<K, V> {
    /// Slots holding an inline entry.
    data_map: u32,
    /// Slots holding a child node.
    node_map: u32,
    /// Inline entries, in slot order.
    entries: Vec<Entry<K, V>>,
    /// Child nodes, in slot order.
    children: Vec<ReferenceCounter<Node<K, V>>>,
    owner: Option<OwnerToken>,
}

/// Entries whose keys share one full hash.
#[derive(Clone)]
pub(crate) struct CollisionNode<K, V> {
    hash: u64,
    entries: SmallVec<[Entry<K, V>; 2]>,
    owner: Option<OwnerToken>,
}

/// A CHAMP trie node.
#[derive(Clone)]
pub(crate) enum Node<K, V> {
    Bitmap(BitmapNode<K, V>),
    Collision(CollisionNode<K, V>),
}

impl<K, V> Stamped for Node<K, V> {
    fn owner(&self) -> Option<OwnerToken> {
        match self {
            Self::Bitmap(node) => node.owner,
            Self::Collision(node) => node.owner,
        }
    }

    fn stamp(&mut self, owner: OwnerToken) {
        match self {
            Self::Bitmap(node) => node.owner = Some(owner),
            Self::Collision(node) => node.owner = Some(owner),
        }
    }
}

impl<K, V> Node<K, V> {
    /// Creates the root of an empty trie.
    pub(crate) const fn empty() -> Self {
        Self::Bitmap(BitmapNode {
            data_map: 0,
            node_map: 0,
            entries: Vec::new(),
            children: Vec::new(),
            owner: None,
        })
    }

    /// Inline entries of this node, in slot order.
    pub(crate) fn entries(&self) -> &[Entry<K, V>] {
        match self {
            Self::Bitmap(node) => &node.entries,
            Self::Collision(node) => &node.entries,
        }
    }

    /// Child nodes of this node, in slot order.
    pub(crate) fn children(&self) -> &[ReferenceCounter<Self>] {
        match self {
            Self::Bitmap(node) => &node.children,
            Self::Collision(_) => &[],
        }
    }

    /// Returns the only entry of a node that holds exactly one entry and no children.
    fn sole_entry(&self) -> Option<&Entry<K, V>> {
        match self {
            Self::Bitmap(node) if node.node_map == 0 && node.entries.len() == 1 => {
                node.entries.first()
            }
            Self::Collision(node) if node.entries.len() == 1 => node.entries.first(),
            _ => None,
        }
    }

    /// Looks up the entry for `key`, whose hash is `hash`.
    pub(crate) fn find<Q>(&self, hash: u64, key: &Q) -> Option<&Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let mut node = self;
        let mut shift = 0;

        loop {
            match node {
                Self::Bitmap(bitmap) => {
                    let bit = slot_bit(hash, shift);
                    if bitmap.data_map & bit != 0 {
                        let entry = &bitmap.entries[compact_index(bitmap.data_map, bit)];
                        return (entry.hash == hash && entry.key.borrow() == key).then_some(entry);
                    }
                    if bitmap.node_map & bit == 0 {
                        return None;
                    }
                    node = bitmap.children[compact_index(bitmap.node_map, bit)].as_ref();
                    shift += BITS_PER_LEVEL;
                }
                Self::Collision(collision) => {
                    if collision.hash != hash {
                        return None;
                    }
                    return collision
                        .entries
                        .iter()
                        .find(|entry| entry.key.borrow() == key);
                }
            }
        }
    }

    /// Depth of the deepest node below and including this one.
    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(|child| child.depth())
            .max()
            .unwrap_or(0)
    }
}

impl<K: Clone + Eq, V: Clone> Node<K, V> {
    /// Inserts `entry` below `node`, returning the value it replaced.
    ///
    /// `shift` is the bit offset of the level `node` sits at.
    pub(crate) fn insert(
        node: &mut ReferenceCounter<Self>,
        owner: OwnerToken,
        entry: Entry<K, V>,
        shift: u32,
    ) -> Option<V> {
        match make_editable(node, owner) {
            Self::Bitmap(bitmap) => bitmap.insert(owner, entry, shift),
            Self::Collision(collision) => collision.insert(entry),
        }
    }

    /// Removes the entry for `key` below `node`.
    ///
    /// Callers check presence with [`find`](Self::find) first, because an
    /// editable copy of the path is taken even when nothing matches.
    pub(crate) fn remove<Q>(
        node: &mut ReferenceCounter<Self>,
        owner: OwnerToken,
        hash: u64,
        key: &Q,
        shift: u32,
    ) -> Option<Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        match make_editable(node, owner) {
            Self::Bitmap(bitmap) => bitmap.remove(owner, hash, key, shift),
            Self::Collision(collision) => {
                let position = collision
                    .entries
                    .iter()
                    .position(|entry| entry.key.borrow() == key)?;
                Some(collision.entries.remove(position))
            }
        }
    }

    /// Builds the smallest subtree at `shift` holding two entries with distinct keys.
    fn merge_pair(first: Entry<K, V>, second: Entry<K, V>, shift: u32, owner: OwnerToken) -> Self {
        if shift >= HASH_BITS {
            return Self::Collision(CollisionNode {
                hash: first.hash,
                entries: smallvec![first, second],
                owner: Some(owner),
            });
        }

        let first_fragment = fragment(first.hash, shift);
        let second_fragment = fragment(second.hash, shift);

        if first_fragment == second_fragment {
            let child = Self::merge_pair(first, second, shift + BITS_PER_LEVEL, owner);
            Self::Bitmap(BitmapNode {
                data_map: 0,
                node_map: 1 << first_fragment,
                entries: Vec::new(),
                children: vec![ReferenceCounter::new(child)],
                owner: Some(owner),
            })
        } else {
            let entries = if first_fragment < second_fragment {
                vec![first, second]
            } else {
                vec![second, first]
            };
            Self::Bitmap(BitmapNode {
                data_map: (1 << first_fragment) | (1 << second_fragment),
                node_map: 0,
                entries,
                children: Vec::new(),
                owner: Some(owner),
            })
        }
    }
}

impl<K: Clone + Eq, V: Clone> BitmapNode<K, V> {
    fn insert(&mut self, owner: OwnerToken, entry: Entry<K, V>, shift: u32) -> Option<V> {
        let bit = slot_bit(entry.hash, shift);

        if self.data_map & bit != 0 {
            let index = compact_index(self.data_map, bit);
            let existing = &mut self.entries[index];
            if existing.hash == entry.hash && existing.key == entry.key {
                return Some(mem::replace(&mut existing.value, entry.value));
            }

            // Two keys compete for one slot: push both down a level.
            let existing = self.entries.remove(index);
            self.data_map ^= bit;
            let child = Node::merge_pair(existing, entry, shift + BITS_PER_LEVEL, owner);
            self.node_map |= bit;
            self.children.insert(
                compact_index(self.node_map, bit),
                ReferenceCounter::new(child),
            );
            None
        } else if self.node_map & bit != 0 {
            let index = compact_index(self.node_map, bit);
            Node::insert(
                &mut self.children[index],
                owner,
                entry,
                shift + BITS_PER_LEVEL,
            )
        } else {
            self.data_map |= bit;
            self.entries
                .insert(compact_index(self.data_map, bit), entry);
            None
        }
    }

    fn remove<Q>(
        &mut self,
        owner: OwnerToken,
        hash: u64,
        key: &Q,
        shift: u32,
    ) -> Option<Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let bit = slot_bit(hash, shift);

        if self.data_map & bit != 0 {
            let index = compact_index(self.data_map, bit);
            let entry = &self.entries[index];
            if entry.hash != hash || entry.key.borrow() != key {
                return None;
            }
            self.data_map ^= bit;
            return Some(self.entries.remove(index));
        }

        if self.node_map & bit == 0 {
            return None;
        }

        let index = compact_index(self.node_map, bit);
        let removed = Node::remove(
            &mut self.children[index],
            owner,
            hash,
            key,
            shift + BITS_PER_LEVEL,
        )?;

        if let Some(sole) = self.children[index].sole_entry().cloned() {
            self.children.remove(index);
            self.node_map ^= bit;
            self.data_map |= bit;
            self.entries.insert(compact_index(self.data_map, bit), sole);
        }

        Some(removed)
    }
}

impl<K: Eq, V: Clone> CollisionNode<K, V> {
    fn insert(&mut self, entry: Entry<K, V>) -> Option<V> {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|existing| existing.key == entry.key)
        {
            return Some(mem::replace(&mut existing.value, entry.value));
        }
        self.entries.push(entry);
        None
    }
}

// =============================================================================
// Tests
// =============================================================================
