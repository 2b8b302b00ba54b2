//! Relaxed Radix Balanced (RRB) tree nodes.
//!
//! Leaves hold up to 32 elements and branches hold up to 32 children. A
//! branch is either *balanced*, where every child but the last holds exactly
//! `1 << shift` elements and an index is routed by radix arithmetic, or
//! *relaxed*, where it carries a table of cumulative child sizes that is
//! searched instead.
//!
//! A node's `shift` is the bit offset used to route an index to one of its
//! children: leaves sit at shift 0, their parents at shift 5, and so on. The
//! empty tree is an empty leaf at shift 0.
//!
//! Editing follows the same owner-token discipline as the hash trie (see
//! [`make_editable`]), so the functions here serve both path-copying
//! persistent updates and in-place transient ones.

use std::mem;

use arrayvec::ArrayVec;

use super::ReferenceCounter;
use super::owner::{OwnerToken, Stamped, make_editable};

// =============================================================================
// Constants
// =============================================================================

/// Bits of an index consumed per tree level.
pub const BITS_PER_LEVEL: usize = 5;

/// Maximum number of elements in a leaf and of children in a branch.
pub const BRANCHING_FACTOR: usize = 1 << BITS_PER_LEVEL;

/// Extra nodes a concatenation boundary may keep above the optimum before it
/// is redistributed.
pub const EXTRA_SEARCH_STEPS: usize = 2;

pub(crate) type Elements<T> = ArrayVec<T, BRANCHING_FACTOR>;
type Children<T> = ArrayVec<ReferenceCounter<Node<T>>, BRANCHING_FACTOR>;
type SizeTable = ArrayVec<usize, BRANCHING_FACTOR>;

// =============================================================================
// Node Definition
// =============================================================================

#[derive(Clone)]
pub(crate) struct Leaf<T> {
    elements: Elements<T>,
    owner: Option<OwnerToken>,
}

#[derive(Clone)]
pub(crate) struct Branch<T> {
    children: Children<T>,
    /// Cumulative child sizes; `None` when balanced.
    sizes: Option<SizeTable>,
    owner: Option<OwnerToken>,
}

/// A node of the RRB tree.
#[derive(Clone)]
pub(crate) enum Node<T> {
    Leaf(Leaf<T>),
    Branch(Branch<T>),
}

impl<T> Stamped for Node<T> {
    fn owner(&self) -> Option<OwnerToken> {
        match self {
            Self::Leaf(leaf) => leaf.owner,
            Self::Branch(branch) => branch.owner,
        }
    }

    fn stamp(&mut self, owner: OwnerToken) {
        match self {
            Self::Leaf(leaf) => leaf.owner = Some(owner),
            Self::Branch(branch) => branch.owner = Some(owner),
        }
    }
}

impl<T> Branch<T> {
    /// Routes `index` to a child slot and the index within that child.
    fn locate(&self, shift: usize, index: usize) -> Option<(usize, usize)> {
        match &self.sizes {
            None => {
                let slot = index >> shift;
                (slot < self.children.len()).then(|| (slot, index - (slot << shift)))
            }
            Some(sizes) => {
                // No child holds more than `1 << shift` elements, so the radix
                // slot is a lower bound.
                let mut slot = index >> shift;
                while slot < sizes.len() && sizes[slot] <= index {
                    slot += 1;
                }
                if slot >= sizes.len() {
                    return None;
                }
                let before = if slot == 0 { 0 } else { sizes[slot - 1] };
                Some((slot, index - before))
            }
        }
    }
}

/// Returns the size table `children` needs at `shift`, or `None` if the
/// branch is balanced.
fn size_table<T>(children: &[ReferenceCounter<Node<T>>], shift: usize) -> Option<SizeTable> {
    let child_shift = shift - BITS_PER_LEVEL;
    let capacity = 1 << shift;
    let (_, init) = children.split_last()?;
    if init.iter().all(|child| child.len(child_shift) == capacity) {
        return None;
    }

    let mut total = 0;
    Some(
        children
            .iter()
            .map(|child| {
                total += child.len(child_shift);
                total
            })
            .collect(),
    )
}

impl<T> Node<T> {
    /// Creates the root of an empty tree.
    pub(crate) fn empty_leaf() -> Self {
        Self::leaf(ArrayVec::new(), None)
    }

    pub(crate) const fn leaf(elements: Elements<T>, owner: Option<OwnerToken>) -> Self {
        Self::Leaf(Leaf { elements, owner })
    }

    /// Creates a branch at `shift` over `children`, balanced when possible.
    fn branch(children: Children<T>, shift: usize, owner: Option<OwnerToken>) -> Self {
        let sizes = size_table(&children, shift);
        Self::Branch(Branch {
            children,
            sizes,
            owner,
        })
    }

    /// Elements of a leaf; empty for a branch.
    pub(crate) fn elements(&self) -> &[T] {
        match self {
            Self::Leaf(leaf) => &leaf.elements,
            Self::Branch(_) => &[],
        }
    }

    /// Children of a branch; empty for a leaf.
    fn children(&self) -> &[ReferenceCounter<Self>] {
        match self {
            Self::Leaf(_) => &[],
            Self::Branch(branch) => &branch.children,
        }
    }

    /// Number of elements (leaf) or children (branch).
    pub(crate) fn slot_count(&self) -> usize {
        match self {
            Self::Leaf(leaf) => leaf.elements.len(),
            Self::Branch(branch) => branch.children.len(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slot_count() == 0
    }

    #[cfg(test)]
    pub(crate) const fn is_relaxed(&self) -> bool {
        matches!(self, Self::Branch(Branch { sizes: Some(_), .. }))
    }

    /// Number of elements below this node.
    pub(crate) fn len(&self, shift: usize) -> usize {
        match self {
            Self::Leaf(leaf) => leaf.elements.len(),
            Self::Branch(branch) => match &branch.sizes {
                Some(sizes) => sizes.last().copied().unwrap_or(0),
                None => branch.children.last().map_or(0, |last| {
                    ((branch.children.len() - 1) << shift) + last.len(shift - BITS_PER_LEVEL)
                }),
            },
        }
    }

    /// Returns the leaf holding `index` and the position of `index` in it.
    pub(crate) fn leaf_at(&self, shift: usize, index: usize) -> Option<(&[T], usize)> {
        let mut node = self;
        let mut shift = shift;
        let mut index = index;

        loop {
            match node {
                Self::Leaf(leaf) => {
                    return (index < leaf.elements.len()).then_some((&leaf.elements[..], index));
                }
                Self::Branch(branch) => {
                    let (slot, local) = branch.locate(shift, index)?;
                    node = branch.children[slot].as_ref();
                    index = local;
                    shift -= BITS_PER_LEVEL;
                }
            }
        }
    }

    /// Returns the element at `index` below this node.
    pub(crate) fn get(&self, shift: usize, index: usize) -> Option<&T> {
        self.leaf_at(shift, index)
            .map(|(elements, local)| &elements[local])
    }

    /// Removes single-child branches (and an empty branch) from the top of
    /// the tree rooted at `root`.
    pub(crate) fn collapse(root: &mut ReferenceCounter<Self>, shift: &mut usize) {
        loop {
            let replacement = match root.as_ref() {
                Self::Branch(branch) if branch.children.len() == 1 => {
                    Some(branch.children[0].clone())
                }
                Self::Branch(branch) if branch.children.is_empty() => None,
                _ => return,
            };
            if let Some(child) = replacement {
                *root = child;
                *shift -= BITS_PER_LEVEL;
            } else {
                *root = ReferenceCounter::new(Self::empty_leaf());
                *shift = 0;
                return;
            }
        }
    }

    /// Wraps `node` (at `from`) in single-child branches until it sits at `to`.
    fn raise(
        node: ReferenceCounter<Self>,
        from: usize,
        to: usize,
        owner: OwnerToken,
    ) -> ReferenceCounter<Self> {
        let mut node = node;
        let mut level = from;
        while level < to {
            level += BITS_PER_LEVEL;
            let mut children = Children::new();
            children.push(node);
            node = ReferenceCounter::new(Self::branch(children, level, Some(owner)));
        }
        node
    }

    /// Returns `true` if a leaf can be appended below this branch at `shift`.
    fn has_room(&self, shift: usize) -> bool {
        match self {
            Self::Leaf(_) => false,
            Self::Branch(branch) => {
                branch.children.len() < BRANCHING_FACTOR
                    || (shift > BITS_PER_LEVEL
                        && branch
                            .children
                            .last()
                            .is_some_and(|last| last.has_room(shift - BITS_PER_LEVEL)))
            }
        }
    }
}

impl<T: Clone> Node<T> {
    fn into_elements(node: ReferenceCounter<Self>) -> Option<Elements<T>> {
        match ReferenceCounter::unwrap_or_clone(node) {
            Self::Leaf(leaf) => Some(leaf.elements),
            Self::Branch(_) => None,
        }
    }

    /// Replaces the element at `index`, returning the previous one.
    ///
    /// Callers validate `index` first, because the path is made editable
    /// before the leaf is reached.
    pub(crate) fn update(
        node: &mut ReferenceCounter<Self>,
        owner: OwnerToken,
        shift: usize,
        index: usize,
        value: T,
    ) -> Option<T> {
        match make_editable(node, owner) {
            Self::Leaf(leaf) => leaf
                .elements
                .get_mut(index)
                .map(|slot| mem::replace(slot, value)),
            Self::Branch(branch) => {
                let (slot, local) = branch.locate(shift, index)?;
                Self::update(
                    &mut branch.children[slot],
                    owner,
                    shift - BITS_PER_LEVEL,
                    local,
                    value,
                )
            }
        }
    }

    /// Appends `leaf` as the new right-most leaf of the tree.
    ///
    /// Grows the tree by one level when the right spine has no room.
    pub(crate) fn append_leaf(
        root: &mut ReferenceCounter<Self>,
        shift: &mut usize,
        leaf: ReferenceCounter<Self>,
        owner: OwnerToken,
    ) {
        if root.is_empty() {
            *root = leaf;
            *shift = 0;
            return;
        }

        if *shift > 0 && root.has_room(*shift) {
            Self::push_leaf(root, *shift, leaf, owner);
            return;
        }

        let mut children = Children::new();
        children.push(root.clone());
        children.push(Self::raise(leaf, 0, *shift, owner));
        *shift += BITS_PER_LEVEL;
        *root = ReferenceCounter::new(Self::branch(children, *shift, Some(owner)));
    }

    fn push_leaf(
        node: &mut ReferenceCounter<Self>,
        shift: usize,
        leaf: ReferenceCounter<Self>,
        owner: OwnerToken,
    ) {
        let Self::Branch(branch) = make_editable(node, owner) else {
            return;
        };

        if shift == BITS_PER_LEVEL {
            branch.children.push(leaf);
        } else if branch
            .children
            .last()
            .is_some_and(|last| last.has_room(shift - BITS_PER_LEVEL))
        {
            let last = branch.children.len() - 1;
            Self::push_leaf(
                &mut branch.children[last],
                shift - BITS_PER_LEVEL,
                leaf,
                owner,
            );
        } else {
            branch
                .children
                .push(Self::raise(leaf, 0, shift - BITS_PER_LEVEL, owner));
        }
        branch.sizes = size_table(&branch.children, shift);
    }

    /// Detaches the right-most leaf and returns its elements.
    ///
    /// Returns `None` for an empty tree.
    pub(crate) fn pop_last_leaf(
        root: &mut ReferenceCounter<Self>,
        shift: &mut usize,
        owner: OwnerToken,
    ) -> Option<Elements<T>> {
        if root.is_empty() {
            return None;
        }
        if *shift == 0 {
            let leaf = mem::replace(root, ReferenceCounter::new(Self::empty_leaf()));
            return Self::into_elements(leaf);
        }

        let popped = Self::pop_leaf_below(root, *shift, owner);
        Self::collapse(root, shift);
        popped
    }

    fn pop_leaf_below(
        node: &mut ReferenceCounter<Self>,
        shift: usize,
        owner: OwnerToken,
    ) -> Option<Elements<T>> {
        let Self::Branch(branch) = make_editable(node, owner) else {
            return None;
        };

        let popped = if shift == BITS_PER_LEVEL {
            Self::into_elements(branch.children.pop()?)
        } else {
            let last = branch.children.len().checked_sub(1)?;
            let popped =
                Self::pop_leaf_below(&mut branch.children[last], shift - BITS_PER_LEVEL, owner);
            if branch.children[last].is_empty() {
                branch.children.pop();
            }
            popped
        };
        branch.sizes = size_table(&branch.children, shift);
        popped
    }

    /// Keeps only the first `end` elements below `node`.
    ///
    /// `end` must be in `1..len`.
    pub(crate) fn truncate(
        node: &mut ReferenceCounter<Self>,
        owner: OwnerToken,
        shift: usize,
        end: usize,
    ) {
        match make_editable(node, owner) {
            Self::Leaf(leaf) => leaf.elements.truncate(end),
            Self::Branch(branch) => {
                let Some((slot, local)) = branch.locate(shift, end - 1) else {
                    return;
                };
                branch.children.truncate(slot + 1);
                let child_shift = shift - BITS_PER_LEVEL;
                if local + 1 < branch.children[slot].len(child_shift) {
                    Self::truncate(&mut branch.children[slot], owner, child_shift, local + 1);
                }
                branch.sizes = size_table(&branch.children, shift);
            }
        }
    }

    /// Removes the first `start` elements below `node`.
    ///
    /// `start` must be in `1..len`.
    pub(crate) fn drop_front(
        node: &mut ReferenceCounter<Self>,
        owner: OwnerToken,
        shift: usize,
        start: usize,
    ) {
        match make_editable(node, owner) {
            Self::Leaf(leaf) => {
                leaf.elements.drain(..start);
            }
            Self::Branch(branch) => {
                let Some((slot, local)) = branch.locate(shift, start) else {
                    return;
                };
                branch.children.drain(..slot);
                if local > 0 {
                    Self::drop_front(
                        &mut branch.children[0],
                        owner,
                        shift - BITS_PER_LEVEL,
                        local,
                    );
                }
                branch.sizes = size_table(&branch.children, shift);
            }
        }
    }

    /// Concatenates two non-empty trees.
    ///
    /// Returns the new root and its shift. Only nodes along the boundary
    /// between the two trees are rebuilt; everything else is shared.
    pub(crate) fn concat_trees(
        left: ReferenceCounter<Self>,
        left_shift: usize,
        right: ReferenceCounter<Self>,
        right_shift: usize,
        owner: OwnerToken,
    ) -> (ReferenceCounter<Self>, usize) {
        let shift = left_shift.max(right_shift);
        let left = Self::raise(left, left_shift, shift, owner);
        let right = Self::raise(right, right_shift, shift, owner);

        let top = Self::rebalance(Self::merge(left, right, shift, owner), shift, owner);

        let (mut root, mut shift) = if top.len() == 1 {
            (top[0].clone(), shift)
        } else {
            let shift = shift + BITS_PER_LEVEL;
            let children = top.into_iter().collect();
            (
                ReferenceCounter::new(Self::branch(children, shift, Some(owner))),
                shift,
            )
        };
        Self::collapse(&mut root, &mut shift);
        (root, shift)
    }

    /// Merges the right spine of `left` with the left spine of `right`.
    ///
    /// Both sit at `shift`; the returned nodes sit at `shift` too.
    fn merge(
        left: ReferenceCounter<Self>,
        right: ReferenceCounter<Self>,
        shift: usize,
        owner: OwnerToken,
    ) -> Vec<ReferenceCounter<Self>> {
        if shift == 0 {
            return vec![left, right];
        }

        let (Some((left_last, left_init)), Some((right_first, right_rest))) =
            (left.children().split_last(), right.children().split_first())
        else {
            return vec![left.clone(), right.clone()];
        };

        let child_shift = shift - BITS_PER_LEVEL;
        let middle = Self::merge(left_last.clone(), right_first.clone(), child_shift, owner);

        let mut sequence = Vec::with_capacity(left_init.len() + middle.len() + right_rest.len());
        sequence.extend(left_init.iter().cloned());
        sequence.extend(middle);
        sequence.extend(right_rest.iter().cloned());

        Self::rebalance(sequence, child_shift, owner)
            .chunks(BRANCHING_FACTOR)
            .map(|chunk| {
                ReferenceCounter::new(Self::branch(
                    chunk.iter().cloned().collect(),
                    shift,
                    Some(owner),
                ))
            })
            .collect()
    }

    /// Redistributes `nodes` (all at `shift`) following the concatenation plan.
    fn rebalance(
        nodes: Vec<ReferenceCounter<Self>>,
        shift: usize,
        owner: OwnerToken,
    ) -> Vec<ReferenceCounter<Self>> {
        let mut counts: Vec<usize> = nodes.iter().map(|node| node.slot_count()).collect();
        if !concatenation_plan(&mut counts) {
            return nodes;
        }

        tracing::trace!(
            items = counts.iter().sum::<usize>(),
            before = nodes.len(),
            after = counts.len(),
            shift,
            "redistributing concatenation boundary"
        );

        let mut cursor = (0, 0);
        counts
            .iter()
            .map(|&count| {
                if cursor.1 == 0
                    && let Some(node) = nodes.get(cursor.0)
                    && node.slot_count() == count
                {
                    cursor.0 += 1;
                    return node.clone();
                }
                let node = if shift == 0 {
                    Self::leaf(gather(&nodes, Self::elements, &mut cursor, count), Some(owner))
                } else {
                    Self::branch(
                        gather(&nodes, Self::children, &mut cursor, count),
                        shift,
                        Some(owner),
                    )
                };
                ReferenceCounter::new(node)
            })
            .collect()
    }

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

/// Copies the next `count` items out of `nodes`, starting at `cursor`
/// (node index, item offset) and advancing it.
fn gather<T, I: Clone>(
    nodes: &[ReferenceCounter<Node<T>>],
    items: fn(&Node<T>) -> &[I],
    cursor: &mut (usize, usize),
    count: usize,
) -> ArrayVec<I, BRANCHING_FACTOR> {
    let mut gathered = ArrayVec::new();
    while gathered.len() < count {
        let Some(node) = nodes.get(cursor.0) else {
            break;
        };
        let source = items(node);
        let take = (count - gathered.len()).min(source.len() - cursor.1);
        gathered.extend(source[cursor.1..cursor.1 + take].iter().cloned());
        cursor.1 += take;
        if cursor.1 == source.len() {
            cursor.0 += 1;
            cursor.1 = 0;
        }
    }
    gathered
}

/// Plans how to pack the node sizes in `counts` so that at most
/// `optimal + EXTRA_SEARCH_STEPS` nodes remain.
///
/// Rewrites `counts` with the planned sizes and returns `true`, or returns
/// `false` if the nodes can stay as they are.
fn concatenation_plan(counts: &mut Vec<usize>) -> bool {
    let total: usize = counts.iter().sum();
    let optimal = total.div_ceil(BRANCHING_FACTOR);
    if counts.len() <= optimal + EXTRA_SEARCH_STEPS {
        return false;
    }

    let mut index = 0;
    while counts.len() > optimal + EXTRA_SEARCH_STEPS {
        // Full nodes are skipped.
        while index < counts.len() && counts[index] >= BRANCHING_FACTOR {
            index += 1;
        }

        // Spread this node's items over its right neighbours.
        let mut remaining = counts.get(index).copied().unwrap_or(0);
        while remaining > 0 {
            let Some(&next) = counts.get(index + 1) else {
                return false;
            };
            let filled = (remaining + next).min(BRANCHING_FACTOR);
            remaining = remaining + next - filled;
            counts[index] = filled;
            index += 1;
        }

        if index >= counts.len() {
            return false;
        }
        counts.remove(index);
        index = index.saturating_sub(1);
    }
    true
}

// =============================================================================
// Tests
// =============================================================================
