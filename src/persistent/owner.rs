//! Owner tokens for transient editing.
//!
//! Each transient session draws a fresh [`OwnerToken`] and stamps it on every
//! node it clones. A node may then be edited in place only while two things
//! hold: its stamp matches the session's token, and the session holds its only
//! reference. Any other node is cloned (and stamped) first. Tokens are never
//! reused. Once a session is sealed its stamps match nothing, so the nodes
//! it published become immutable for good.
//!
//! Persistent operations reuse the same machinery with a throw-away token.
//! Every node they touch is foreign to it, so each edit is a plain path copy.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use super::ReferenceCounter;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identity of one editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct OwnerToken(NonZeroU64);

impl OwnerToken {
    /// Draws a token no other session has seen.
    pub(crate) fn fresh() -> Self {
        let raw = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 sessions to wrap.
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }
}

/// A node that records which session created it.
pub(crate) trait Stamped {
    fn owner(&self) -> Option<OwnerToken>;

    fn stamp(&mut self, owner: OwnerToken);
}

/// Returns a mutable reference to the node behind `node`, cloning it first
/// unless it belongs to `owner` and is not shared.
pub(crate) fn make_editable<N>(node: &mut ReferenceCounter<N>, owner: OwnerToken) -> &mut N
where
    N: Stamped + Clone,
{
    if node.owner() != Some(owner) {
        let mut copy = N::clone(node);
        copy.stamp(owner);
        *node = ReferenceCounter::new(copy);
    }
    // Still clones when a stamped node is aliased, e.g. by a cursor snapshot.
    ReferenceCounter::make_mut(node)
}
