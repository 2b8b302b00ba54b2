//! Fail-fast iteration protocol.
//!
//! Every mutable container carries a modification count that grows on each
//! structural mutation. A cursor captures the count when it is created and
//! re-checks it on every step. If the container changed behind its back, the
//! step fails with [`CollectionError::ConcurrentModification`]. Removing an
//! element *through* the cursor is allowed and re-synchronizes it.
//!
//! Borrowing iterators (`iter()`) need none of this: the borrow checker
//! already rejects a mutation while they are alive. Cursors are detached.
//! They take the container as an argument on each step, so the container can
//! be mutated between steps, and that is what this protocol detects.
//!
//! This is a detection mechanism for same-thread reentrant mutation. It is
//! not synchronization.

use crate::error::{CollectionError, Result};

/// A container whose structural mutations are counted.
pub trait FailFast {
    /// Returns the number of structural modifications made so far.
    fn modification_count(&self) -> u64;
}

/// A modification count captured from a [`FailFast`] container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModificationGuard {
    expected: u64,
}

impl ModificationGuard {
    /// Captures the current modification count of `container`.
    #[must_use]
    pub fn capture<C: FailFast + ?Sized>(container: &C) -> Self {
        Self {
            expected: container.modification_count(),
        }
    }

    /// Returns the captured modification count.
    #[must_use]
    pub const fn expected(&self) -> u64 {
        self.expected
    }

    /// Verifies that `container` has not been modified since capture.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::ConcurrentModification`] if the count moved.
    pub fn check<C: FailFast + ?Sized>(&self, container: &C) -> Result<()> {
        let actual = container.modification_count();
        if actual == self.expected {
            Ok(())
        } else {
            Err(CollectionError::ConcurrentModification {
                expected: self.expected,
                actual,
            })
        }
    }

    /// Re-captures the count after a modification made through the cursor.
    pub fn resync<C: FailFast + ?Sized>(&mut self, container: &C) {
        self.expected = container.modification_count();
    }
}
