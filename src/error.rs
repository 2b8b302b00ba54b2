//! Error taxonomy shared by every container.
//!
//! Two kinds of failure exist:
//!
//! - **Programming errors**: an index or range out of bounds, a builder used
//!   after it was sealed, or a container modified behind a cursor. These point
//!   at a bug in the caller.
//! - **Resource limits**: an operation that would grow a container past
//!   [`MAX_LENGTH`](crate::limits::MAX_LENGTH).
//!
//! No condition is transient. Every operation is deterministic, so retrying
//! the same call fails the same way.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CollectionError>;

/// Errors surfaced at the container boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// An element index was outside `0..length` (or `0..=length` for insertion).
    #[error("index {index} is out of bounds for length {length}")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// The length of the container at the time of the call.
        length: usize,
    },

    /// A range did not satisfy `start <= end <= length`.
    #[error("range {start}..{end} is invalid for length {length}")]
    InvalidRange {
        /// Inclusive start of the range.
        start: usize,
        /// Exclusive end of the range.
        end: usize,
        /// The length of the container at the time of the call.
        length: usize,
    },

    /// The operation would grow the container beyond its size ceiling.
    #[error("size limit exceeded: {requested} elements requested, at most {limit} allowed")]
    SizeLimitExceeded {
        /// The length the operation would have produced.
        requested: usize,
        /// The ceiling.
        limit: usize,
    },

    /// A transient builder was used after `build()` sealed it.
    #[error("builder has already been sealed by build()")]
    BuilderSealed,

    /// The container was structurally modified since the cursor was created.
    #[error("concurrent modification detected: expected modification count {expected}, found {actual}")]
    ConcurrentModification {
        /// Modification count captured by the cursor.
        expected: u64,
        /// Modification count found on the container.
        actual: u64,
    },

    /// `remove` was called on a cursor that has not returned an element yet,
    /// or whose current element was already removed.
    #[error("cursor has no current element")]
    NoCurrentElement,
}

/// Coarse classification of a [`CollectionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller violated a precondition.
    ProgrammingError,
    /// An internal capacity ceiling would have been crossed.
    ResourceLimit,
}

impl CollectionError {
    /// Returns the classification of this error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use figura_collections::error::{CollectionError, ErrorKind};
    ///
    /// assert_eq!(CollectionError::BuilderSealed.kind(), ErrorKind::ProgrammingError);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SizeLimitExceeded { .. } => ErrorKind::ResourceLimit,
            Self::IndexOutOfBounds { .. }
            | Self::InvalidRange { .. }
            | Self::BuilderSealed
            | Self::ConcurrentModification { .. }
            | Self::NoCurrentElement => ErrorKind::ProgrammingError,
        }
    }

    /// Returns `true` if retrying the operation could succeed.
    ///
    /// Always `false`: every operation in this crate is deterministic.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }
}
