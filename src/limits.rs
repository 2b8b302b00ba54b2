//! Size ceiling shared by every container.
//!
//! Lengths are `usize`, but the host application addresses elements with
//! 32-bit counts. Growing any container past [`MAX_LENGTH`] fails with
//! [`CollectionError::SizeLimitExceeded`] instead of wrapping.

use crate::error::{CollectionError, Result};

/// The largest number of elements a container may hold.
pub const MAX_LENGTH: usize = u32::MAX as usize;

/// Returns `current + additional` if the sum stays within [`MAX_LENGTH`].
///
/// # Errors
///
/// Returns [`CollectionError::SizeLimitExceeded`] when the sum overflows or
/// exceeds the ceiling.
///
/// # Examples
///
/// ```rust
/// use figura_collections::limits::{checked_length, MAX_LENGTH};
///
/// assert_eq!(checked_length(10, 5), Ok(15));
/// assert!(checked_length(MAX_LENGTH, 1).is_err());
/// ```
pub fn checked_length(current: usize, additional: usize) -> Result<usize> {
    match current.checked_add(additional) {
        Some(requested) if requested <= MAX_LENGTH => Ok(requested),
        requested => {
            let requested = requested.unwrap_or(usize::MAX);
            tracing::debug!(requested, limit = MAX_LENGTH, "refusing to grow past size limit");
            Err(CollectionError::SizeLimitExceeded {
                requested,
                limit: MAX_LENGTH,
            })
        }
    }
}
