//! Errors returned by the table.

use thiserror::Error;

/// Failures reported by [`HashTable::store`](crate::HashTable::store).
///
/// A key that is simply absent is not an error; lookups report it as `None`
/// or `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The key does not fit the 16-bit length prefix.
    #[error("key is {len} bytes, the limit is {max}")]
    KeyTooLong {
        /// Length of the rejected key.
        len: usize,
        /// Largest accepted key length.
        max: usize,
    },
    /// The value does not fit the 32-bit length prefix.
    #[error("value is {len} bytes, the limit is {max}")]
    ValueTooLarge {
        /// Length of the rejected value.
        len: usize,
        /// Largest accepted value length.
        max: usize,
    },
    /// No memory could be allocated; the table was left unchanged.
    #[error("failed to allocate {bytes} bytes")]
    OutOfMemory {
        /// Size of the allocation that failed.
        bytes: usize,
    },
}

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
