//! # nibble-hash
//!
//! A memory-efficient, in-process hash table for very large flat key spaces
//! (millions of binary keys) where a general-purpose map costs too much per
//! entry.
//!
//! ## Architecture
//!
//! Keys are hashed to a 32-bit digest that is read four bits at a time. The
//! table is a trie of 16-slot index nodes addressed by those nibbles; each
//! slot is empty, holds a short collision chain of buckets, or points to a
//! deeper index. A chain that grows past the configured limit is split into
//! a new index one level down ("reindexing"). Only the overflowing slot is
//! touched, so growth cost stays local. The trie is at most eight levels
//! deep; below that, chains simply grow.
//!
//! Every entry is one bucket node plus one packed buffer holding the key and
//! value with their length prefixes.
//!
//! ## Example
//!
//! ```rust
//! use nibble_hash::{HashTable, StoreOutcome};
//!
//! let mut table = HashTable::new();
//! assert_eq!(table.store(b"foo", b"bar", 0).unwrap(), StoreOutcome::Added);
//! assert_eq!(table.store(b"foo", b"baz", 0).unwrap(), StoreOutcome::Replaced);
//!
//! let entry = table.fetch(b"foo").unwrap();
//! assert_eq!(entry.value(), b"baz");
//!
//! assert!(table.remove(b"foo"));
//! assert!(table.is_empty());
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod bucket;
pub mod digest;
mod error;
mod fallible;
mod index;
mod iter;
mod table;

pub use bucket::{BUCKET_OVERHEAD, MAX_KEY_LEN, MAX_VALUE_LEN};
pub use error::{Error, Result};
pub use index::{INDEX_BYTES, INDEX_SIZE};
pub use iter::{Iter, Keys};
pub use table::{Entry, HashTable, StoreOutcome};

/// Size accounting for a table.
///
/// Updated on every structural change, so it always matches the live
/// contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Number of keys stored
    pub num_keys: u64,
    /// Bytes used by index nodes, the root included
    pub index_bytes: u64,
    /// Bytes used by bucket nodes and length prefixes
    pub meta_bytes: u64,
    /// Raw key and value bytes
    pub data_bytes: u64,
}

impl Stats {
    /// Stats of a table holding only its root index.
    pub(crate) fn empty() -> Self {
        Self {
            index_bytes: INDEX_BYTES as u64,
            ..Self::default()
        }
    }

    /// Number of live index nodes.
    pub fn num_indexes(&self) -> u64 {
        self.index_bytes / INDEX_BYTES as u64
    }

    /// Everything the table accounts for.
    pub fn total_bytes(&self) -> u64 {
        self.index_bytes + self.meta_bytes + self.data_bytes
    }

    /// Average accounted bytes per key.
    pub fn bytes_per_key(&self) -> f64 {
        if self.num_keys > 0 {
            self.total_bytes() as f64 / self.num_keys as f64
        } else {
            0.0
        }
    }

    pub(crate) fn record_insert(&mut self, data_len: usize) {
        self.num_keys += 1;
        self.meta_bytes += BUCKET_OVERHEAD as u64;
        self.data_bytes += data_len as u64;
    }

    pub(crate) fn record_replace(&mut self, old_data_len: usize, new_data_len: usize) {
        self.data_bytes -= old_data_len as u64;
        self.data_bytes += new_data_len as u64;
    }

    pub(crate) fn record_remove(&mut self, data_len: usize) {
        self.num_keys -= 1;
        self.meta_bytes -= BUCKET_OVERHEAD as u64;
        self.data_bytes -= data_len as u64;
    }

    pub(crate) fn record_index_alloc(&mut self) {
        self.index_bytes += INDEX_BYTES as u64;
    }

    pub(crate) fn record_index_free(&mut self) {
        self.index_bytes -= INDEX_BYTES as u64;
    }
}

/// Configuration for a [`HashTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Chain length at which a slot is split into a deeper index
    pub max_buckets: u8,
    /// Staggers the split threshold per slot: a slot with nibble `n` splits
    /// at `max_buckets + n % reindex_scatter`, so evenly filling siblings do
    /// not all split on the same insert
    pub reindex_scatter: u8,
}

impl Config {
    /// Clamp the fields to usable values.
    ///
    /// Both fields are at least 1, and the scatter resets to 1 when the
    /// combined threshold would exceed 256.
    pub fn normalized(self) -> Self {
        let max_buckets = self.max_buckets.max(1);
        let mut reindex_scatter = self.reindex_scatter.max(1);
        if max_buckets as u16 + reindex_scatter as u16 > 256 {
            reindex_scatter = 1;
        }
        Self {
            max_buckets,
            reindex_scatter,
        }
    }

    /// Chain length that triggers a split for the slot at `nibble`.
    #[inline]
    pub(crate) fn reindex_threshold(&self, nibble: usize) -> usize {
        self.max_buckets as usize + nibble % self.reindex_scatter as usize
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_buckets: 16,
            reindex_scatter: 1,
        }
    }
}


#[cfg(test)]
mod proptests;
