//! The hash table engine.

use std::fmt;

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::bucket::{self, Bucket};
use crate::digest::{Digest, DIGEST_LEN};
use crate::error::Result;
use crate::fallible::try_box;
use crate::index::{Index, Slot};
use crate::iter::{Iter, Keys};
use crate::{Config, Stats};

/// Result of a successful [`HashTable::store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The key was new.
    Added,
    /// The key existed and its value was overwritten.
    Replaced,
}

impl StoreOutcome {
    /// Numeric code for hosts that report outcomes as integers
    /// (`0` is reserved for errors).
    pub const fn code(self) -> u8 {
        match self {
            StoreOutcome::Added => 1,
            StoreOutcome::Replaced => 2,
        }
    }
}

/// A stored key/value pair, borrowed from the table.
#[derive(Clone, Copy)]
pub struct Entry<'a> {
    bucket: &'a Bucket,
}

impl<'a> Entry<'a> {
    pub(crate) fn new(bucket: &'a Bucket) -> Self {
        Self { bucket }
    }

    /// The key.
    pub fn key(&self) -> &'a [u8] {
        self.bucket.key()
    }

    /// The value.
    pub fn value(&self) -> &'a [u8] {
        self.bucket.value()
    }

    /// The flags byte given to `store`, returned verbatim.
    pub fn flags(&self) -> u8 {
        self.bucket.flags()
    }
}

impl fmt::Debug for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key())
            .field("value", &self.value())
            .field("flags", &self.flags())
            .finish()
    }
}

/// A hash table mapping binary keys to binary values.
///
/// Keys and values are copied into table-owned buffers on `store`. Slices
/// handed back by lookups borrow the table, so they cannot outlive the next
/// mutation.
pub struct HashTable {
    root: Box<Index>,
    stats: Stats,
    config: Config,
}

impl HashTable {
    /// Create an empty table with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create an empty table that splits chains at `max_buckets`.
    pub fn with_max_buckets(max_buckets: u8) -> Self {
        Self::with_config(Config {
            max_buckets,
            ..Config::default()
        })
    }

    /// Create an empty table with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            root: Box::new(Index::new()),
            stats: Stats::empty(),
            config: config.normalized(),
        }
    }

    /// The configuration in effect (after normalization).
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Snapshot of the size accounting.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Number of keys stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.stats.num_keys as usize
    }

    /// Whether the table holds no keys.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stats.num_keys == 0
    }

    /// Insert or overwrite `key`.
    ///
    /// On overwrite the entry keeps its place in its chain. `flags` is
    /// stored alongside the value and handed back by [`HashTable::fetch`].
    ///
    /// Fails if the key or value exceed their length prefixes, or if memory
    /// runs out; either way the table is left exactly as it was.
    pub fn store(&mut self, key: &[u8], value: &[u8], flags: u8) -> Result<StoreOutcome> {
        let payload = bucket::pack(key, value).inspect_err(|err| {
            warn!(key_len = key.len(), value_len = value.len(), %err, "store rejected");
        })?;
        let data_len = key.len() + value.len();
        let digest = Digest::of(key);

        let (slot, level) = self.root.descend_mut(&digest, 0);
        let nibble = digest.nibble(level);

        let head = match slot {
            Slot::Chain(head) => head,
            Slot::Empty => {
                let bucket = try_box(Bucket::new(flags, payload)).inspect_err(log_oom)?;
                *slot = Slot::Chain(bucket);
                self.stats.record_insert(data_len);
                return Ok(StoreOutcome::Added);
            }
            // descend_mut only stops on an empty slot or a chain.
            Slot::Index(_) => unreachable!("descent stops at the first non-index slot"),
        };

        if let Some(existing) = head.find_mut(key) {
            let old_data_len = existing.data_len();
            existing.replace(flags, payload);
            self.stats.record_replace(old_data_len, data_len);
            return Ok(StoreOutcome::Replaced);
        }

        let chain_len = head.chain().count();
        let split = chain_len >= self.config.reindex_threshold(nibble) && level + 1 < DIGEST_LEN;

        // Allocate everything before touching the chain.
        let bucket = try_box(Bucket::new(flags, payload)).inspect_err(log_oom)?;
        let index = if split {
            Some(try_box(Index::new()).inspect_err(log_oom)?)
        } else {
            None
        };

        head.push_back(bucket);
        self.stats.record_insert(data_len);

        if let Some(mut index) = index {
            if let Slot::Chain(chain) = std::mem::take(slot) {
                index.adopt(chain, level + 1);
            }
            *slot = Slot::Index(index);
            self.stats.record_index_alloc();
            debug!(
                depth = level,
                nibble,
                chain_len = chain_len + 1,
                num_indexes = self.stats.num_indexes(),
                "reindexed overflowing slot"
            );
        }

        Ok(StoreOutcome::Added)
    }

    fn find(&self, key: &[u8]) -> Option<&Bucket> {
        let digest = Digest::of(key);
        match self.root.descend(&digest, 0).0 {
            Slot::Chain(head) => head.find(key),
            _ => None,
        }
    }

    /// Look up `key`.
    pub fn fetch(&self, key: &[u8]) -> Option<Entry<'_>> {
        self.find(key).map(Entry::new)
    }

    /// Whether `key` is stored.
    pub fn has(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    /// Delete `key`. Returns whether it was present.
    ///
    /// Index nodes emptied by removal stay in place; only
    /// [`HashTable::clear_slice`] collapses them.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        let digest = Digest::of(key);
        let (slot, _) = self.root.descend_mut(&digest, 0);
        match slot.unlink(key) {
            Some(bucket) => {
                self.stats.record_remove(bucket.data_len());
                true
            }
            None => false,
        }
    }

    /// The first key in enumeration order.
    ///
    /// The order is unspecified but stable while the table is not mutated:
    /// depth first, slots ascending, chains in link order.
    pub fn first_key(&self) -> Option<&[u8]> {
        self.root.first_key()
    }

    /// The key following `prev` in enumeration order.
    ///
    /// The position is found again from `prev`'s digest on every call, so
    /// the table must not change between calls. Returns `None` at the end,
    /// or if `prev` is not stored.
    pub fn next_key(&self, prev: &[u8]) -> Option<&[u8]> {
        let digest = Digest::of(prev);
        let mut path: SmallVec<[(&Index, usize); DIGEST_LEN]> = SmallVec::new();
        let mut index = &*self.root;
        let mut level = 0;

        loop {
            let nibble = digest.nibble(level);
            match index.slot(nibble) {
                Slot::Empty => return None,
                Slot::Index(child) => {
                    path.push((index, nibble));
                    index = &**child;
                    level += 1;
                }
                Slot::Chain(head) => {
                    let bucket = head.find(prev)?;
                    if let Some(next) = bucket.next() {
                        return Some(next.key());
                    }
                    path.push((index, nibble));
                    break;
                }
            }
        }

        while let Some((index, nibble)) = path.pop() {
            let later = &index.slots()[nibble + 1..];
            if let Some(key) = later.iter().find_map(Slot::first_key) {
                return Some(key);
            }
        }
        None
    }

    /// Iterate over all entries in enumeration order.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.root, self.len())
    }

    /// Iterate over all keys using [`HashTable::first_key`] and
    /// [`HashTable::next_key`].
    pub fn keys(&self) -> Keys<'_> {
        Keys::new(self)
    }

    /// Remove every entry. The root index stays allocated.
    pub fn clear(&mut self) {
        let num_keys = self.stats.num_keys;
        for slot in self.root.slots_mut() {
            release(&mut self.stats, std::mem::take(slot));
        }
        debug_assert_eq!(self.stats, Stats::empty());
        debug!(num_keys, "cleared table");
    }

    /// Remove roughly 1/256th of the table.
    ///
    /// The high nibble of `slice` picks a root slot and the low nibble a slot
    /// of the index beneath it. If the root slot is still a plain chain, the
    /// whole chain goes (1/16th granularity). If removing the inner slot
    /// leaves that second-level index empty, the index itself is freed too.
    ///
    /// Calling this for every slice 0..=255 is equivalent to
    /// [`HashTable::clear`]. A subtree that grew deep is still freed in one
    /// call, so this spreads work but bounds nothing.
    pub fn clear_slice(&mut self, slice: u8) {
        let outer = (slice >> 4) as usize;
        let inner = (slice & 0x0F) as usize;
        let before = self.stats.num_keys;

        let slot = self.root.slot_mut(outer);
        match slot {
            Slot::Empty => {}
            Slot::Chain(_) => release(&mut self.stats, std::mem::take(slot)),
            Slot::Index(index) => {
                release(&mut self.stats, std::mem::take(index.slot_mut(inner)));
                if index.is_empty() {
                    release(&mut self.stats, std::mem::take(slot));
                    debug!(slice, outer, "collapsed empty second-level index");
                }
            }
        }

        trace!(slice, removed = before - self.stats.num_keys, "cleared slice");
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &Index {
        &self.root
    }
}

/// Free a detached subtree, keeping `stats` in step.
fn release(stats: &mut Stats, slot: Slot) {
    match slot {
        Slot::Empty => {}
        Slot::Chain(head) => {
            for bucket in head.chain() {
                stats.record_remove(bucket.data_len());
            }
        }
        Slot::Index(mut index) => {
            for slot in index.slots_mut() {
                release(stats, std::mem::take(slot));
            }
            stats.record_index_free();
        }
    }
}

fn log_oom(err: &crate::Error) {
    warn!(%err, "allocation failed, table unchanged");
}

impl Default for HashTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HashTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|e| (e.key(), e.value())))
            .finish()
    }
}

impl<'a> IntoIterator for &'a HashTable {
    type Item = Entry<'a>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
