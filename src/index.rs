//! Trie branch nodes.
//!
//! Each [`Index`] consumes one digest nibble and has 16 slots. A slot is
//! empty, the head of a bucket chain, or a deeper index.

use crate::bucket::Bucket;
use crate::digest::{Digest, DIGEST_LEN};

/// Number of slots per index node.
pub const INDEX_SIZE: usize = 16;

/// Bytes accounted per index node in `Stats::index_bytes`.
pub const INDEX_BYTES: usize = std::mem::size_of::<Index>();

#[derive(Default)]
pub(crate) enum Slot {
    #[default]
    Empty,
    Chain(Box<Bucket>),
    Index(Box<Index>),
}

impl Slot {
    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    /// First key below this slot in canonical order.
    pub(crate) fn first_key(&self) -> Option<&[u8]> {
        match self {
            Slot::Empty => None,
            Slot::Chain(head) => Some(head.key()),
            Slot::Index(index) => index.first_key(),
        }
    }

    /// Append a bucket to the chain in this slot, starting one if empty.
    fn push_back(&mut self, bucket: Box<Bucket>) {
        match self {
            Slot::Chain(head) => head.push_back(bucket),
            _ => {
                debug_assert!(self.is_empty(), "cannot chain into an index slot");
                *self = Slot::Chain(bucket);
            }
        }
    }

    /// Detach the bucket holding `key` from the chain in this slot.
    ///
    /// Nested indexes are left alone, as is an emptied slot's parent.
    pub(crate) fn unlink(&mut self, key: &[u8]) -> Option<Box<Bucket>> {
        let head = match self {
            Slot::Chain(head) => head,
            _ => return None,
        };
        if head.key() != key {
            return head.unlink_after(key);
        }

        match std::mem::take(self) {
            Slot::Chain(mut removed) => {
                if let Some(next) = removed.next.take() {
                    *self = Slot::Chain(next);
                }
                Some(removed)
            }
            other => {
                *self = other;
                None
            }
        }
    }
}

pub(crate) struct Index {
    slots: [Slot; INDEX_SIZE],
}

impl Index {
    pub(crate) fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Slot::Empty),
        }
    }

    #[inline]
    pub(crate) fn slot(&self, nibble: usize) -> &Slot {
        &self.slots[nibble]
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, nibble: usize) -> &mut Slot {
        &mut self.slots[nibble]
    }

    #[inline]
    pub(crate) fn slots(&self) -> &[Slot; INDEX_SIZE] {
        &self.slots
    }

    #[inline]
    pub(crate) fn slots_mut(&mut self) -> &mut [Slot; INDEX_SIZE] {
        &mut self.slots
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.iter().all(Slot::is_empty)
    }

    pub(crate) fn first_key(&self) -> Option<&[u8]> {
        self.slots.iter().find_map(Slot::first_key)
    }

    /// Walk down `digest` from this node (at `level`) to the first slot that
    /// is not an index. Returns the slot and the level it sits at.
    pub(crate) fn descend(&self, digest: &Digest, mut level: usize) -> (&Slot, usize) {
        let mut index = self;
        loop {
            match index.slot(digest.nibble(level)) {
                Slot::Index(child) => {
                    index = &**child;
                    level += 1;
                }
                slot => return (slot, level),
            }
        }
    }

    /// Mutable counterpart of [`Index::descend`].
    pub(crate) fn descend_mut(&mut self, digest: &Digest, mut level: usize) -> (&mut Slot, usize) {
        let mut index = self;
        loop {
            match index.slots[digest.nibble(level)] {
                Slot::Index(ref mut child) => {
                    index = &mut **child;
                    level += 1;
                }
                ref mut slot => return (slot, level),
            }
        }
    }

    /// Redistribute a chain into this (empty) node by each key's nibble at
    /// `level`, keeping encounter order within every slot.
    pub(crate) fn adopt(&mut self, head: Box<Bucket>, level: usize) {
        debug_assert!(level < DIGEST_LEN);
        debug_assert!(self.is_empty());
        let mut next = Some(head);
        while let Some(mut bucket) = next {
            next = bucket.next.take();
            let nibble = Digest::of(bucket.key()).nibble(level);
            self.slots[nibble].push_back(bucket);
        }
    }
}
