//! Collision-chain nodes.
//!
//! A bucket holds one key/value pair. Key and value live in a single packed
//! payload so each entry costs one node plus one buffer:
//!
//! ```text
//! [key_len: u16 LE][key bytes][value_len: u32 LE][value bytes]
//! ```
//!
//! Buckets sharing a trie slot are linked through `next`; the head of the
//! chain owns the rest of it.

use crate::error::{Error, Result};
use crate::fallible::try_buffer;

/// Size of the key length prefix.
pub const KEY_LEN_SIZE: usize = std::mem::size_of::<u16>();
/// Size of the value length prefix.
pub const VALUE_LEN_SIZE: usize = std::mem::size_of::<u32>();
/// Longest key that fits the length prefix.
pub const MAX_KEY_LEN: usize = u16::MAX as usize;
/// Largest value that fits the length prefix.
pub const MAX_VALUE_LEN: usize = u32::MAX as usize;

/// Per-entry bookkeeping bytes: the node itself plus both length prefixes.
pub const BUCKET_OVERHEAD: usize = std::mem::size_of::<Bucket>() + KEY_LEN_SIZE + VALUE_LEN_SIZE;

pub(crate) struct Bucket {
    flags: u8,
    payload: Box<[u8]>,
    pub(crate) next: Option<Box<Bucket>>,
}

/// Serialize a key/value pair into a payload buffer.
pub(crate) fn pack(key: &[u8], value: &[u8]) -> Result<Box<[u8]>> {
    let key_len = u16::try_from(key.len()).map_err(|_| Error::KeyTooLong {
        len: key.len(),
        max: MAX_KEY_LEN,
    })?;
    let value_len = u32::try_from(value.len()).map_err(|_| Error::ValueTooLarge {
        len: value.len(),
        max: MAX_VALUE_LEN,
    })?;

    let mut buf = try_buffer(KEY_LEN_SIZE + key.len() + VALUE_LEN_SIZE + value.len())?;
    buf.extend_from_slice(&key_len.to_le_bytes());
    buf.extend_from_slice(key);
    buf.extend_from_slice(&value_len.to_le_bytes());
    buf.extend_from_slice(value);
    Ok(buf.into_boxed_slice())
}

impl Bucket {
    pub(crate) fn new(flags: u8, payload: Box<[u8]>) -> Self {
        Self {
            flags,
            payload,
            next: None,
        }
    }

    #[inline]
    fn key_len(&self) -> usize {
        u16::from_le_bytes([self.payload[0], self.payload[1]]) as usize
    }

    #[inline]
    fn value_len_offset(&self) -> usize {
        KEY_LEN_SIZE + self.key_len()
    }

    #[inline]
    fn value_len(&self) -> usize {
        let at = self.value_len_offset();
        let mut len = [0u8; VALUE_LEN_SIZE];
        len.copy_from_slice(&self.payload[at..at + VALUE_LEN_SIZE]);
        u32::from_le_bytes(len) as usize
    }

    #[inline]
    pub(crate) fn key(&self) -> &[u8] {
        &self.payload[KEY_LEN_SIZE..KEY_LEN_SIZE + self.key_len()]
    }

    #[inline]
    pub(crate) fn value(&self) -> &[u8] {
        let at = self.value_len_offset() + VALUE_LEN_SIZE;
        &self.payload[at..at + self.value_len()]
    }

    #[inline]
    pub(crate) fn flags(&self) -> u8 {
        self.flags
    }

    /// Key plus value bytes, as counted by `Stats::data_bytes`.
    #[inline]
    pub(crate) fn data_len(&self) -> usize {
        self.key_len() + self.value_len()
    }

    #[inline]
    pub(crate) fn next(&self) -> Option<&Bucket> {
        self.next.as_deref()
    }

    /// Swap in a new payload and flags, keeping the chain link.
    ///
    /// The old payload is freed here.
    pub(crate) fn replace(&mut self, flags: u8, payload: Box<[u8]>) {
        self.flags = flags;
        self.payload = payload;
    }

    /// This bucket followed by the rest of its chain.
    pub(crate) fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    pub(crate) fn find(&self, key: &[u8]) -> Option<&Bucket> {
        self.chain().find(|bucket| bucket.key() == key)
    }

    pub(crate) fn find_mut(&mut self, key: &[u8]) -> Option<&mut Bucket> {
        let mut cur = self;
        loop {
            if cur.key() == key {
                return Some(cur);
            }
            cur = cur.next.as_deref_mut()?;
        }
    }

    /// Append at the tail of the chain.
    pub(crate) fn push_back(&mut self, bucket: Box<Bucket>) {
        debug_assert!(bucket.next.is_none());
        let mut tail = self;
        loop {
            match tail.next {
                Some(ref mut next) => tail = &mut **next,
                None => {
                    tail.next = Some(bucket);
                    return;
                }
            }
        }
    }

    /// Detach the first bucket after this one whose key matches.
    pub(crate) fn unlink_after(&mut self, key: &[u8]) -> Option<Box<Bucket>> {
        let mut cur = self;
        loop {
            let hit = cur.next.as_deref()?.key() == key;
            if hit {
                let mut removed = cur.next.take()?;
                cur.next = removed.next.take();
                return Some(removed);
            }
            cur = cur.next.as_deref_mut()?;
        }
    }
}

// Chains at the deepest level are unbounded; unlink iteratively so dropping
// a long chain cannot overflow the stack.
impl Drop for Bucket {
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut bucket) = next {
            next = bucket.next.take();
        }
    }
}

/// Iterator over a chain, head first.
pub(crate) struct Chain<'a> {
    next: Option<&'a Bucket>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Bucket;

    fn next(&mut self) -> Option<Self::Item> {
        let bucket = self.next?;
        self.next = bucket.next.as_deref();
        Some(bucket)
    }
}
