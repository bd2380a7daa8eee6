//! Key digests.
//!
//! A key is hashed with 32-bit DJB2 and the hash is split into eight
//! nibbles, one per trie level. Levels 0..4 take the high nibble of each
//! hash byte and levels 4..8 the low nibble, so the first levels see the
//! most mixed bits.

/// Number of nibbles in a digest, which is also the maximum trie depth.
pub const DIGEST_LEN: usize = 8;

/// DJB2 seed.
const SEED: u32 = 5381;

/// Eight 4-bit path symbols addressing a key in the trie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Digest the given key.
    pub fn of(key: &[u8]) -> Self {
        Self::from_hash(hash(key))
    }

    #[inline]
    fn from_hash(hash: u32) -> Self {
        let b = hash.to_le_bytes();
        Self([
            b[0] >> 4,
            b[1] >> 4,
            b[2] >> 4,
            b[3] >> 4,
            b[0] & 0x0F,
            b[1] & 0x0F,
            b[2] & 0x0F,
            b[3] & 0x0F,
        ])
    }

    /// Slot index at the given trie level.
    #[inline]
    pub fn nibble(&self, level: usize) -> usize {
        debug_assert!(level < DIGEST_LEN);
        self.0[level] as usize
    }

    /// All eight nibbles, root level first.
    #[inline]
    pub fn nibbles(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

/// 32-bit DJB2 hash (`h * 33 + byte`).
#[inline]
pub fn hash(key: &[u8]) -> u32 {
    key.iter()
        .fold(SEED, |h, &b| (h << 5).wrapping_add(h).wrapping_add(b as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_is_seed() {
        assert_eq!(hash(b""), 5381);
        // 5381 = 0x0000_1505, little endian bytes [0x05, 0x15, 0x00, 0x00]
        assert_eq!(Digest::of(b"").nibbles(), &[0, 1, 0, 0, 5, 5, 0, 0]);
    }

    #[test]
    fn test_known_hash() {
        // 5381 * 33 + 'a'
        assert_eq!(hash(b"a"), 177_670);
        assert_eq!(hash(b"foo"), 193_491_849);
    }

    #[test]
    fn test_nibbles_in_range() {
        for i in 0..1000u32 {
            let d = Digest::of(format!("key{i}").as_bytes());
            for level in 0..DIGEST_LEN {
                assert!(d.nibble(level) < 16);
            }
        }
    }

    #[test]
    fn test_nibble_order() {
        let d = Digest::from_hash(0x1234_5678);
        // bytes (LE): 0x78 0x56 0x34 0x12
        assert_eq!(d.nibbles(), &[0x7, 0x5, 0x3, 0x1, 0x8, 0x6, 0x4, 0x2]);
    }

    #[test]
    fn test_collision_blocks() {
        // 100 * 33 + 100 == 101 * 33 + 67, so the blocks are interchangeable.
        assert_eq!(hash(&[100, 100]), hash(&[101, 67]));
        assert_eq!(hash(&[100, 100, 7, 101, 67]), hash(&[101, 67, 7, 100, 100]));
    }
}
