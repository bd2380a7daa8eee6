use super::*;

use crate::bucket::BUCKET_OVERHEAD;
use crate::digest::{Digest, DIGEST_LEN};
use crate::index::{Index, Slot};

use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};

/// Walk the whole trie and check it against its own bookkeeping.
fn validate_table(t: &HashTable) {
    fn walk(
        index: &Index,
        path: &mut Vec<usize>,
        keys: &mut HashSet<Vec<u8>>,
        data_bytes: &mut u64,
        num_indexes: &mut u64,
    ) {
        *num_indexes += 1;
        let level = path.len();
        assert!(level < DIGEST_LEN, "index nested past the digest length");

        for (nibble, slot) in index.slots().iter().enumerate() {
            path.push(nibble);
            match slot {
                Slot::Empty => {}
                Slot::Index(child) => walk(child, path, keys, data_bytes, num_indexes),
                Slot::Chain(head) => {
                    for bucket in head.chain() {
                        let digest = Digest::of(bucket.key());
                        assert_eq!(
                            &digest.nibbles()[..path.len()],
                            path.iter().map(|&n| n as u8).collect::<Vec<_>>().as_slice(),
                            "bucket filed under the wrong path"
                        );
                        assert!(
                            keys.insert(bucket.key().to_vec()),
                            "key stored twice"
                        );
                        *data_bytes += bucket.data_len() as u64;
                    }
                }
            }
            path.pop();
        }
    }

    let mut keys = HashSet::new();
    let mut data_bytes = 0;
    let mut num_indexes = 0;
    walk(t.root(), &mut Vec::new(), &mut keys, &mut data_bytes, &mut num_indexes);

    let stats = t.stats();
    assert_eq!(stats.num_keys, keys.len() as u64, "num_keys out of step");
    assert_eq!(stats.data_bytes, data_bytes, "data_bytes out of step");
    assert_eq!(
        stats.meta_bytes,
        keys.len() as u64 * BUCKET_OVERHEAD as u64,
        "meta_bytes out of step"
    );
    assert_eq!(stats.num_indexes(), num_indexes, "index_bytes out of step");
}

#[derive(Clone, Debug)]
enum Op {
    Store(Vec<u8>, Vec<u8>, u8),
    Remove(Vec<u8>),
    Fetch(Vec<u8>),
    ClearSlice(u8),
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A small alphabet keeps collisions, overwrites and removals of live keys
    // frequent.
    prop::collection::vec(b'a'..=b'h', 0..=6)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let value = prop::collection::vec(any::<u8>(), 0..=16);
    let op = prop_oneof![
        50 => (key.clone(), value, any::<u8>()).prop_map(|(k, v, f)| Op::Store(k, v, f)),
        25 => key.clone().prop_map(Op::Remove),
        24 => key.clone().prop_map(Op::Fetch),
        1 => any::<u8>().prop_map(Op::ClearSlice),
    ];
    prop::collection::vec(op, 0..=1500)
}

fn config_strategy() -> impl Strategy<Value = Config> {
    (1u8..=6, 1u8..=4).prop_map(|(max_buckets, reindex_scatter)| Config {
        max_buckets,
        reindex_scatter,
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(config in config_strategy(), ops in ops_strategy()) {
        let mut t = HashTable::with_config(config);
        let mut m: BTreeMap<Vec<u8>, (Vec<u8>, u8)> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Store(key, value, flags) => {
                    let expected = if m.contains_key(&key) {
                        StoreOutcome::Replaced
                    } else {
                        StoreOutcome::Added
                    };
                    prop_assert_eq!(t.store(&key, &value, flags), Ok(expected));
                    m.insert(key, (value, flags));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(t.remove(&key), m.remove(&key).is_some());
                }
                Op::Fetch(key) => {
                    let got = t.fetch(&key).map(|e| (e.value().to_vec(), e.flags()));
                    prop_assert_eq!(got.as_ref(), m.get(&key));
                    prop_assert_eq!(t.has(&key), m.contains_key(&key));
                }
                Op::ClearSlice(slice) => {
                    let outer = (slice >> 4) as usize;
                    let inner = (slice & 0x0F) as usize;
                    // A root slot that is still a chain is cleared whole.
                    let whole_slot = matches!(t.root().slot(outer), Slot::Chain(_));

                    t.clear_slice(slice);
                    m.retain(|k, _| {
                        let d = Digest::of(k);
                        d.nibble(0) != outer || (!whole_slot && d.nibble(1) != inner)
                    });
                    for key in m.keys() {
                        prop_assert!(t.has(key), "clear_slice dropped a key outside its slice");
                    }
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_table(&t);

        let mut enumerated = Vec::new();
        let mut cur = t.first_key();
        while let Some(key) = cur {
            enumerated.push(key.to_vec());
            cur = t.next_key(key);
        }
        enumerated.sort();
        let expected: Vec<Vec<u8>> = m.keys().cloned().collect();
        prop_assert_eq!(enumerated, expected);
    }

    #[test]
    fn prop_clear_slices_equal_clear(
        config in config_strategy(),
        keys in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..=12), 0..=800),
    ) {
        let mut sliced = HashTable::with_config(config);
        let mut whole = HashTable::with_config(config);
        for key in &keys {
            sliced.store(key, key, 0).unwrap();
            whole.store(key, key, 0).unwrap();
        }

        for slice in 0..=255u8 {
            sliced.clear_slice(slice);
            validate_table(&sliced);
        }
        whole.clear();

        prop_assert_eq!(sliced.stats(), whole.stats());
        prop_assert!(sliced.first_key().is_none());
        for key in &keys {
            prop_assert!(!sliced.has(key));
        }
    }
}

#[test]
fn randomized_store_remove_fetch() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(2);
    let mut t = HashTable::with_max_buckets(4);
    let mut m: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

    for _ in 0..50_000 {
        let op = rng.gen_range(0..100);
        let len = rng.gen_range(0..12);
        let key: Vec<u8> = (0..len).map(|_| rng.gen_range(b'0'..=b'9')).collect();

        match op {
            0..=49 => {
                let value: Vec<u8> = (0..rng.gen_range(0..24)).map(|_| rng.gen()).collect();
                let replaced = m.insert(key.clone(), value.clone()).is_some();
                let outcome = t.store(&key, &value, 0).unwrap();
                assert_eq!(outcome == StoreOutcome::Replaced, replaced);
            }
            50..=74 => {
                assert_eq!(t.remove(&key), m.remove(&key).is_some());
            }
            _ => {
                assert_eq!(t.fetch(&key).map(|e| e.value()), m.get(&key).map(Vec::as_slice));
            }
        }
    }

    assert_eq!(t.len(), m.len());
    validate_table(&t);

    let data: u64 = m.iter().map(|(k, v)| (k.len() + v.len()) as u64).sum();
    assert_eq!(t.stats().data_bytes, data);
}

#[test]
fn colliding_keys_stay_distinct() {
    // [100, 100] and [101, 67] hash identically, so every mix of them does too.
    let keys: Vec<Vec<u8>> = (0..1u32 << 8)
        .map(|bits| {
            (0..8)
                .flat_map(|b| if bits >> b & 1 == 0 { [100u8, 100] } else { [101, 67] })
                .collect::<Vec<u8>>()
        })
        .collect();

    let mut t = HashTable::with_max_buckets(1);
    for key in &keys {
        assert_eq!(t.store(key, key, 1), Ok(StoreOutcome::Added));
    }
    validate_table(&t);
    assert_eq!(t.stats().num_indexes(), DIGEST_LEN as u64);

    for key in keys.iter().step_by(3) {
        assert!(t.remove(key));
    }
    validate_table(&t);
    assert_eq!(t.keys().count(), t.len());
}
