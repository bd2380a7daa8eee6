//! Basic usage examples for nibble-hash.

use nibble_hash::{Config, HashTable, StoreOutcome};

fn main() {
    example_store_fetch();
    example_enumerate();
    example_incremental_clear();
}

fn example_store_fetch() {
    println!("=== Store / Fetch ===\n");

    let mut table = HashTable::new();

    for (key, value) in [("user:1001", "alice"), ("user:1002", "bob")] {
        let outcome = table.store(key.as_bytes(), value.as_bytes(), 0).unwrap();
        println!("store {key} -> {outcome:?}");
    }

    // Overwrite keeps the entry in place and reports Replaced
    let outcome = table.store(b"user:1001", b"alice v2", 3).unwrap();
    assert_eq!(outcome, StoreOutcome::Replaced);

    if let Some(entry) = table.fetch(b"user:1001") {
        println!(
            "user:1001 = {:?} (flags {})",
            String::from_utf8_lossy(entry.value()),
            entry.flags()
        );
    }
    println!("user:9999 present: {}", table.has(b"user:9999"));
    println!("removed user:1002: {}", table.remove(b"user:1002"));
    println!("Count: {}\n", table.len());
}

fn example_enumerate() {
    println!("=== Enumerate ===\n");

    let mut table = HashTable::with_max_buckets(4);
    for i in 0..10 {
        table
            .store(format!("item:{i}").as_bytes(), &[i as u8], 0)
            .unwrap();
    }

    // Cursor style: the previous key is the only state carried between calls
    let mut cursor = table.first_key();
    while let Some(key) = cursor {
        print!("{} ", String::from_utf8_lossy(key));
        cursor = table.next_key(key);
    }
    println!();

    // Iterator style
    let total: u32 = table.iter().map(|e| e.value()[0] as u32).sum();
    println!("sum of values: {total}\n");
}

fn example_incremental_clear() {
    println!("=== Incremental Clear ===\n");

    let mut table = HashTable::with_config(Config {
        max_buckets: 8,
        reindex_scatter: 4,
    });
    for i in 0..100_000u32 {
        table.store(&i.to_be_bytes(), b"payload", 0).unwrap();
    }
    let stats = table.stats();
    println!(
        "{} keys, {} indexes, {:.1} bytes/key",
        stats.num_keys,
        stats.num_indexes(),
        stats.bytes_per_key()
    );

    // Spread the work over 256 steps, e.g. one per event-loop tick
    for slice in 0..=255u8 {
        table.clear_slice(slice);
        if slice % 64 == 63 {
            println!("after slice {slice}: {} keys left", table.len());
        }
    }
    println!("stats after clearing: {:?}", table.stats());
}
