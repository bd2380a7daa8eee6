//! Compare the table's own accounting against what the allocator saw.

use nibble_hash::{Config, HashTable};
use std::collections::HashMap;
use std::time::Instant;
use tikv_jemalloc_ctl::{epoch, stats};

#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn get_allocated_bytes() -> usize {
    epoch::advance().unwrap();
    stats::allocated::read().unwrap()
}

fn main() {
    let count = 1_000_000;
    let keys: Vec<String> = (0..count)
        .map(|i| format!("session:{:08x}:{}", i * 2654435761u64 as usize, i))
        .collect();
    let raw: usize = keys.iter().map(|k| k.len() + 8).sum();
    println!("{} keys, {} MB raw key+value data\n", count, raw / (1024 * 1024));

    for max_buckets in [4u8, 16, 64] {
        let before = get_allocated_bytes();
        let start = Instant::now();
        let mut table = HashTable::with_config(Config {
            max_buckets,
            reindex_scatter: 4,
        });
        for (i, key) in keys.iter().enumerate() {
            table
                .store(key.as_bytes(), &(i as u64).to_le_bytes(), 0)
                .unwrap();
        }
        let insert_time = start.elapsed();
        let alloc = get_allocated_bytes() - before;

        let start = Instant::now();
        let correct = keys
            .iter()
            .enumerate()
            .filter(|(i, key)| {
                table.fetch(key.as_bytes()).map(|e| e.value()) == Some(&(*i as u64).to_le_bytes()[..])
            })
            .count();
        let fetch_time = start.elapsed();

        let s = table.stats();
        println!("=== HashTable (max_buckets = {max_buckets}) ===");
        println!(
            "  Allocated: {} MB ({:.1} bytes/key)",
            alloc / (1024 * 1024),
            alloc as f64 / count as f64
        );
        println!(
            "  Accounted: {} MB ({:.1} bytes/key): index {} KB, meta {} MB, data {} MB",
            s.total_bytes() / (1024 * 1024),
            s.bytes_per_key(),
            s.index_bytes / 1024,
            s.meta_bytes / (1024 * 1024),
            s.data_bytes / (1024 * 1024)
        );
        println!("  Indexes: {}", s.num_indexes());
        println!("  Store: {:?}  Fetch: {:?}", insert_time, fetch_time);
        println!("  Correctness: {}/{}\n", correct, count);
    }

    println!("=== std HashMap<Vec<u8>, Vec<u8>> ===");
    let before = get_allocated_bytes();
    let mut map: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();
    for (i, key) in keys.iter().enumerate() {
        map.insert(key.as_bytes().to_vec(), (i as u64).to_le_bytes().to_vec());
    }
    let alloc = get_allocated_bytes() - before;
    println!(
        "  Allocated: {} MB ({:.1} bytes/key)",
        alloc / (1024 * 1024),
        alloc as f64 / count as f64
    );
}
