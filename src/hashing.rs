//! Deterministic hashing. The standard library's `HashMap` is randomly seeded per process,
//! which would make iteration order (and therefore any RNG draws made while iterating) differ
//! between runs with the same seed. Everything in this crate that hashes uses these aliases
//! instead.
//!
//! Construct with `HashMap::default()`.

use xxhash_rust::xxh3::xxh3_64;

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

/// Stable hash of a string, used to derive per-stream RNG seeds from stream names.
#[must_use]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}
