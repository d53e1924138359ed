//! Freshness detection: blake3 content hashes for sources and outputs.

mod cache;
mod hash;

pub use cache::HashCache;
pub use hash::{ContentHash, compute_file_hash, fingerprint, hash_bytes};
