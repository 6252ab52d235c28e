use std::hash::Hasher;

/// Hashes routing keys onto the shard key space.
pub trait RouteHasher: Send + Sync {
    fn hash_string(&self, s: &str) -> u64;
}

/// FNV-1a 64. Unseeded, so every process in the cluster agrees on the
/// shard a routing key belongs to.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringHasher;

impl RouteHasher for StringHasher {
    fn hash_string(&self, s: &str) -> u64 {
        let mut hasher = fnv::FnvHasher::default();
        hasher.write(s.as_bytes());
        hasher.finish()
    }
}
