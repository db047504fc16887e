use serde::{Deserialize, Serialize};

/// Number of hash buckets a bucketed level may fan out into.
pub const MAX_BUCKETS: u32 = 32;

/// Deepest bucketing level; one level per byte of the name hash. Levels at
/// this depth are always leaves.
pub const MAX_DEPTH: usize = 32;

/// Default number of entries a level holds before it is split into buckets.
pub const DEFAULT_NORMALIZED_SIZE_LIMIT: usize = 512;

/// Tree shape parameters. Every tree of one repository must be built with the
/// same limit, otherwise equal content would not converge on equal ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub normalized_size_limit: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            normalized_size_limit: DEFAULT_NORMALIZED_SIZE_LIMIT,
        }
    }
}

impl TreeConfig {
    pub fn with_limit(normalized_size_limit: usize) -> Self {
        Self {
            normalized_size_limit: normalized_size_limit.max(1),
        }
    }
}

/// Bucket holding `name` at bucketing depth `depth`.
pub fn bucket_index(name: &str, depth: usize) -> u32 {
    let hash = blake3::hash(name.as_bytes());
    u32::from(hash.as_bytes()[depth % MAX_DEPTH]) % MAX_BUCKETS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_stable_and_in_range() {
        for depth in 0..MAX_DEPTH {
            let a = bucket_index("parks.1", depth);
            assert_eq!(a, bucket_index("parks.1", depth));
            assert!(a < MAX_BUCKETS);
        }
    }

    #[test]
    fn names_spread_over_buckets() {
        let used: std::collections::HashSet<u32> =
            (0..500).map(|i| bucket_index(&format!("f{i}"), 0)).collect();
        assert!(used.len() > MAX_BUCKETS as usize / 2);
    }

    #[test]
    fn limit_is_at_least_one() {
        assert_eq!(TreeConfig::with_limit(0).normalized_size_limit, 1);
        assert_eq!(TreeConfig::default().normalized_size_limit, 512);
    }
}
