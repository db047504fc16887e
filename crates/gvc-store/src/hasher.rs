use gvc_types::ObjectId;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"gvc-tree-v1"`) that is prepended
/// to every hash computation, so a tree and a feature with identical encoded
/// bytes still produce different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    pub const TREE: Self = Self::new("gvc-tree-v1");
    pub const FEATURE: Self = Self::new("gvc-feature-v1");
    pub const FEATURE_TYPE: Self = Self::new("gvc-featuretype-v1");
    pub const COMMIT: Self = Self::new("gvc-commit-v1");
    pub const TAG: Self = Self::new("gvc-tag-v1");
    pub const BLOB: Self = Self::new("gvc-blob-v1");

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected object ID.
    pub fn verify(&self, data: &[u8], expected: &ObjectId) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
