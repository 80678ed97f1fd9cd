//! Registration-time integrity checks.
//!
//! During the registration preview the collaborator that assembled the
//! encoded payload hands over a pre-encoding hash, a post-encoding hash, and
//! the encoded size. Both findings are advisory: a mismatch or an oversize
//! payload is surfaced as a warning the user can acknowledge, never a
//! blocking error.

use serde::Serialize;

/// Size ceiling for an encoded artwork payload, in kilobytes.
pub const MAX_ARTWORK_SIZE_KB: f64 = 45.0;

/// Outcome of the registration integrity check. Created once per preview and
/// discarded when the preview is dismissed or confirmed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityRecord {
    pub original_hash: String,
    pub final_hash: String,
    #[serde(rename = "sizeKB")]
    pub size_kb: f64,
    /// Whether the payload survived encoding unchanged. Independent of the
    /// size check.
    pub hashes_match: bool,
    /// Whether the encoded payload fits under [`MAX_ARTWORK_SIZE_KB`].
    /// Independent of the hash check.
    pub within_size_limit: bool,
}

impl IntegrityRecord {
    /// Compare the two hashes and the size against the ceiling. The two
    /// booleans are computed independently.
    pub fn check(original_hash: &str, final_hash: &str, size_kb: f64) -> Self {
        let hashes_match = original_hash == final_hash;
        let within_size_limit = size_kb <= MAX_ARTWORK_SIZE_KB;

        if !hashes_match {
            tracing::warn!(
                target: "tessera::integrity",
                original = %original_hash,
                encoded = %final_hash,
                "content hash changed during encoding"
            );
        }
        if !within_size_limit {
            tracing::warn!(
                target: "tessera::integrity",
                size_kb,
                limit_kb = MAX_ARTWORK_SIZE_KB,
                "encoded payload exceeds size ceiling"
            );
        }

        Self {
            original_hash: original_hash.to_string(),
            final_hash: final_hash.to_string(),
            size_kb,
            hashes_match,
            within_size_limit,
        }
    }

    /// Like [`check`](Self::check) but with the encoded size given in bytes.
    pub fn from_sizes(original_hash: &str, final_hash: &str, encoded_len: usize) -> Self {
        Self::check(original_hash, final_hash, encoded_len as f64 / 1024.0)
    }

    /// Whether either advisory finding needs an explicit user acknowledgment
    /// before proceeding. The two findings are OR-combined into one gesture;
    /// [`warnings`](Self::warnings) still reports them individually.
    pub fn needs_acknowledgement(&self) -> bool {
        !self.hashes_match || !self.within_size_limit
    }

    /// Human-readable advisory findings, one per failed check.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.hashes_match {
            out.push(format!(
                "content hash changed during encoding ({} -> {})",
                self.original_hash, self.final_hash
            ));
        }
        if !self.within_size_limit {
            out.push(format!(
                "encoded size {:.1} KB exceeds the {MAX_ARTWORK_SIZE_KB:.0} KB limit",
                self.size_kb
            ));
        }
        out
    }
}

/// Hex-encoded content hash of a payload, for collaborators that need to
/// produce the opaque hash strings compared above.
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_hashes_within_limit() {
        let record = IntegrityRecord::check("abc123", "abc123", 30.0);
        assert!(record.hashes_match);
        assert!(record.within_size_limit);
        assert!(!record.needs_acknowledgement());
        assert!(record.warnings().is_empty());
    }

    #[test]
    fn test_size_overage_is_independent_of_hash_result() {
        let record = IntegrityRecord::check("abc123", "abc123", 50.0);
        assert!(record.hashes_match);
        assert!(!record.within_size_limit);
        assert!(record.needs_acknowledgement());
        assert_eq!(record.warnings().len(), 1);
    }

    #[test]
    fn test_hash_mismatch_is_independent_of_size_result() {
        let record = IntegrityRecord::check("abc123", "def456", 10.0);
        assert!(!record.hashes_match);
        assert!(record.within_size_limit);
        assert_eq!(record.warnings().len(), 1);
    }

    #[test]
    fn test_both_findings_reported() {
        let record = IntegrityRecord::check("abc123", "def456", 99.9);
        assert_eq!(record.warnings().len(), 2);
        assert!(record.needs_acknowledgement());
    }

    #[test]
    fn test_limit_is_inclusive() {
        assert!(IntegrityRecord::check("a", "a", 45.0).within_size_limit);
        assert!(!IntegrityRecord::check("a", "a", 45.001).within_size_limit);
    }

    #[test]
    fn test_from_sizes() {
        let record = IntegrityRecord::from_sizes("a", "a", 45 * 1024);
        assert!(record.within_size_limit);
        let record = IntegrityRecord::from_sizes("a", "a", 46 * 1024);
        assert!(!record.within_size_limit);
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = content_hash(b"payload");
        let b = content_hash(b"payload");
        assert_eq!(a, b);
        assert_ne!(a, content_hash(b"other"));
        // blake3 hex digest is 64 chars.
        assert_eq!(a.len(), 64);
    }
}
