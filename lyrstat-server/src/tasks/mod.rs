//! Analysis tasks: lifecycle state machine, in-memory registry and the background runner

pub mod registry;
pub mod runner;
pub mod status;

pub use registry::{Admission, RegistryFull, TaskRegistry};
pub use runner::{AnalysisJob, AnalysisRunner, JobSubject, Submission};
pub use status::{TaskPhase, TaskStatus};

use sha2::{Digest, Sha256};

const FINGERPRINT_LEN: usize = 32;

/// Deterministic task id for a request, derived from its identifying parts
///
/// Parts are joined with `_` and hashed; the id is the first 32 hex digits of the SHA-256.
pub fn fingerprint(parts: &[&str]) -> String {
    let digest = Sha256::digest(parts.join("_").as_bytes());
    let mut id = format!("{:x}", digest);
    id.truncate(FINGERPRINT_LEN);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = fingerprint(&["alice", "2026-02-02", "2026-02-12"]);
        let b = fingerprint(&["alice", "2026-02-02", "2026-02-12"]);

        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_differs_per_input() {
        let base = fingerprint(&["alice", "2026-02-02", "2026-02-12"]);

        assert_ne!(base, fingerprint(&["bob", "2026-02-02", "2026-02-12"]));
        assert_ne!(base, fingerprint(&["alice", "2026-02-03", "2026-02-12"]));
        assert_ne!(base, fingerprint(&["alice", "2026-02-02", "2026-02-13"]));
    }
}
